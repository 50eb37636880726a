//! Timer state structure and status machine

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-engine view of the countdown, derived from the canonical snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub remaining_ms: i64,
    pub is_negative: bool,
    /// Duration restored by a reset
    pub initial_duration_ms: i64,
}

impl TimerState {
    /// Create an idle timer state holding the given duration
    pub fn idle(initial_duration_ms: i64) -> Self {
        Self {
            status: TimerStatus::Idle,
            remaining_ms: initial_duration_ms,
            is_negative: false,
            initial_duration_ms,
        }
    }

    /// Check if the countdown is decrementing
    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle(0)
    }
}
