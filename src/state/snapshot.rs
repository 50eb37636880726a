//! Canonical timer snapshot shared by every surface

use serde::{Deserialize, Serialize};

use super::TimerStatus;

/// Time-travel parameters carried alongside a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTravelSnapshot {
    pub speed: f64,
    pub target_time_ms: i64,
}

/// Serializable timer state persisted in the store and sent over the channel.
///
/// Remaining time is never stored: replicas derive it with
/// [`TimerSnapshot::remaining_at`] from their own clock reads.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    /// Epoch ms at which the current running interval began
    pub start_timestamp: Option<i64>,
    pub duration_ms: i64,
    /// Adjustment applied on top of `duration_ms` at the interval anchor
    pub offset_ms: i64,
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TimerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_travel: Option<TimeTravelSnapshot>,
}

impl TimerSnapshot {
    /// `start_timestamp` is present exactly when the timer runs
    pub fn is_consistent(&self) -> bool {
        self.start_timestamp.is_some() == self.running
            && self.status.map_or(true, |s| (s == TimerStatus::Running) == self.running)
    }

    /// Status to adopt, falling back to the running flag for four-key snapshots
    pub fn effective_status(&self) -> TimerStatus {
        match self.status {
            Some(status) => status,
            None if self.running => TimerStatus::Running,
            None => TimerStatus::Idle,
        }
    }

    /// Remaining time at `now_ms`, unclamped
    pub fn remaining_at(&self, now_ms: i64) -> f64 {
        let base = self.duration_ms.saturating_add(self.offset_ms) as f64;
        let start = match (self.running, self.start_timestamp) {
            (true, Some(start)) => start,
            _ => return base,
        };
        let elapsed = now_ms.saturating_sub(start).max(0) as f64;

        match self.time_travel {
            // The countdown landed on zero at the target, or at the resume if the
            // target passed while paused, and runs at normal speed since
            Some(tt) if now_ms >= tt.target_time_ms => {
                -(now_ms.saturating_sub(tt.target_time_ms.max(start)).max(0) as f64)
            }
            Some(tt) => base - elapsed * tt.speed,
            None => base - elapsed,
        }
    }
}
