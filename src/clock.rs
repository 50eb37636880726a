//! Wall-clock sources
//!
//! Every surface reads time through a [`Clock`] so that the engine and the
//! reconciler can be driven deterministically in tests.

use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Local, TimeDelta};

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    /// Current local time, carrying the UTC offset used for time-of-day math
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current time as epoch milliseconds
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Clock backed by the operating system's local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward (or backward, for negative values)
    pub fn advance(&self, ms: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += TimeDelta::milliseconds(ms);
    }

    pub fn set(&self, instant: DateTime<FixedOffset>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
