//! Countdown state machine and drift-corrected tick

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::time_travel::{Activation, SpeedBounds, TimeTravelController, TimeTravelError, TimeTravelState};
use crate::{
    clock::Clock,
    state::{TimerSnapshot, TimerState, TimerStatus},
};

/// Single authoritative countdown owned by one surface.
///
/// Remaining time is kept as a float internally so that fractional speed
/// multipliers do not accumulate rounding error across ticks.
pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    status: TimerStatus,
    remaining: f64,
    is_negative: bool,
    initial_duration_ms: i64,
    allow_negative: bool,
    /// Reference instant of the previous tick, epoch ms
    last_tick_ms: i64,
    /// Snapshot anchor of the current running interval
    interval_start_ms: Option<i64>,
    offset_ms: i64,
    time_travel: TimeTravelController,
}

impl TimerEngine {
    /// Create an idle engine with nothing on the clock
    pub fn new(clock: Arc<dyn Clock>, allow_negative: bool) -> Self {
        let now = clock.now_ms();
        Self {
            clock,
            status: TimerStatus::Idle,
            remaining: 0.0,
            is_negative: false,
            initial_duration_ms: 0,
            allow_negative,
            last_tick_ms: now,
            interval_start_ms: None,
            offset_ms: 0,
            time_travel: TimeTravelController::new(),
        }
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            status: self.status,
            remaining_ms: self.remaining.round() as i64,
            is_negative: self.is_negative,
            initial_duration_ms: self.initial_duration_ms,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn time_travel(&self) -> TimeTravelState {
        self.time_travel.state()
    }

    pub fn allow_negative(&self) -> bool {
        self.allow_negative
    }

    /// Change the negative-time policy; a running negative countdown completes on the next tick
    pub fn set_allow_negative(&mut self, allow: bool) {
        if self.allow_negative != allow {
            debug!("Negative time {}", if allow { "enabled" } else { "disabled" });
        }
        self.allow_negative = allow;
    }

    /// Begin a fresh countdown of `duration_ms`
    pub fn start(&mut self, duration_ms: i64) {
        let now = self.clock.now_ms();
        self.time_travel.deactivate();
        self.initial_duration_ms = duration_ms;
        self.offset_ms = 0;
        self.last_tick_ms = now;

        if duration_ms <= 0 {
            warn!("Start requested with non-positive duration {}ms, treating as complete", duration_ms);
            self.initial_duration_ms = 0;
            self.complete();
            return;
        }

        info!("Countdown started: {}ms", duration_ms);
        self.remaining = duration_ms as f64;
        self.is_negative = false;
        self.status = TimerStatus::Running;
        self.interval_start_ms = Some(now);
    }

    pub fn pause(&mut self) {
        if self.status != TimerStatus::Running {
            return;
        }
        // Account for the partial tick before freezing
        self.tick();
        if self.status != TimerStatus::Running {
            return;
        }

        self.status = TimerStatus::Paused;
        self.interval_start_ms = None;
        self.fold_remaining_into_offset();
        info!("Countdown paused at {}ms", self.state().remaining_ms);
    }

    pub fn resume(&mut self) {
        if self.status != TimerStatus::Paused {
            return;
        }
        let now = self.clock.now_ms();
        self.status = TimerStatus::Running;
        self.last_tick_ms = now;
        self.interval_start_ms = Some(now);

        if let Some(target) = self.time_travel.target_time_ms() {
            if now >= target {
                // The target passed while paused: resume from zero at normal speed
                self.remaining = 0.0;
                self.is_negative = false;
                self.land_on_zero(now);
                info!("Time-travel target passed while paused, resuming from zero");
                return;
            }
        }
        info!("Countdown resumed at {}ms", self.state().remaining_ms);
    }

    pub fn pause_resume(&mut self) {
        match self.status {
            TimerStatus::Running => self.pause(),
            TimerStatus::Paused => self.resume(),
            TimerStatus::Idle | TimerStatus::Completed => {}
        }
    }

    /// Return to idle with the initial duration restored
    pub fn reset(&mut self) {
        self.time_travel.deactivate();
        self.remaining = self.initial_duration_ms as f64;
        self.is_negative = false;
        self.status = TimerStatus::Idle;
        self.interval_start_ms = None;
        self.offset_ms = 0;
        info!("Countdown reset to {}ms", self.initial_duration_ms);
    }

    /// Shift the remaining time by `delta_ms` without touching the status
    pub fn adjust_time(&mut self, delta_ms: i64) {
        self.remaining += delta_ms as f64;
        self.is_negative = self.remaining < 0.0;
        self.offset_ms = self.offset_ms.saturating_add(delta_ms);
        info!("Countdown adjusted by {}ms to {}ms", delta_ms, self.state().remaining_ms);
    }

    /// Re-target the countdown to reach zero at the given time of day
    pub fn activate_time_travel(
        &mut self,
        target_hhmm: &str,
        bounds: SpeedBounds,
    ) -> Result<Activation, TimeTravelError> {
        // Bring the remaining time up to date so the speed is computed from now
        self.tick();

        let now = self.clock.now();
        let remaining_ms = self.state().remaining_ms;
        let activation = self
            .time_travel
            .activate(target_hhmm, remaining_ms, bounds, now)?;

        self.fold_remaining_into_offset();
        if self.status == TimerStatus::Running {
            self.interval_start_ms = Some(now.timestamp_millis());
        }
        Ok(activation)
    }

    pub fn deactivate_time_travel(&mut self) {
        if !self.time_travel.is_active() {
            return;
        }
        self.tick();
        self.time_travel.deactivate();
        self.fold_remaining_into_offset();
        if self.status == TimerStatus::Running {
            self.interval_start_ms = Some(self.last_tick_ms);
        }
    }

    /// Advance the countdown by the real time elapsed since the previous tick
    pub fn tick(&mut self) -> TimerState {
        if self.status != TimerStatus::Running {
            return self.state();
        }

        let now = self.clock.now_ms();
        let elapsed = now.saturating_sub(self.last_tick_ms).max(0) as f64;
        let speed = self.time_travel.speed();
        let mut candidate = self.remaining - elapsed * speed;

        if let Some(target) = self.time_travel.target_time_ms() {
            if now >= target {
                // Land exactly on zero at the target, whatever the multiplier drifted to
                candidate = 0.0;
                self.land_on_zero(now);
                info!("Time-travel target reached, countdown at zero");
            }
        }

        if candidate < 0.0 && !self.allow_negative {
            self.complete();
            return self.state();
        }

        self.remaining = candidate;
        self.is_negative = candidate < 0.0;
        self.last_tick_ms = now;
        self.state()
    }

    /// Canonical snapshot describing this engine right now
    pub fn snapshot(&self) -> TimerSnapshot {
        let running = self.status == TimerStatus::Running;
        TimerSnapshot {
            start_timestamp: if running { self.interval_start_ms } else { None },
            duration_ms: self.initial_duration_ms,
            offset_ms: self.offset_ms,
            running,
            status: Some(self.status),
            time_travel: self.time_travel.snapshot(),
        }
    }

    /// Overwrite local state with a remote snapshot, re-deriving remaining time
    /// from its timestamps and this engine's clock
    pub fn adopt(&mut self, snapshot: &TimerSnapshot) {
        let now = self.clock.now_ms();
        let status = snapshot.effective_status();

        self.initial_duration_ms = snapshot.duration_ms;
        self.offset_ms = snapshot.offset_ms;
        self.interval_start_ms = if status == TimerStatus::Running {
            snapshot.start_timestamp.or(Some(now))
        } else {
            None
        };
        self.time_travel.adopt(snapshot.time_travel);

        let mut remaining = snapshot.remaining_at(now);
        if status == TimerStatus::Running {
            if let Some(target) = self.time_travel.target_time_ms() {
                if now >= target {
                    // The sender's target already passed; continue as if we had crossed it.
                    // A countdown resumed after its target crosses at the resume instant.
                    let start = self.interval_start_ms.unwrap_or(now);
                    self.land_on_zero(target.max(start));
                }
            }
        }
        if status == TimerStatus::Completed {
            remaining = remaining.max(0.0);
        }

        self.status = status;
        self.remaining = remaining;
        self.is_negative = remaining < 0.0;
        self.last_tick_ms = now;

        if status == TimerStatus::Running && remaining < 0.0 && !self.allow_negative {
            self.complete();
        }
        debug!(
            "Adopted snapshot: status={}, remaining={}ms",
            self.status,
            self.state().remaining_ms
        );
    }

    fn complete(&mut self) {
        self.time_travel.deactivate();
        self.remaining = 0.0;
        self.is_negative = false;
        self.status = TimerStatus::Completed;
        self.interval_start_ms = None;
        self.offset_ms = self.initial_duration_ms.saturating_neg();
        info!("Countdown completed");
    }

    /// Drop time-travel and re-anchor the interval so the countdown reads zero at `anchor_ms`
    fn land_on_zero(&mut self, anchor_ms: i64) {
        self.time_travel.deactivate();
        self.offset_ms = self.initial_duration_ms.saturating_neg();
        self.interval_start_ms = Some(anchor_ms);
    }

    fn fold_remaining_into_offset(&mut self) {
        self.offset_ms = self.state().remaining_ms.saturating_sub(self.initial_duration_ms);
    }
}
