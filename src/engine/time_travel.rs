//! Time-travel controller
//!
//! Computes the speed multiplier that makes a countdown reach zero at a chosen
//! wall-clock time of day. The controller only holds the multiplier; the timer
//! engine applies it on every tick and performs the zero-crossing correction.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::state::TimeTravelSnapshot;

/// Minimum real time between activation and the target
pub const MIN_LEAD_MS: i64 = 1_000;

/// Accepted range for a computed speed multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedBounds {
    pub min_speed: f64,
    pub max_speed: f64,
}

impl SpeedBounds {
    /// Both bounds finite and positive, with `min_speed <= max_speed`
    pub fn validate(self) -> Result<Self, TimeTravelError> {
        let valid = self.min_speed.is_finite()
            && self.max_speed.is_finite()
            && self.min_speed > 0.0
            && self.min_speed <= self.max_speed;
        if !valid {
            return Err(TimeTravelError::InvalidBounds {
                min_speed: self.min_speed,
                max_speed: self.max_speed,
            });
        }
        Ok(self)
    }
}

impl Default for SpeedBounds {
    fn default() -> Self {
        Self {
            min_speed: 0.1,
            max_speed: 10.0,
        }
    }
}

/// Reasons an activation is rejected. State is untouched in every case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeTravelError {
    #[error("Please enter time in HH:MM format (e.g., 15:05), got {0:?}")]
    InvalidFormat(String),

    #[error("Target time is too soon (must be at least 1 second in the future, got {lead_ms}ms)")]
    TooSoon { lead_ms: i64 },

    #[error("Target time is too soon. Timer would need to run faster than {max_speed}x speed (needs {speed:.2}x)")]
    TooFast { speed: f64, max_speed: f64 },

    #[error("Target time is too far away. Timer would need to run slower than {min_speed}x speed (needs {speed:.2}x)")]
    TooSlow { speed: f64, min_speed: f64 },

    #[error("Invalid speed bounds {min_speed}x..{max_speed}x (need 0 < min <= max)")]
    InvalidBounds { min_speed: f64, max_speed: f64 },
}

impl TimeTravelError {
    /// Stable machine-readable discriminant
    pub fn kind(&self) -> &'static str {
        match self {
            TimeTravelError::InvalidFormat(_) => "invalidFormat",
            TimeTravelError::TooSoon { .. } => "tooSoon",
            TimeTravelError::TooFast { .. } => "tooFast",
            TimeTravelError::TooSlow { .. } => "tooSlow",
            TimeTravelError::InvalidBounds { .. } => "invalidBounds",
        }
    }
}

/// Successful activation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    pub speed: f64,
    pub target_time_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTravelState {
    pub is_active: bool,
    pub speed: f64,
    pub target_time_ms: Option<i64>,
}

impl TimeTravelState {
    pub fn inactive() -> Self {
        Self {
            is_active: false,
            speed: 1.0,
            target_time_ms: None,
        }
    }
}

impl Default for TimeTravelState {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Parse a 24-hour `HH:MM` (or `H:MM`) time of day
pub fn parse_hhmm(input: &str) -> Result<NaiveTime, TimeTravelError> {
    let invalid = || TimeTravelError::InvalidFormat(input.to_string());

    let (hours, minutes) = input.trim().split_once(':').ok_or_else(invalid)?;
    let field = |part: &str| -> Option<u32> {
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    };

    let hours = field(hours).filter(|h| *h <= 23).ok_or_else(invalid)?;
    let minutes = field(minutes).filter(|m| *m <= 59).ok_or_else(invalid)?;

    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// Next occurrence of `time` strictly after `now`, in `now`'s offset
pub fn resolve_target(time: NaiveTime, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let offset = *now.offset();
    let local = now.date_naive().and_time(time);
    let utc = local - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    let target = DateTime::<FixedOffset>::from_naive_utc_and_offset(utc, offset);

    if target <= now {
        target + TimeDelta::days(1)
    } else {
        target
    }
}

/// Owner of [`TimeTravelState`]
#[derive(Debug, Clone, Default)]
pub struct TimeTravelController {
    state: TimeTravelState,
}

impl TimeTravelController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimeTravelState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    /// Multiplier to apply to elapsed real time; 1.0 while inactive
    pub fn speed(&self) -> f64 {
        if self.state.is_active {
            self.state.speed
        } else {
            1.0
        }
    }

    pub fn target_time_ms(&self) -> Option<i64> {
        self.state.target_time_ms
    }

    /// Validate a target without touching any state
    pub fn plan(
        target_hhmm: &str,
        remaining_ms: i64,
        bounds: SpeedBounds,
        now: DateTime<FixedOffset>,
    ) -> Result<Activation, TimeTravelError> {
        let bounds = bounds.validate()?;
        let time = parse_hhmm(target_hhmm)?;
        let target = resolve_target(time, now);

        let lead_ms = target.timestamp_millis() - now.timestamp_millis();
        if lead_ms < MIN_LEAD_MS {
            return Err(TimeTravelError::TooSoon { lead_ms });
        }

        let speed = remaining_ms as f64 / lead_ms as f64;
        if speed > bounds.max_speed {
            return Err(TimeTravelError::TooFast {
                speed,
                max_speed: bounds.max_speed,
            });
        }
        if speed < bounds.min_speed {
            return Err(TimeTravelError::TooSlow {
                speed,
                min_speed: bounds.min_speed,
            });
        }

        Ok(Activation {
            speed,
            target_time_ms: target.timestamp_millis(),
        })
    }

    /// Compute and commit the speed that makes `remaining_ms` run out at `target_hhmm`
    pub fn activate(
        &mut self,
        target_hhmm: &str,
        remaining_ms: i64,
        bounds: SpeedBounds,
        now: DateTime<FixedOffset>,
    ) -> Result<Activation, TimeTravelError> {
        let activation = Self::plan(target_hhmm, remaining_ms, bounds, now)?;

        self.state = TimeTravelState {
            is_active: true,
            speed: activation.speed,
            target_time_ms: Some(activation.target_time_ms),
        };
        info!(
            "Time-travel active: {:.3}x speed, zero at {}",
            activation.speed, activation.target_time_ms
        );

        Ok(activation)
    }

    pub fn deactivate(&mut self) {
        if self.state.is_active {
            debug!("Time-travel deactivated");
        }
        self.state = TimeTravelState::inactive();
    }

    /// Replace the state with one received from another surface
    pub fn adopt(&mut self, snapshot: Option<TimeTravelSnapshot>) {
        self.state = match snapshot {
            Some(tt) => TimeTravelState {
                is_active: true,
                speed: tt.speed,
                target_time_ms: Some(tt.target_time_ms),
            },
            None => TimeTravelState::inactive(),
        };
    }

    pub fn snapshot(&self) -> Option<TimeTravelSnapshot> {
        match (self.state.is_active, self.state.target_time_ms) {
            (true, Some(target_time_ms)) => Some(TimeTravelSnapshot {
                speed: self.state.speed,
                target_time_ms,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn parses_padded_and_unpadded_times() {
        assert_eq!(parse_hhmm("15:05").unwrap(), NaiveTime::from_hms_opt(15, 5, 0).unwrap());
        assert_eq!(parse_hhmm("9:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(parse_hhmm(" 00:00 ").unwrap(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn rejects_malformed_times() {
        for input in ["", "12", "24:00", "12:60", "12:5x", "-1:30", "1:2:3", "123:00", ":30", "12:"] {
            assert!(
                matches!(parse_hhmm(input), Err(TimeTravelError::InvalidFormat(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn speed_is_remaining_over_real_time() {
        let mut controller = TimeTravelController::new();
        let activation = controller
            .activate("10:15", 60_000, SpeedBounds::default(), at("2024-03-01T10:14:30+01:00"))
            .unwrap();

        assert_eq!(activation.speed, 2.0);
        assert_eq!(
            activation.target_time_ms,
            at("2024-03-01T10:15:00+01:00").timestamp_millis()
        );
        assert!(controller.is_active());
        assert_eq!(controller.speed(), 2.0);
        assert_eq!(controller.target_time_ms(), Some(activation.target_time_ms));
    }

    #[test]
    fn too_fast_and_too_slow_leave_state_unchanged() {
        let now = at("2024-03-01T10:14:30+01:00");
        let mut controller = TimeTravelController::new();

        // 450s of countdown in 30s of real time is 15x
        let err = controller
            .activate("10:15", 450_000, SpeedBounds::default(), now)
            .unwrap_err();
        assert!(matches!(err, TimeTravelError::TooFast { .. }));
        assert_eq!(err.kind(), "tooFast");
        assert_eq!(controller.state(), TimeTravelState::inactive());

        // 1.5s of countdown in 30s of real time is 0.05x
        let err = controller
            .activate("10:15", 1_500, SpeedBounds::default(), now)
            .unwrap_err();
        assert!(matches!(err, TimeTravelError::TooSlow { .. }));
        assert_eq!(controller.state(), TimeTravelState::inactive());
    }

    #[test]
    fn failure_keeps_previous_activation() {
        let now = at("2024-03-01T10:14:30+01:00");
        let mut controller = TimeTravelController::new();
        controller.activate("10:15", 60_000, SpeedBounds::default(), now).unwrap();
        let before = controller.state();

        assert!(controller.activate("nope", 60_000, SpeedBounds::default(), now).is_err());
        assert_eq!(controller.state(), before);
    }

    #[test]
    fn past_or_current_time_rolls_over_to_tomorrow() {
        let now = at("2024-03-01T10:15:00+01:00");
        assert_eq!(
            resolve_target(parse_hhmm("10:15").unwrap(), now),
            at("2024-03-02T10:15:00+01:00")
        );
        assert_eq!(
            resolve_target(parse_hhmm("09:00").unwrap(), now),
            at("2024-03-02T09:00:00+01:00")
        );
        assert_eq!(
            resolve_target(parse_hhmm("10:16").unwrap(), now),
            at("2024-03-01T10:16:00+01:00")
        );
    }

    #[test]
    fn target_under_a_second_away_is_too_soon() {
        let now = at("2024-03-01T10:14:59.500+01:00");
        let err = TimeTravelController::plan("10:15", 1_000, SpeedBounds::default(), now).unwrap_err();
        assert_eq!(err, TimeTravelError::TooSoon { lead_ms: 500 });
    }

    #[test]
    fn custom_bounds_are_respected() {
        let now = at("2024-03-01T10:14:30+01:00");
        let bounds = SpeedBounds {
            min_speed: 0.5,
            max_speed: 1.5,
        };
        assert!(matches!(
            TimeTravelController::plan("10:15", 60_000, bounds, now),
            Err(TimeTravelError::TooFast { max_speed, .. }) if max_speed == 1.5
        ));
    }

    #[test]
    fn inverted_or_non_positive_bounds_are_rejected() {
        let now = at("2024-03-01T10:14:30+01:00");
        for (min_speed, max_speed) in [(5.0, 2.0), (0.1, -1.0), (0.0, 10.0), (0.1, f64::NAN)] {
            let bounds = SpeedBounds { min_speed, max_speed };
            let err = TimeTravelController::plan("10:15", 60_000, bounds, now).unwrap_err();
            assert_eq!(err.kind(), "invalidBounds");
        }
        assert!(SpeedBounds::default().validate().is_ok());
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut controller = TimeTravelController::new();
        controller.deactivate();
        assert_eq!(controller.state(), TimeTravelState::inactive());

        controller
            .activate("10:15", 60_000, SpeedBounds::default(), at("2024-03-01T10:14:30+01:00"))
            .unwrap();
        controller.deactivate();
        controller.deactivate();
        assert_eq!(controller.state(), TimeTravelState::inactive());
        assert_eq!(controller.speed(), 1.0);
        assert_eq!(controller.snapshot(), None);
    }

    #[test]
    fn adopt_mirrors_remote_parameters() {
        let mut controller = TimeTravelController::new();
        controller.adopt(Some(TimeTravelSnapshot {
            speed: 0.5,
            target_time_ms: 42,
        }));
        assert!(controller.is_active());
        assert_eq!(controller.speed(), 0.5);
        assert_eq!(
            controller.snapshot(),
            Some(TimeTravelSnapshot {
                speed: 0.5,
                target_time_ms: 42
            })
        );

        controller.adopt(None);
        assert!(!controller.is_active());
    }
}
