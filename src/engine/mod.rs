//! Timer engine and time-travel controller
//!
//! The engine is the sole mutator of a surface's countdown; the controller
//! supplies the speed multiplier it consults on every tick.

pub mod time_travel;
pub mod timer;

// Re-export main types
pub use time_travel::{
    parse_hhmm, resolve_target, Activation, SpeedBounds, TimeTravelController, TimeTravelError,
    TimeTravelState,
};
pub use timer::TimerEngine;
