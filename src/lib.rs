//! clockd - A presentation countdown timer server
//!
//! One shared countdown is rendered by three surfaces (setup, display and
//! moderator). Each surface owns a replica of the timer engine; replicas stay in
//! step through a shared snapshot store and a broadcast replication channel.

pub mod api;
pub mod clock;
pub mod config;
pub mod engine;
pub mod state;
pub mod sync;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use engine::{TimeTravelError, TimerEngine};
pub use state::{AppState, SurfaceKind, TimerSnapshot, TimerState, TimerStatus};
pub use sync::{Replica, Session, SharedStore};
pub use utils::signals::shutdown_signal;
