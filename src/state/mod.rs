//! State management module
//!
//! This module contains the replicated timer snapshot, the per-engine timer
//! state, session settings and the application state shared by HTTP handlers.

pub mod app_state;
pub mod settings;
pub mod snapshot;
pub mod surface;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, SharedReplica};
pub use settings::{DisplayMode, SessionSettings, SettingsPatch};
pub use snapshot::{TimeTravelSnapshot, TimerSnapshot};
pub use surface::{SurfaceKind, SurfaceView, UnknownSurface};
pub use timer_state::{TimerState, TimerStatus};
