//! Background tasks module
//!
//! Each surface runs a tick loop and a replication task alongside the HTTP server.

pub mod replication;
pub mod tick_loop;

// Re-export main functions
pub use replication::replication_task;
pub use tick_loop::tick_loop_task;
