//! Cross-surface synchronization
//!
//! This module contains the shared store, the replication channel and the
//! per-surface replica that reconciles remote snapshots.

pub mod channel;
pub mod replica;
pub mod session;
pub mod store;

// Re-export main types
pub use channel::{LocalChannel, ReplicaId, ReplicationChannel, Subscription};
pub use replica::{Replica, ReplicaSubscriptions};
pub use session::Session;
pub use store::{FileStore, KeyValueStore, MemoryStore, SharedStore, StoreError};
