//! Session wiring
//!
//! A session owns the dependencies every surface of one timer shares: the
//! clock, the store and the two replication channels. It is created at
//! startup and dropped at teardown.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tracing::info;

use super::{
    channel::{LocalChannel, ReplicaId, ReplicationChannel, SETTINGS_CHANNEL, TIMER_CHANNEL},
    store::SharedStore,
};
use crate::{
    clock::Clock,
    engine::SpeedBounds,
    state::{SessionSettings, TimerSnapshot},
};

pub struct Session {
    clock: Arc<dyn Clock>,
    store: SharedStore,
    timer_channel: Arc<dyn ReplicationChannel<TimerSnapshot>>,
    settings_channel: Arc<dyn ReplicationChannel<SessionSettings>>,
    bounds: SpeedBounds,
    next_replica: AtomicU64,
}

impl Session {
    /// Create a session whose surfaces replicate through in-process channels
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>, bounds: SpeedBounds) -> Self {
        Self::with_channels(
            store,
            clock,
            bounds,
            Arc::new(LocalChannel::<TimerSnapshot>::new(TIMER_CHANNEL)),
            Arc::new(LocalChannel::<SessionSettings>::new(SETTINGS_CHANNEL)),
        )
    }

    pub fn with_channels(
        store: SharedStore,
        clock: Arc<dyn Clock>,
        bounds: SpeedBounds,
        timer_channel: Arc<dyn ReplicationChannel<TimerSnapshot>>,
        settings_channel: Arc<dyn ReplicationChannel<SessionSettings>>,
    ) -> Self {
        info!(
            "Session created on channels {} and {} (speed bounds {}x..{}x)",
            timer_channel.name(),
            settings_channel.name(),
            bounds.min_speed,
            bounds.max_speed
        );
        Self {
            clock,
            store,
            timer_channel,
            settings_channel,
            bounds,
            next_replica: AtomicU64::new(1),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn bounds(&self) -> SpeedBounds {
        self.bounds
    }

    pub fn timer_channel(&self) -> &Arc<dyn ReplicationChannel<TimerSnapshot>> {
        &self.timer_channel
    }

    pub fn settings_channel(&self) -> &Arc<dyn ReplicationChannel<SessionSettings>> {
        &self.settings_channel
    }

    pub fn next_replica_id(&self) -> ReplicaId {
        ReplicaId(self.next_replica.fetch_add(1, Ordering::Relaxed))
    }
}
