//! Replication channel
//!
//! Best-effort publish/subscribe between the replicas of one session. Messages
//! are tagged with the sender so a replica never receives its own writes.

use std::fmt;

use futures::{
    future::FutureExt,
    stream::{self, BoxStream, Stream, StreamExt},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Name of the channel carrying timer snapshots
pub const TIMER_CHANNEL: &str = "clockd-timer";
/// Name of the channel carrying session settings
pub const SETTINGS_CHANNEL: &str = "clockd-settings";

const CHANNEL_CAPACITY: usize = 64;

/// Identity of one replica within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplicaId(pub u64);

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replica-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub origin: ReplicaId,
    pub payload: T,
}

/// Publish/subscribe transport shared by all surfaces
pub trait ReplicationChannel<T>: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver `payload` to every other currently subscribed replica
    fn publish(&self, origin: ReplicaId, payload: T);

    /// Start receiving messages published by other replicas
    fn subscribe(&self, replica: ReplicaId) -> Subscription<T>;
}

/// In-process channel backed by a tokio broadcast
#[derive(Debug)]
pub struct LocalChannel<T> {
    name: String,
    tx: broadcast::Sender<Envelope<T>>,
}

impl<T: Clone + Send + 'static> LocalChannel<T> {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            tx,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ReplicationChannel<T> for LocalChannel<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, origin: ReplicaId, payload: T) {
        match self.tx.send(Envelope { origin, payload }) {
            Ok(receivers) => debug!("{} published on {} to {} receivers", origin, self.name, receivers),
            Err(_) => debug!("{} published on {} with no subscribers", origin, self.name),
        }
    }

    fn subscribe(&self, replica: ReplicaId) -> Subscription<T> {
        debug!("{} subscribed to {}", replica, self.name);
        let channel = self.name.clone();
        let rx = self.tx.subscribe();

        let messages = stream::unfold((rx, channel.clone()), move |(mut rx, channel)| async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) if envelope.origin == replica => continue,
                    Ok(envelope) => return Some((envelope.payload, (rx, channel))),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("{} lagged on {}, skipped {} messages", replica, channel, skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        Subscription::from_stream(replica, channel, messages)
    }
}

/// Receiving end held by one replica; dropping it unsubscribes.
///
/// Any transport can hand one out by wrapping the stream of payloads sent by
/// other replicas.
pub struct Subscription<T> {
    replica: ReplicaId,
    channel: String,
    messages: BoxStream<'static, T>,
}

impl<T> Subscription<T> {
    pub fn from_stream(
        replica: ReplicaId,
        channel: impl Into<String>,
        messages: impl Stream<Item = T> + Send + 'static,
    ) -> Self {
        Self {
            replica,
            channel: channel.into(),
            messages: messages.boxed(),
        }
    }

    pub fn replica(&self) -> ReplicaId {
        self.replica
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next message from another replica; `None` once the channel is gone
    pub async fn recv(&mut self) -> Option<T> {
        self.messages.next().await
    }

    /// Take the next pending message from another replica without waiting
    pub fn try_recv(&mut self) -> Option<T> {
        self.messages.next().now_or_never().flatten()
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("replica", &self.replica)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
