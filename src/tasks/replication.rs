//! Replication background task

use tracing::{error, info};

use crate::{state::SharedReplica, sync::ReplicaSubscriptions};

/// Feed snapshots and settings published by other surfaces into a replica
pub async fn replication_task(replica: SharedReplica, mut subscriptions: ReplicaSubscriptions) {
    let surface = match replica.lock() {
        Ok(r) => r.surface(),
        Err(e) => {
            error!("Failed to lock replica for replication: {}", e);
            return;
        }
    };
    info!("Starting replication task for {} surface", surface);

    loop {
        tokio::select! {
            snapshot = subscriptions.timer.recv() => {
                let Some(snapshot) = snapshot else { break };
                match replica.lock() {
                    Ok(mut r) => {
                        r.reconcile(&snapshot);
                    }
                    Err(e) => error!("Failed to lock {} replica for reconcile: {}", surface, e),
                }
            }

            settings = subscriptions.settings.recv() => {
                let Some(settings) = settings else { break };
                match replica.lock() {
                    Ok(mut r) => r.reconcile_settings(settings),
                    Err(e) => error!("Failed to lock {} replica for settings: {}", surface, e),
                }
            }
        }
    }

    info!("Replication channel closed for {} surface", surface);
}
