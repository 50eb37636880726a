//! Per-surface tick loop background task

use std::time::Duration;

use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info};

use crate::state::{SharedReplica, TimerStatus};

/// Drive a replica's engine on a fixed cadence while its countdown runs.
///
/// The loop holds no timer while the countdown is idle, paused or completed; it
/// sleeps on the status watch until the replica starts running again.
pub async fn tick_loop_task(
    replica: SharedReplica,
    mut status_rx: watch::Receiver<TimerStatus>,
    period: Duration,
) {
    let surface = match replica.lock() {
        Ok(r) => r.surface(),
        Err(e) => {
            error!("Failed to lock replica for tick loop: {}", e);
            return;
        }
    };
    info!("Starting tick loop for {} surface ({:?} cadence)", surface, period);

    loop {
        // Suspended until the countdown runs
        if status_rx.wait_for(|s| *s == TimerStatus::Running).await.is_err() {
            debug!("{} status channel closed, stopping tick loop", surface);
            return;
        }
        debug!("{} tick loop running", surface);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let status = {
                        let mut replica = match replica.lock() {
                            Ok(r) => r,
                            Err(e) => {
                                error!("Failed to lock {} replica for tick: {}", surface, e);
                                return;
                            }
                        };
                        replica.tick().status
                    };
                    if status != TimerStatus::Running {
                        break;
                    }
                }

                changed = status_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if *status_rx.borrow_and_update() != TimerStatus::Running {
                        break;
                    }
                }
            }
        }

        debug!("{} tick loop suspended", surface);
    }
}
