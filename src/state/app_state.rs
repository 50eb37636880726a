//! Main application state management

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{SurfaceKind, SurfaceView};
use crate::{
    sync::{Replica, Session},
    tasks::{replication_task, tick_loop_task},
};

/// A replica shared between HTTP handlers and its background tasks
pub type SharedReplica = Arc<Mutex<Replica>>;

/// One attached surface and the tasks serving it
struct SurfaceHandle {
    replica: SharedReplica,
    tasks: Vec<JoinHandle<()>>,
}

/// Main application state holding the session and its surfaces
pub struct AppState {
    pub session: Arc<Session>,
    surfaces: BTreeMap<SurfaceKind, SurfaceHandle>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    /// Attach every surface to the session and spawn its tick loop and
    /// replication task. Must be called from within a tokio runtime.
    pub fn new(session: Arc<Session>, port: u16, host: String, tick_period: Duration) -> Self {
        let surfaces = SurfaceKind::ALL
            .into_iter()
            .map(|kind| {
                let (replica, subscriptions) = Replica::attach(&session, kind);
                let status_rx = replica.subscribe_status();
                let replica = Arc::new(Mutex::new(replica));

                let tasks = vec![
                    tokio::spawn(tick_loop_task(Arc::clone(&replica), status_rx, tick_period)),
                    tokio::spawn(replication_task(Arc::clone(&replica), subscriptions)),
                ];
                (kind, SurfaceHandle { replica, tasks })
            })
            .collect();

        Self {
            session,
            surfaces,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Shared handle to one surface's replica
    pub fn replica(&self, kind: SurfaceKind) -> Result<SharedReplica, String> {
        self.surfaces
            .get(&kind)
            .map(|handle| Arc::clone(&handle.replica))
            .ok_or_else(|| format!("Surface {} is not attached", kind))
    }

    /// Run an operation against a surface's replica and record it as the last action
    pub fn with_surface<F, R>(&self, kind: SurfaceKind, action: &str, operation: F) -> Result<R, String>
    where
        F: FnOnce(&mut Replica) -> R,
    {
        let replica = self.replica(kind)?;
        let mut replica = replica.lock()
            .map_err(|e| format!("Failed to lock {} surface: {}", kind, e))?;

        let result = operation(&mut *replica);
        drop(replica); // Release the lock early

        // Update last action tracking
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(format!("{}:{}", kind, action));
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        Ok(result)
    }

    /// Current view of one surface
    pub fn surface_view(&self, kind: SurfaceKind) -> Result<SurfaceView, String> {
        let replica = self.replica(kind)?;
        let replica = replica.lock()
            .map_err(|e| format!("Failed to lock {} surface: {}", kind, e))?;
        Ok(replica.view())
    }

    /// Views of all attached surfaces
    pub fn surface_views(&self) -> Result<Vec<SurfaceView>, String> {
        self.surfaces.keys().map(|kind| self.surface_view(*kind)).collect()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Stop every surface's background tasks
    pub fn shutdown(&self) {
        for (kind, handle) in &self.surfaces {
            for task in &handle.tasks {
                task.abort();
            }
            match handle.replica.lock() {
                Ok(replica) => info!("{} surface ({}) detached", kind, replica.id()),
                Err(e) => warn!("{} surface detached with poisoned state: {}", kind, e),
            }
        }
    }
}
