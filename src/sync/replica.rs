//! Per-surface replica
//!
//! A replica wraps one surface's timer engine. Local mutations are written
//! through the store and published; remote snapshots are adopted by
//! re-deriving remaining time from their timestamps and the local clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{
    channel::{ReplicaId, ReplicationChannel, Subscription},
    session::Session,
    store::SharedStore,
};
use crate::{
    clock::Clock,
    engine::{Activation, SpeedBounds, TimeTravelError, TimeTravelState, TimerEngine},
    state::{
        SessionSettings, SettingsPatch, SurfaceKind, SurfaceView, TimerSnapshot, TimerState,
        TimerStatus,
    },
};

/// Receiving ends of both session channels for one replica
pub struct ReplicaSubscriptions {
    pub timer: Subscription<TimerSnapshot>,
    pub settings: Subscription<SessionSettings>,
}

pub struct Replica {
    id: ReplicaId,
    surface: SurfaceKind,
    engine: TimerEngine,
    settings: SessionSettings,
    bounds: SpeedBounds,
    clock: Arc<dyn Clock>,
    store: SharedStore,
    timer_channel: Arc<dyn ReplicationChannel<TimerSnapshot>>,
    settings_channel: Arc<dyn ReplicationChannel<SessionSettings>>,
    status_tx: watch::Sender<TimerStatus>,
}

impl Replica {
    /// Join the session as `surface`, starting from whatever the store holds
    pub fn attach(session: &Session, surface: SurfaceKind) -> (Self, ReplicaSubscriptions) {
        let id = session.next_replica_id();

        // Subscribe before loading so nothing published in between is missed
        let subscriptions = ReplicaSubscriptions {
            timer: session.timer_channel().subscribe(id),
            settings: session.settings_channel().subscribe(id),
        };

        let settings = session.store().load_settings();
        let mut engine = TimerEngine::new(Arc::clone(session.clock()), settings.allow_negative);
        engine.adopt(&session.store().load());
        let (status_tx, _) = watch::channel(engine.status());

        info!(
            "{} surface attached as {} (status={})",
            surface,
            id,
            engine.status()
        );

        let replica = Self {
            id,
            surface,
            engine,
            settings,
            bounds: session.bounds(),
            clock: Arc::clone(session.clock()),
            store: session.store().clone(),
            timer_channel: Arc::clone(session.timer_channel()),
            settings_channel: Arc::clone(session.settings_channel()),
            status_tx,
        };
        (replica, subscriptions)
    }

    pub fn id(&self) -> ReplicaId {
        self.id
    }

    pub fn surface(&self) -> SurfaceKind {
        self.surface
    }

    pub fn state(&self) -> TimerState {
        self.engine.state()
    }

    pub fn time_travel(&self) -> TimeTravelState {
        self.engine.time_travel()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.engine.snapshot()
    }

    /// Watch the engine status; used to wake and suspend the tick loop
    pub fn subscribe_status(&self) -> watch::Receiver<TimerStatus> {
        self.status_tx.subscribe()
    }

    pub fn start(&mut self, duration_ms: i64) -> TimerState {
        self.engine.start(duration_ms);
        self.commit("start")
    }

    pub fn pause(&mut self) -> TimerState {
        self.engine.pause();
        self.commit("pause")
    }

    pub fn resume(&mut self) -> TimerState {
        self.engine.resume();
        self.commit("resume")
    }

    pub fn pause_resume(&mut self) -> TimerState {
        self.engine.pause_resume();
        self.commit("pause-resume")
    }

    pub fn reset(&mut self) -> TimerState {
        self.engine.reset();
        self.commit("reset")
    }

    pub fn adjust_time(&mut self, delta_ms: i64) -> TimerState {
        self.engine.adjust_time(delta_ms);
        self.commit("adjust")
    }

    /// Activate time-travel, falling back to the session's speed bounds
    pub fn activate_time_travel(
        &mut self,
        target_hhmm: &str,
        bounds: Option<SpeedBounds>,
    ) -> Result<Activation, TimeTravelError> {
        let bounds = bounds.unwrap_or(self.bounds);
        match self.engine.activate_time_travel(target_hhmm, bounds) {
            Ok(activation) => {
                self.commit("time-travel");
                Ok(activation)
            }
            Err(e) => {
                info!("{} surface rejected time-travel to {:?}: {}", self.surface, target_hhmm, e);
                self.notify();
                Err(e)
            }
        }
    }

    pub fn deactivate_time_travel(&mut self) -> TimerState {
        self.engine.deactivate_time_travel();
        self.commit("time-travel-off")
    }

    /// Apply a settings patch and replicate it if anything changed
    pub fn update_settings(&mut self, patch: SettingsPatch) -> SessionSettings {
        if !patch.apply(&mut self.settings) {
            return self.settings.clone();
        }

        self.engine.set_allow_negative(self.settings.allow_negative);
        if let Err(e) = self.store.save_settings(&self.settings) {
            warn!("Failed to persist settings from {} surface: {}", self.surface, e);
        }
        self.settings_channel.publish(self.id, self.settings.clone());
        info!("{} surface updated settings", self.surface);
        self.settings.clone()
    }

    pub fn show_message(&mut self, message: String) -> SessionSettings {
        self.update_settings(SettingsPatch {
            message: Some(message),
            message_visible: Some(true),
            ..SettingsPatch::default()
        })
    }

    pub fn hide_message(&mut self) -> SessionSettings {
        self.update_settings(SettingsPatch {
            message_visible: Some(false),
            ..SettingsPatch::default()
        })
    }

    pub fn tick(&mut self) -> TimerState {
        let state = self.engine.tick();
        self.notify();
        state
    }

    /// Adopt a snapshot published by another replica
    pub fn reconcile(&mut self, snapshot: &TimerSnapshot) -> TimerState {
        debug!("{} surface reconciling remote snapshot", self.surface);
        self.engine.adopt(snapshot);
        self.notify();
        self.engine.state()
    }

    /// Adopt settings published by another replica
    pub fn reconcile_settings(&mut self, settings: SessionSettings) {
        debug!("{} surface reconciling remote settings", self.surface);
        self.engine.set_allow_negative(settings.allow_negative);
        self.settings = settings;
    }

    pub fn view(&self) -> SurfaceView {
        let now = self.clock.now();
        let time_travel = self.engine.time_travel();
        let ends_at = time_travel
            .target_time_ms
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|target| target.with_timezone(now.offset()));

        SurfaceView {
            surface: self.surface,
            replica: self.id,
            timer: self.engine.state(),
            time_travel,
            ends_at,
            settings: self.settings.clone(),
            now,
        }
    }

    /// Persist and broadcast the engine's snapshot after a local mutation
    fn commit(&mut self, action: &str) -> TimerState {
        let snapshot = self.engine.snapshot();
        if let Err(e) = self.store.save(&snapshot) {
            warn!("Failed to persist snapshot after {} on {} surface: {}", action, self.surface, e);
        }
        self.timer_channel.publish(self.id, snapshot);
        debug!("{} surface committed {}", self.surface, action);

        self.notify();
        self.engine.state()
    }

    fn notify(&self) {
        let status = self.engine.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, state::DisplayMode};

    fn session() -> (Arc<ManualClock>, Session) {
        let clock = Arc::new(ManualClock::new(
            DateTime::parse_from_rfc3339("2024-03-01T10:14:30+01:00").unwrap(),
        ));
        let session = Session::new(SharedStore::in_memory(), clock.clone(), SpeedBounds::default());
        (clock, session)
    }

    fn drain(replica: &mut Replica, subs: &mut ReplicaSubscriptions) {
        while let Some(snapshot) = subs.timer.try_recv() {
            replica.reconcile(&snapshot);
        }
        while let Some(settings) = subs.settings.try_recv() {
            replica.reconcile_settings(settings);
        }
    }

    #[test]
    fn mutation_is_saved_and_published() {
        let (_clock, session) = session();
        let (mut moderator, _) = Replica::attach(&session, SurfaceKind::Moderator);
        let (mut display, mut display_subs) = Replica::attach(&session, SurfaceKind::Display);

        moderator.start(300_000);
        assert_eq!(session.store().load(), moderator.snapshot());

        drain(&mut display, &mut display_subs);
        assert_eq!(display.state(), moderator.state());
        assert_eq!(display.state().status, TimerStatus::Running);
    }

    #[test]
    fn replicas_converge_after_remote_adjust() {
        let (clock, session) = session();
        let (mut moderator, mut moderator_subs) = Replica::attach(&session, SurfaceKind::Moderator);
        let (mut display, mut display_subs) = Replica::attach(&session, SurfaceKind::Display);

        display.start(120_000);
        drain(&mut moderator, &mut moderator_subs);

        for _ in 0..50 {
            clock.advance(16);
            moderator.tick();
            display.tick();
        }
        moderator.adjust_time(60_000);
        // Delivery delay: the display keeps ticking before it sees the message
        clock.advance(40);
        display.tick();
        drain(&mut display, &mut display_subs);

        assert_eq!(display.state(), moderator.tick());
        assert_eq!(display.state().remaining_ms, 120_000 - 840 + 60_000);
    }

    #[test]
    fn time_travel_replicates_to_other_surfaces() {
        let (clock, session) = session();
        let (mut moderator, _) = Replica::attach(&session, SurfaceKind::Moderator);
        let (mut display, mut display_subs) = Replica::attach(&session, SurfaceKind::Display);

        moderator.start(60_000);
        let activation = moderator.activate_time_travel("10:15", None).unwrap();
        assert_eq!(activation.speed, 2.0);
        drain(&mut display, &mut display_subs);
        assert!(display.time_travel().is_active);

        clock.advance(10_000);
        assert_eq!(display.tick().remaining_ms, 40_000);
        assert_eq!(moderator.tick().remaining_ms, 40_000);

        clock.advance(20_000);
        assert_eq!(display.tick().remaining_ms, 0);
        assert!(!display.time_travel().is_active);
    }

    #[test]
    fn replicas_agree_after_resuming_past_target() {
        let (clock, session) = session();
        let (mut moderator, _) = Replica::attach(&session, SurfaceKind::Moderator);
        let (mut display, mut display_subs) = Replica::attach(&session, SurfaceKind::Display);

        moderator.start(60_000);
        moderator.activate_time_travel("10:15", None).unwrap();
        clock.advance(10_000);
        moderator.pause();

        drain(&mut display, &mut display_subs);
        assert_eq!(display.state().status, TimerStatus::Paused);
        assert_eq!(display.state().remaining_ms, 40_000);
        assert!(display.time_travel().is_active);

        // Target at 10:15 passes while paused
        clock.advance(60_000);
        moderator.resume();
        drain(&mut display, &mut display_subs);
        assert_eq!(display.state(), moderator.state());
        assert_eq!(display.state().remaining_ms, 0);
        assert!(!display.time_travel().is_active);

        clock.advance(5_000);
        assert_eq!(display.tick(), moderator.tick());
        assert_eq!(display.state().remaining_ms, -5_000);

        let (late, _) = Replica::attach(&session, SurfaceKind::Setup);
        assert_eq!(late.state(), moderator.state());
    }

    #[test]
    fn rejected_time_travel_publishes_nothing() {
        let (_clock, session) = session();
        let (mut moderator, _) = Replica::attach(&session, SurfaceKind::Moderator);
        let (_display, mut display_subs) = Replica::attach(&session, SurfaceKind::Display);

        moderator.start(60_000);
        while display_subs.timer.try_recv().is_some() {}

        let err = moderator.activate_time_travel("10:15", Some(SpeedBounds {
            min_speed: 0.1,
            max_speed: 1.5,
        }));
        assert!(matches!(err, Err(TimeTravelError::TooFast { .. })));
        assert!(display_subs.timer.try_recv().is_none());
    }

    #[test]
    fn late_joiner_loads_from_store() {
        let (clock, session) = session();
        let (mut moderator, _) = Replica::attach(&session, SurfaceKind::Moderator);
        moderator.start(90_000);
        clock.advance(30_000);

        let (display, _) = Replica::attach(&session, SurfaceKind::Display);
        assert_eq!(display.state().remaining_ms, 60_000);
        assert_eq!(display.state().status, TimerStatus::Running);
    }

    #[test]
    fn attach_survives_extreme_persisted_snapshot() {
        let (clock, session) = session();
        session
            .store()
            .save(&TimerSnapshot {
                start_timestamp: Some(clock.now_ms()),
                duration_ms: i64::MAX,
                offset_ms: 1,
                running: true,
                status: Some(TimerStatus::Running),
                time_travel: None,
            })
            .unwrap();

        let (mut display, _) = Replica::attach(&session, SurfaceKind::Display);
        assert_eq!(display.state().remaining_ms, i64::MAX);
        display.adjust_time(i64::MAX);
        clock.advance(1_000);
        assert_eq!(display.tick().status, TimerStatus::Running);
    }

    #[test]
    fn settings_replicate_and_drive_negative_policy() {
        let (clock, session) = session();
        let (mut setup, _) = Replica::attach(&session, SurfaceKind::Setup);
        let (mut display, mut display_subs) = Replica::attach(&session, SurfaceKind::Display);

        setup.update_settings(SettingsPatch {
            display_mode: Some(DisplayMode::Both),
            allow_negative: Some(false),
            ..SettingsPatch::default()
        });
        setup.show_message("Wrap up".to_string());
        drain(&mut display, &mut display_subs);

        assert_eq!(display.settings().display_mode, DisplayMode::Both);
        assert_eq!(display.settings().message, "Wrap up");
        assert!(display.settings().message_visible);
        assert_eq!(session.store().load_settings(), *display.settings());

        display.start(1_000);
        clock.advance(2_000);
        assert_eq!(display.tick().status, TimerStatus::Completed);
    }

    #[test]
    fn status_watch_follows_transitions() {
        let (clock, session) = session();
        let (mut replica, _) = Replica::attach(&session, SurfaceKind::Moderator);
        let rx = replica.subscribe_status();
        assert_eq!(*rx.borrow(), TimerStatus::Idle);

        replica.start(500);
        assert_eq!(*rx.borrow(), TimerStatus::Running);

        replica.update_settings(SettingsPatch {
            allow_negative: Some(false),
            ..SettingsPatch::default()
        });
        clock.advance(600);
        replica.tick();
        assert_eq!(*rx.borrow(), TimerStatus::Completed);
    }
}
