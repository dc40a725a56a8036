//! Top-level engine controller
//!
//! Binds the timed loop: each tick evaluates the schedule state machine,
//! then either runs one poll cycle (Active) or idles (Quiet). Exposes the
//! control operations consumed by the command surface. Transition
//! announcements go to subscribers exactly once per transition.

use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tokio::sync::Mutex;

use super::poll::{CycleOutcome, PollEngine};
use super::{EngineState, SharedState};
use crate::config::EngineConfig;
use crate::error::Error;
use crate::models::{EngineMode, PollStatus, Snapshot};
use crate::notify::SubscriberDispatcher;
use crate::schedule::{ScheduleSnapshot, ScheduleState, Transition};
use crate::source::AvailabilitySource;
use crate::storage::{SeenStore, StatusStore};

/// Combined status snapshot for reporting
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    /// Schedule state snapshot
    pub schedule: ScheduleSnapshot,

    /// Poll status snapshot
    pub poll: PollStatus,

    /// Currently registered subscribers
    pub subscribers: usize,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mode: {}", self.schedule.mode)?;
        match self.schedule.manual_override {
            Some(mode) => writeln!(f, "Override: {mode}")?,
            None => writeln!(f, "Override: none")?,
        }
        match self.poll.last_poll_at {
            Some(at) => writeln!(f, "Last poll: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?,
            None => writeln!(f, "Last poll: never")?,
        }
        match self.poll.last_found_at {
            Some(at) => writeln!(f, "Last found: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?,
            None => writeln!(f, "Last found: never")?,
        }
        match self.poll.next_poll_eta {
            Some(at) => writeln!(f, "Next poll: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?,
            None => writeln!(f, "Next poll: pending")?,
        }
        writeln!(f, "Backoff level: {}", self.poll.backoff_level)?;
        write!(f, "Subscribers: {}", self.subscribers)
    }
}

/// The engine controller
#[derive(Clone)]
pub struct EngineController {
    state: SharedState,
    engine: Arc<PollEngine>,
    dispatcher: SubscriberDispatcher,
    config: EngineConfig,
}

impl EngineController {
    /// Assemble the controller and its poll engine.
    ///
    /// The initial poll status (including a persisted backoff level) comes
    /// from the status store, so a restart resumes where it left off.
    pub fn new(
        source: AvailabilitySource,
        dispatcher: SubscriberDispatcher,
        seen: Arc<Mutex<SeenStore>>,
        status_store: StatusStore,
        schedule: ScheduleState,
        config: EngineConfig,
    ) -> Self {
        let status = status_store.load();
        let state: SharedState = Arc::new(Mutex::new(EngineState { schedule, status }));

        let engine = Arc::new(PollEngine::new(
            source,
            dispatcher.clone(),
            seen,
            status_store,
            state.clone(),
            config.clone(),
        ));

        Self {
            state,
            engine,
            dispatcher,
            config,
        }
    }

    /// Drive the timed loop until the process shuts down
    pub async fn run(&self) {
        tracing::info!(
            poll_interval_secs = self.config.poll_interval_secs,
            quiet_recheck_secs = self.config.quiet_recheck_secs,
            "engine loop starting"
        );

        loop {
            if let Some(transition) = self.evaluate_clock().await {
                self.announce(transition).await;
            }

            let mode = { self.state.lock().await.schedule.mode() };

            let sleep_for = match mode {
                EngineMode::Active => match self.engine.run_cycle().await {
                    CycleOutcome::SourceDown { retry_in, .. } => retry_in,
                    _ => self.config_poll_interval(),
                },
                EngineMode::Quiet => self.config_quiet_recheck(),
            };

            tokio::time::sleep(sleep_for).await;
        }
    }

    /// Report the combined engine status
    pub async fn status(&self) -> EngineStatus {
        let (schedule, poll) = {
            let state = self.state.lock().await;
            (state.schedule.snapshot(), state.status.clone())
        };

        EngineStatus {
            schedule,
            poll,
            subscribers: self.dispatcher.subscriber_count().await,
        }
    }

    /// Pin the engine to Quiet; announces the transition when one occurs
    pub async fn force_sleep(&self) -> Option<Transition> {
        let transition = { self.state.lock().await.schedule.force_sleep() };
        if let Some(t) = transition {
            tracing::info!("forced sleep");
            self.announce(t).await;
        }
        transition
    }

    /// Pin the engine to Active; announces the transition when one occurs
    pub async fn force_wake(&self) -> Option<Transition> {
        let transition = { self.state.lock().await.schedule.force_wake() };
        if let Some(t) = transition {
            tracing::info!("forced wake");
            self.announce(t).await;
        }
        transition
    }

    /// Run one cycle immediately, bypassing schedule and backoff.
    ///
    /// New findings follow the normal dispatch-then-mark-seen rule; the
    /// returned snapshot holds only the newly found ids.
    pub async fn run_check_now(&self) -> Result<Snapshot, Error> {
        match self.engine.run_cycle().await {
            CycleOutcome::Found(new) => Ok(new),
            CycleOutcome::Nothing => Ok(Snapshot::new()),
            CycleOutcome::SourceDown { error, .. } => Err(error.into()),
        }
    }

    async fn evaluate_clock(&self) -> Option<Transition> {
        let now = Local::now().time();
        self.state.lock().await.schedule.evaluate(now)
    }

    async fn announce(&self, transition: Transition) {
        let message = match transition {
            Transition::EnteringQuiet => "💤 Going quiet; polling paused. Send /wake to resume.",
            Transition::Resuming => "🔔 Awake again; polling resumed.",
        };
        self.dispatcher.broadcast(message).await;
    }

    fn config_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.poll_interval_secs)
    }

    fn config_quiet_recheck(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.quiet_recheck_secs)
    }
}
