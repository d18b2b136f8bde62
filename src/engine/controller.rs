//! Session controller: the single writer of all session state.
//!
//! [`Engine`] runs as one tokio task.  It owns the active session, the
//! history store and the `watch::Sender` for [`PublishedState`], and it
//! consumes two queues in one loop:
//!
//! ```text
//! EngineHandle::{start_*, stop, shutdown} ──Command──────┐
//! tickers / capture callback ─────────────SessionEvent───┴─▶ Engine::run
//!                                                              │
//!                                   watch::Sender<PublishedState>
//!                                                              ▼
//!                                       EngineHandle::{snapshot, subscribe}
//! ```
//!
//! Starting a session always stops the current one first: tickers are
//! cancelled and joined and capture handles dropped before the new
//! session acquires the microphone.  Each start also bumps the generation,
//! so events still queued from the old session are discarded.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::analysis::{PitchEstimator, LEVEL_FLOOR, NO_PITCH_LABEL};
use crate::audio::CaptureSource;
use crate::config::{AppConfig, BreathConfig};
use crate::history::HistoryStore;
use crate::session::{
    BreathRun, BreathSession, Countdown, Generation, PitchRun, PitchUpdate, SessionEvent,
};

use super::state::{PublishedState, SessionState};

// ---------------------------------------------------------------------------
// Command / EngineHandle
// ---------------------------------------------------------------------------

/// Control operations accepted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartBreath,
    StartPitch,
    Stop,
    /// Stop the active session and end the controller task.
    Shutdown,
}

/// Cheap-to-clone control and observation surface.
///
/// All control methods are fire-and-forget: they enqueue a [`Command`] and
/// return immediately; effects show up in the published state.  They are
/// plain (non-async) calls, so they can be used from any thread.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PublishedState>,
}

impl EngineHandle {
    pub fn start_breath_session(&self) {
        self.send(Command::StartBreath);
    }

    pub fn start_pitch_session(&self) {
        self.send(Command::StartPitch);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Latest published state.
    pub fn snapshot(&self) -> PublishedState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PublishedState> {
        self.state.clone()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::debug!("engine: {command:?} ignored, controller has shut down");
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

enum ActiveSession {
    Idle,
    Breath(BreathRun),
    Pitch(PitchRun),
}

/// The controller task.  Create with [`Engine::new`] or [`Engine::spawn`].
pub struct Engine {
    capture: Arc<dyn CaptureSource>,
    history: HistoryStore,
    breath_config: BreathConfig,
    estimator: PitchEstimator,

    active: ActiveSession,
    generation: Generation,

    commands_rx: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    state_tx: watch::Sender<PublishedState>,
}

impl Engine {
    /// Build a controller and its handle without starting it.
    pub fn new(
        capture: Arc<dyn CaptureSource>,
        history: HistoryStore,
        config: &AppConfig,
    ) -> (Self, EngineHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let initial = PublishedState::new(config.breath.duration_secs, history.entries().to_vec());
        let (state_tx, state_rx) = watch::channel(initial);

        let engine = Self {
            capture,
            history,
            breath_config: config.breath.clone(),
            estimator: config.pitch.estimator(),
            active: ActiveSession::Idle,
            generation: 0,
            commands_rx,
            events_tx,
            events_rx,
            state_tx,
        };
        let handle = EngineHandle {
            commands: commands_tx,
            state: state_rx,
        };
        (engine, handle)
    }

    /// Build a controller and spawn it on the current tokio runtime.
    pub fn spawn(
        capture: Arc<dyn CaptureSource>,
        history: HistoryStore,
        config: &AppConfig,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (engine, handle) = Self::new(capture, history, config);
        let task = tokio::spawn(engine.run());
        (handle, task)
    }

    /// Run until [`Command::Shutdown`] or until every handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                command = self.commands_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
            }
        }

        self.stop_active().await;
        log::info!("engine: controller shutting down");
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    async fn handle_command(&mut self, command: Command) {
        log::debug!("engine: {command:?}");
        match command {
            Command::StartBreath => self.start_breath().await,
            Command::StartPitch => self.start_pitch().await,
            Command::Stop | Command::Shutdown => self.stop_active().await,
        }
    }

    async fn start_breath(&mut self) {
        self.stop_active().await;
        self.generation += 1;

        let run = match BreathRun::start(
            Arc::clone(&self.capture),
            &self.breath_config,
            self.generation,
            self.events_tx.clone(),
        )
        .await
        {
            Ok(run) => run,
            Err(e) => {
                log::warn!("engine: breath session not started, microphone unavailable: {e}");
                return;
            }
        };

        log::info!(
            "engine: breath session {} started ({} s)",
            self.generation,
            self.breath_config.duration_secs
        );
        self.state_tx.send_modify(|s| {
            s.session = SessionState::RunningBreath;
            apply_breath(s, run.session());
        });
        self.active = ActiveSession::Breath(run);
    }

    async fn start_pitch(&mut self) {
        self.stop_active().await;
        self.generation += 1;

        let run = match PitchRun::start(
            Arc::clone(&self.capture),
            self.estimator,
            self.generation,
            self.events_tx.clone(),
        )
        .await
        {
            Ok(run) => run,
            Err(e) => {
                log::warn!("engine: pitch session not started, microphone unavailable: {e}");
                return;
            }
        };

        log::info!("engine: pitch session {} started", self.generation);
        self.state_tx.send_modify(|s| {
            s.session = SessionState::RunningPitch;
            s.audio_level = 0.0;
            s.current_pitch = NO_PITCH_LABEL.to_string();
            s.frequency = 0.0;
        });
        self.active = ActiveSession::Pitch(run);
    }

    /// Stop whatever is running.  No-op when idle.
    async fn stop_active(&mut self) {
        match std::mem::replace(&mut self.active, ActiveSession::Idle) {
            ActiveSession::Idle => {}
            ActiveSession::Breath(run) => {
                let generation = run.generation();
                let session = run.stop().await;

                if let Some(best) = session.result() {
                    if let Err(e) = self.history.append(best) {
                        log::warn!("engine: could not save breath result {best:.1} s: {e}");
                    }
                }
                log::info!(
                    "engine: breath session {generation} stopped, best {:.1} s",
                    session.best_sustain_secs()
                );

                let history = self.history.entries().to_vec();
                self.state_tx.send_modify(|s| {
                    s.session = SessionState::Idle;
                    s.history = history;
                });
            }
            ActiveSession::Pitch(run) => {
                let generation = run.generation();
                run.stop().await;
                log::info!("engine: pitch session {generation} stopped");
                self.state_tx.send_modify(|s| s.session = SessionState::Idle);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Session events
    // -----------------------------------------------------------------------

    async fn handle_event(&mut self, event: SessionEvent) {
        if event.generation() != self.generation {
            log::trace!("engine: dropping stale event {event:?}");
            return;
        }

        let mut expired = false;
        match (event, &mut self.active) {
            (SessionEvent::BreathSample { power_db, .. }, ActiveSession::Breath(run)) => {
                run.session_mut().on_fast_tick(power_db);
                self.state_tx.send_modify(|s| apply_breath(s, run.session()));
            }
            (SessionEvent::BreathSecond { .. }, ActiveSession::Breath(run)) => {
                match run.session_mut().on_slow_tick() {
                    Countdown::Running => {
                        self.state_tx.send_modify(|s| apply_breath(s, run.session()));
                    }
                    Countdown::Expired => expired = true,
                }
            }
            (SessionEvent::Pitch { update, .. }, ActiveSession::Pitch(_)) => {
                self.state_tx.send_modify(|s| apply_pitch(s, &update));
            }
            // Same generation but the session has already stopped.
            _ => {}
        }

        if expired {
            log::info!("engine: breath countdown finished");
            self.stop_active().await;
        }
    }
}

fn apply_breath(state: &mut PublishedState, session: &BreathSession) {
    state.audio_level = session.audio_level();
    state.current_breath_seconds = session.current_sustain_secs();
    state.best_breath = session.best_sustain_secs();
    state.remaining_time = session.remaining_secs();
}

fn apply_pitch(state: &mut PublishedState, update: &PitchUpdate) {
    state.audio_level = update.level;
    state.current_pitch = update.reading.label();
    state.frequency = update.reading.frequency_hz;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
