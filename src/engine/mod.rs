//! Session controller and the state it publishes.
//!
//! # Architecture
//!
//! ```text
//! presentation ──start_breath_session / start_pitch_session / stop──▶ EngineHandle
//!                                                                       │ Command (mpsc)
//!                                                                       ▼
//!      BreathRun tickers ──SessionEvent──▶  Engine::run  (single writer)
//!      PitchRun callback ──SessionEvent──▶      │
//!                                               ├─ HistoryStore::append on breath stop
//!                                               ▼
//!                                   watch<PublishedState> ──▶ snapshot / subscribe
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vocal_trainer::audio::AudioCapture;
//! use vocal_trainer::config::AppConfig;
//! use vocal_trainer::engine::Engine;
//! use vocal_trainer::history::{HistoryStore, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let history = HistoryStore::load(Box::new(MemoryStore::new()));
//!     let (engine, _task) = Engine::spawn(Arc::new(AudioCapture::new(None)), history, &config);
//!
//!     engine.start_breath_session();
//!     let mut updates = engine.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let state = updates.borrow().clone();
//!         println!("{} s left, best {:.1} s", state.remaining_time, state.best_breath);
//!     }
//! }
//! ```

pub mod controller;
pub mod state;

pub use controller::{Command, Engine, EngineHandle};
pub use state::{PublishedState, SessionState};
