//! Vocal Trainer: real-time breath and pitch exercises driven by the
//! microphone.
//!
//! # Layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`analysis`] | Pure signal analysis: zero-crossing pitch, loudness band |
//! | [`audio`] | cpal capture source (metering + streaming) |
//! | [`session`] | Breath countdown state machine, pitch streaming, tickers |
//! | [`history`] | Persisted most-recent-first list of best breaths |
//! | [`engine`] | Single-writer session controller and published state |
//! | [`config`] | `settings.toml` and platform paths |
//! | [`console`] | Line-based command reader used by the binary |

pub mod analysis;
pub mod audio;
pub mod config;
pub mod console;
pub mod engine;
pub mod history;
pub mod session;
