//! Configuration module for Vocal Trainer.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each session
//! type, `AppPaths` for cross-platform data directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, AudioConfig, BreathConfig, HistoryConfig, PitchConfig};
