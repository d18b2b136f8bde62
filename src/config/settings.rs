//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every table is `#[serde(default)]`, so a `settings.toml` that sets only
//! one key still loads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::analysis::PitchEstimator;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Microphone selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Audio input device name; `None` means the system default.
    pub input_device: Option<String>,
}

// ---------------------------------------------------------------------------
// BreathConfig
// ---------------------------------------------------------------------------

/// Timing of the sustained-breath exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathConfig {
    /// Length of one session in seconds.
    pub duration_secs: u32,
    /// Metering period in milliseconds; each sustained sample adds this
    /// much to the current run.
    pub fast_tick_ms: u64,
    /// Countdown period in milliseconds.
    pub slow_tick_ms: u64,
}

impl Default for BreathConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            fast_tick_ms: 100,
            slow_tick_ms: 1_000,
        }
    }
}

impl BreathConfig {
    pub fn fast_tick(&self) -> Duration {
        Duration::from_millis(self.fast_tick_ms.max(1))
    }

    pub fn slow_tick(&self) -> Duration {
        Duration::from_millis(self.slow_tick_ms.max(1))
    }
}

// ---------------------------------------------------------------------------
// PitchConfig
// ---------------------------------------------------------------------------

/// Frequency range in which a zero-crossing estimate is trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        let estimator = PitchEstimator::default();
        Self {
            min_hz: estimator.min_hz,
            max_hz: estimator.max_hz,
        }
    }
}

impl PitchConfig {
    pub fn estimator(&self) -> PitchEstimator {
        PitchEstimator::new(self.min_hz, self.max_hz)
    }
}

// ---------------------------------------------------------------------------
// HistoryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Override for the history file; `None` uses
    /// [`AppPaths::history_file`].
    pub file: Option<PathBuf>,
}

impl HistoryConfig {
    pub fn resolve_file(&self, paths: &AppPaths) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| paths.history_file.clone())
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use vocal_trainer::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub breath: BreathConfig,
    pub pitch: PitchConfig,
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
