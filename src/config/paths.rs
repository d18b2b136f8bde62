//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout (settings + history live side by side):
//!
//!   Windows: %APPDATA%\vocal-trainer\
//!   macOS:   ~/Library/Application Support/vocal-trainer/
//!   Linux:   ~/.config/vocal-trainer/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `history.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `history.json`, the key-value store holding past
    /// breath results.
    pub history_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "vocal-trainer";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            history_file: config_dir.join("history.json"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
