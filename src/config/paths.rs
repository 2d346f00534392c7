//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\ipa-resolver\
//!   macOS:   ~/Library/Application Support/ipa-resolver/
//!   Linux:   ~/.config/ipa-resolver/
//!
//! Cache dir (downloaded datasets):
//!   Windows: %LOCALAPPDATA%\ipa-resolver\datasets\
//!   macOS:   ~/Library/Caches/ipa-resolver/datasets/
//!   Linux:   ~/.cache/ipa-resolver/datasets/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default directory for persisted pronunciation datasets.
    pub datasets_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "ipa-resolver";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            datasets_dir: cache_dir.join("datasets"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
