//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` only
//! overrides the keys it names.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Upstream location of the scraped pronunciation TSV files.
pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/CUNY-CL/wikipron/master/data/scrape/tsv";

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

/// Where datasets are downloaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL; dataset file names are appended to it.
    pub base_url: String,
    /// Per-request timeout in milliseconds.  A timed-out download counts as
    /// an unavailable dataset.
    pub request_timeout_ms: u64,
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOURCE_URL.into(),
            request_timeout_ms: 30_000,
        }
    }
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// Durable dataset cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one file per variety.
    pub directory: PathBuf,
    /// Maximum age of a persisted dataset before it is re-downloaded.
    /// `None` keeps datasets forever.
    pub max_age_secs: Option<u64>,
}

impl CacheConfig {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: AppPaths::new().datasets_dir,
            max_age_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LookupConfig
// ---------------------------------------------------------------------------

/// Word lookup and merge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Separator placed between distinct transcriptions from several
    /// varieties.
    pub multi_variety_delimiter: String,
    /// Remove the spaces that separate IPA segments in the upstream files
    /// (`"h ə l oʊ"` → `"həloʊ"`).
    pub join_segments: bool,
    /// External variety table replacing the bundled one.
    pub variety_table: Option<PathBuf>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            multi_variety_delimiter: "//".into(),
            join_segments: true,
            variety_table: None,
        }
    }
}

// ---------------------------------------------------------------------------
// BatchConfig
// ---------------------------------------------------------------------------

/// Field names read from inbound token objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Field holding the word to transcribe.
    pub token_text_field: String,
    /// Field holding a per-token language code.  When a token lacks it the
    /// request-level language applies.
    pub token_language_field: String,
    /// Field identifying a token in error entries.  The token's position is
    /// used when it is missing.
    pub token_id_field: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            token_text_field: "lemma".into(),
            token_language_field: "lang".into(),
            token_id_field: "id".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use ipa_resolver::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert_eq!(config.lookup.multi_variety_delimiter, "//");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub lookup: LookupConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
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
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
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
