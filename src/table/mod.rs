//! Language → variety mapping.
//!
//! [`VarietyTable`] maps a 2-letter language code to an ordered, non-empty
//! list of [`VarietyDescriptor`]s.  The table is data: the bundled copy lives
//! in `data/varieties.toml` and an external file with the same layout can
//! replace it through `LookupConfig::variety_table`.
//!
//! ```text
//! [[en]]                      ← one array entry per variety, in merge order
//! code = "eng"
//! script = "latn"
//! granularity = "broad"
//! variant = "uk"
//! label = "UK Received Pronunciation"
//! ```

pub mod variety;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use thiserror::Error;

pub use variety::{Granularity, VarietyDescriptor, VarietyKey};

use crate::error::LookupError;

/// Table shipped with the crate.
const BUNDLED_TABLE: &str = include_str!("../../data/varieties.toml");

// ---------------------------------------------------------------------------
// TableError
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating a variety table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read variety table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse variety table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("language '{0}' has no varieties")]
    EmptyEntry(String),

    #[error("language '{code}' lists variety '{key}' more than once")]
    DuplicateVariety { code: String, key: VarietyKey },
}

// ---------------------------------------------------------------------------
// VarietyTable
// ---------------------------------------------------------------------------

/// Immutable language table, loaded once and passed explicitly to the
/// components that need it.
#[derive(Debug, Clone)]
pub struct VarietyTable {
    entries: BTreeMap<String, Vec<VarietyDescriptor>>,
}

impl VarietyTable {
    /// The table bundled with the crate.
    pub fn bundled() -> Result<Self, TableError> {
        Self::from_toml_str(BUNDLED_TABLE)
    }

    /// Load an external table file.
    pub fn load_from(path: &Path) -> Result<Self, TableError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a table in TOML form.
    pub fn from_toml_str(content: &str) -> Result<Self, TableError> {
        let raw: BTreeMap<String, Vec<VarietyDescriptor>> = toml::from_str(content)?;
        Self::from_entries(raw)
    }

    /// Build a table from in-memory entries (test tables, programmatic setup).
    pub fn from_entries<I, S>(entries: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (S, Vec<VarietyDescriptor>)>,
        S: Into<String>,
    {
        let mut table = BTreeMap::new();
        for (code, varieties) in entries {
            let code: String = code.into();
            let code = normalize_code(&code);
            if varieties.is_empty() {
                return Err(TableError::EmptyEntry(code));
            }
            let mut seen = HashSet::new();
            for variety in &varieties {
                let key = variety.key();
                if !seen.insert(key.clone()) {
                    return Err(TableError::DuplicateVariety { code, key });
                }
            }
            table.insert(code, varieties);
        }
        Ok(Self { entries: table })
    }

    /// Ordered varieties for `code`.
    ///
    /// The code is trimmed and lower-cased first, so `" EN"` finds `en`.
    pub fn varieties_for(&self, code: &str) -> Result<&[VarietyDescriptor], LookupError> {
        let code = normalize_code(code);
        self.entries
            .get(&code)
            .map(Vec::as_slice)
            .ok_or(LookupError::UnknownLanguage(code))
    }

    /// Human labels of a language's varieties, in table order.
    ///
    /// Varieties without a label are listed by their variant tag or key.
    pub fn labels(&self, code: &str) -> Result<Vec<String>, LookupError> {
        Ok(self
            .varieties_for(code)?
            .iter()
            .map(VarietyDescriptor::display_label)
            .collect())
    }

    /// All configured language codes, sorted.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Case-fold and trim a language code.
pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
