//! Variety descriptors: the immutable records that name one pronunciation
//! dataset.
//!
//! A [`VarietyDescriptor`] identifies a dataset by ISO-639-3 code, script and
//! optional regional variant.  Its [`VarietyKey`] is the cache identity; the
//! [`Granularity`] only decides which remote files are attempted.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Granularity
// ---------------------------------------------------------------------------

/// Transcription precision level of a dataset.
///
/// Upstream also publishes stress-marked variants; those are never requested
/// and have no representation here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Phonemic transcription.
    Broad,
    /// Phonetic transcription, more detailed.
    Narrow,
}

impl Granularity {
    /// File-name component used by the remote source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Broad => "broad",
            Granularity::Narrow => "narrow",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// VarietyKey
// ---------------------------------------------------------------------------

/// Unique identifier of a variety's dataset, e.g. `eng_latn_uk` or `deu_latn`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarietyKey(String);

impl VarietyKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VarietyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VarietyKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

// ---------------------------------------------------------------------------
// VarietyDescriptor
// ---------------------------------------------------------------------------

/// One dialectal/regional pronunciation dataset of a language.
///
/// Identity is `(code, script, variant)`; two descriptors that differ only in
/// granularity or label refer to the same dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarietyDescriptor {
    /// ISO-639-3 code (`"eng"`, or a shared macro-language such as `"hbs"`).
    pub code: String,
    /// ISO-15924 script in lower case (`"latn"`, `"cyrl"`, ...).
    pub script: String,
    /// Preferred transcription granularity.
    pub granularity: Granularity,
    /// Regional variant tag (`"uk"`, `"us"`), absent for the main dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Human-readable name of the variety.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl VarietyDescriptor {
    pub fn new(code: impl Into<String>, script: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            code: code.into(),
            script: script.into(),
            granularity,
            variant: None,
            label: None,
        }
    }

    /// Builder-style setter for the regional variant.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Builder-style setter for the human label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Dataset stem without granularity, e.g. `eng_latn_uk`.
    pub fn key(&self) -> VarietyKey {
        match self.variant.as_deref() {
            Some(variant) if !variant.is_empty() => {
                VarietyKey(format!("{}_{}_{}", self.code, self.script, variant))
            }
            _ => VarietyKey(format!("{}_{}", self.code, self.script)),
        }
    }

    /// Label used in lookup results: the human label, then the variant tag,
    /// then the key itself.
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .or_else(|| self.variant.clone())
            .unwrap_or_else(|| self.key().to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
