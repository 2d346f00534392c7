//! Word → merged IPA lookup.
//!
//! [`IpaLookupService`] resolves a language (network and disk work happen
//! there, inside the cache) and then queries each loaded variety's index.
//! The query itself is pure: it reads immutable index snapshots.
//!
//! # Merge rule
//!
//! Transcriptions are collected variety by variety in table order, dropping
//! any already seen, and joined with the multi-variety delimiter:
//!
//! ```text
//! en = [uk, us]    uk: schedule → ʃɛdjuːl
//!                  us: schedule → skɛdʒuːl
//!
//! lookup("en", "schedule") → "ʃɛdjuːl//skɛdʒuːl"
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::AppConfig;
use crate::dataset::DatasetCache;
use crate::error::LookupError;
use crate::table::VarietyTable;

use super::index::fold;
use super::resolver::{ResolvedLanguage, VarietyResolver};

// ---------------------------------------------------------------------------
// LookupResult
// ---------------------------------------------------------------------------

/// Outcome of one `(language, word)` query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    pub found: bool,
    /// Merged transcription; `None` when not found.
    pub ipa: Option<String>,
    /// Labels of the varieties that contributed, in table order.
    pub varieties: Vec<String>,
}

impl LookupResult {
    pub fn not_found() -> Self {
        Self {
            found: false,
            ipa: None,
            varieties: Vec::new(),
        }
    }
}

impl ResolvedLanguage {
    /// Merge every variety's transcriptions of `word`.
    pub fn lookup(&self, word: &str, delimiter: &str) -> LookupResult {
        let word = fold(word);
        let mut transcriptions: Vec<&str> = Vec::new();
        let mut varieties = Vec::new();

        for variety in self.varieties() {
            let hits = variety.dataset.index().lookup(&word);
            if hits.is_empty() {
                continue;
            }
            varieties.push(variety.descriptor.display_label());
            for ipa in hits {
                if !transcriptions.contains(&ipa.as_str()) {
                    transcriptions.push(ipa);
                }
            }
        }

        if transcriptions.is_empty() {
            return LookupResult::not_found();
        }
        LookupResult {
            found: true,
            ipa: Some(transcriptions.join(delimiter)),
            varieties,
        }
    }
}

// ---------------------------------------------------------------------------
// IpaLookupService
// ---------------------------------------------------------------------------

/// Cheap to clone; clones share the table and the cache.
#[derive(Clone)]
pub struct IpaLookupService {
    resolver: VarietyResolver,
    delimiter: Arc<str>,
}

impl IpaLookupService {
    pub fn new(resolver: VarietyResolver, delimiter: impl Into<Arc<str>>) -> Self {
        Self {
            resolver,
            delimiter: delimiter.into(),
        }
    }

    /// Build the production stack: variety table (external file or bundled),
    /// HTTP fetcher, directory store.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let table = match &config.lookup.variety_table {
            Some(path) => load_table(path)?,
            None => VarietyTable::bundled().context("bundled variety table is invalid")?,
        };
        let cache = DatasetCache::from_config(config).with_context(|| {
            format!(
                "cannot open dataset cache at {}",
                config.cache.directory.display()
            )
        })?;

        let resolver = VarietyResolver::new(Arc::new(table), Arc::new(cache));
        Ok(Self::new(
            resolver,
            config.lookup.multi_variety_delimiter.as_str(),
        ))
    }

    pub fn resolver(&self) -> &VarietyResolver {
        &self.resolver
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Resolve `code` once, for many lookups.
    pub async fn resolve(&self, code: &str) -> Result<ResolvedLanguage, LookupError> {
        self.resolver.resolve(code).await
    }

    /// Look `word` up in an already resolved language.
    pub fn lookup_in(&self, resolved: &ResolvedLanguage, word: &str) -> LookupResult {
        resolved.lookup(word, &self.delimiter)
    }

    /// Resolve `code` and look `word` up.
    pub async fn lookup(&self, code: &str, word: &str) -> Result<LookupResult, LookupError> {
        let resolved = self.resolve(code).await?;
        Ok(self.lookup_in(&resolved, word))
    }
}

fn load_table(path: &Path) -> Result<VarietyTable> {
    VarietyTable::load_from(path)
        .with_context(|| format!("cannot load variety table {}", path.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
