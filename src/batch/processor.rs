//! Token batch → per-token transcriptions plus an error summary.
//!
//! # Flow
//!
//! ```text
//! tokens ──▶ distinct language codes ──▶ tokio::spawn: service.resolve(code)
//!                                              │  (one task per language)
//!                                              ▼
//!        per token, in input order: lookup in the resolved snapshot
//!              ├─ found      → TokenResult { ipa: Some(..) }
//!              ├─ not found  → TokenResult { ipa: None }
//!              └─ error      → TokenResult { ipa: None } + BatchError
//! ```
//!
//! A failing token never aborts the batch: the output always has one entry per
//! input token, in input order.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};

use crate::error::{ErrorKind, LookupError};
use crate::lexicon::{IpaLookupService, ResolvedLanguage};
use crate::table::normalize_code;

// ---------------------------------------------------------------------------
// Token / results
// ---------------------------------------------------------------------------

/// One word to transcribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: String,
    pub text: String,
    pub language: String,
}

impl Token {
    pub fn new(id: impl Into<String>, text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            language: language.into(),
        }
    }
}

/// Output record for one token.  `ipa` is omitted from JSON when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResult {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipa: Option<String>,
}

/// Why one token has no transcription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub token_id: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl BatchError {
    fn new(token_id: &str, failure: &TokenFailure) -> Self {
        Self {
            token_id: token_id.to_string(),
            kind: failure.kind,
            message: failure.message.clone(),
        }
    }
}

/// Result of [`BatchProcessor::process`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// One entry per input token, in input order.
    pub results: Vec<TokenResult>,
    /// `None` when every token was looked up without error.
    pub errors: Option<Vec<BatchError>>,
}

impl BatchOutcome {
    pub fn has_errors(&self) -> bool {
        self.errors.is_some()
    }
}

// ---------------------------------------------------------------------------
// BatchProcessor
// ---------------------------------------------------------------------------

/// Why a language could not be used for any of its tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TokenFailure {
    kind: ErrorKind,
    message: String,
}

impl TokenFailure {
    /// The resolution task for `code` panicked or was cancelled.
    fn interrupted(code: &str, error: &JoinError) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: format!("resolution of language '{code}' did not complete: {error}"),
        }
    }
}

impl From<LookupError> for TokenFailure {
    fn from(e: LookupError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Outcome of resolving one language code.
type LanguageSlot = Result<Arc<ResolvedLanguage>, TokenFailure>;

#[derive(Clone)]
pub struct BatchProcessor {
    service: IpaLookupService,
}

impl BatchProcessor {
    pub fn new(service: IpaLookupService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &IpaLookupService {
        &self.service
    }

    /// Look every token up.
    pub async fn process(&self, tokens: &[Token]) -> BatchOutcome {
        let (positions, languages) = self.resolve_languages(tokens).await;

        let mut results = Vec::with_capacity(tokens.len());
        let mut errors = Vec::new();

        for (token, &position) in tokens.iter().zip(&positions) {
            let ipa = match &languages[position] {
                Ok(resolved) => self.service.lookup_in(resolved, &token.text).ipa,
                Err(failure) => {
                    errors.push(BatchError::new(&token.id, failure));
                    None
                }
            };
            results.push(TokenResult {
                id: token.id.clone(),
                text: token.text.clone(),
                ipa,
            });
        }

        if !errors.is_empty() {
            log::info!(
                "batch of {} tokens finished with {} errors",
                tokens.len(),
                errors.len()
            );
        }

        BatchOutcome {
            results,
            errors: (!errors.is_empty()).then_some(errors),
        }
    }

    /// Resolve each distinct (normalised) language once, concurrently.
    ///
    /// Returns, per token, the position of its language in the second vector.
    async fn resolve_languages(&self, tokens: &[Token]) -> (Vec<usize>, Vec<LanguageSlot>) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut positions = Vec::with_capacity(tokens.len());
        let mut handles: Vec<(String, JoinHandle<_>)> = Vec::new();

        for token in tokens {
            let code = normalize_code(&token.language);
            let position = match seen.get(&code) {
                Some(&position) => position,
                None => {
                    let service = self.service.clone();
                    let task_code = code.clone();
                    let handle = tokio::spawn(async move { service.resolve(&task_code).await });

                    let position = handles.len();
                    seen.insert(code.clone(), position);
                    handles.push((code, handle));
                    position
                }
            };
            positions.push(position);
        }

        let mut languages = Vec::with_capacity(handles.len());
        for (code, handle) in handles {
            let slot = match handle.await {
                Ok(resolved) => resolved.map(Arc::new).map_err(TokenFailure::from),
                Err(e) => {
                    log::error!("language {code}: resolution task failed: {e}");
                    Err(TokenFailure::interrupted(&code, &e))
                }
            };
            languages.push(slot);
        }

        (positions, languages)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
