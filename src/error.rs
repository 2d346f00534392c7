//! Token-level lookup errors.
//!
//! These are the failures that escalate to a token's result once every
//! alternative has been exhausted.  Component-local failures (a malformed
//! dataset row, one variety out of several being unavailable) never reach
//! this type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::VarietyKey;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Serialisable discriminant of a [`LookupError`], used in batch error entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownLanguage,
    DatasetUnavailable,
    NoVarietyAvailable,
    /// The lookup did not run to completion (a resolution task panicked or
    /// was cancelled).  Never produced by [`LookupError`].
    Internal,
}

// ---------------------------------------------------------------------------
// LookupError
// ---------------------------------------------------------------------------

/// Errors returned by resolution and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The language code is not configured in the variety table.  Permanent.
    #[error("unknown language code '{0}'")]
    UnknownLanguage(String),

    /// Every granularity of a variety failed to download.
    #[error("dataset '{0}' is unavailable")]
    DatasetUnavailable(VarietyKey),

    /// Every variety configured for the language failed.
    #[error("no pronunciation dataset available for language '{0}'")]
    NoVarietyAvailable(String),
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::UnknownLanguage(_) => ErrorKind::UnknownLanguage,
            LookupError::DatasetUnavailable(_) => ErrorKind::DatasetUnavailable,
            LookupError::NoVarietyAvailable(_) => ErrorKind::NoVarietyAvailable,
        }
    }
}
