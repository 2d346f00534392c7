//! Batch transcription.
//!
//! * [`BatchProcessor`]: typed tokens in, per-token results and an error
//!   summary out.
//! * [`DocumentAnnotator`]: the same over a JSON request document.

pub mod document;
pub mod processor;

pub use document::{AnnotatedDocument, DocumentAnnotator, IPA_FIELD};
pub use processor::{BatchError, BatchOutcome, BatchProcessor, Token, TokenResult};
