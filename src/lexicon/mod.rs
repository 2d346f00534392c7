//! Pronunciation lookup.
//!
//! This module provides:
//! * [`PronunciationIndex`]: word → IPA index built from one dataset.
//! * [`VarietyResolver`]: loads every variety of a language, skipping the
//!   ones that fail.
//! * [`IpaLookupService`]: merged lookup across a language's varieties.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ipa_resolver::config::AppConfig;
//! use ipa_resolver::lexicon::IpaLookupService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = IpaLookupService::from_config(&AppConfig::load()?)?;
//!
//!     let result = service.lookup("en", "schedule").await?;
//!     println!("{:?}", result.ipa); // Some("ʃɛdjuːl//skɛdʒuːl")
//!     Ok(())
//! }
//! ```

pub mod index;
pub mod resolver;
pub mod service;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use index::PronunciationIndex;
pub use resolver::{
    ResolvedLanguage, ResolvedVariety, VarietyFailure, VarietyOutcome, VarietyResolver,
};
pub use service::{IpaLookupService, LookupResult};
