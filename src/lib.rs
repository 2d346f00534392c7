//! IPA transcription lookup.
//!
//! Maps a 2-letter language code onto one or more pronunciation datasets
//! (one per dialectal variety), downloads and caches each dataset once, and
//! answers case-insensitive word lookups with a deterministic multi-variety
//! merge.
//!
//! ```text
//! BatchProcessor ──▶ IpaLookupService ──▶ VarietyResolver ──▶ DatasetCache
//!                                               │                 │
//!                                               ▼                 ▼
//!                                         VarietyTable      DatasetSource
//! ```

pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod lexicon;
pub mod table;
