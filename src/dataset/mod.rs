//! Dataset acquisition.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     DatasetCache                         │
//! │                                                          │
//! │  get(descriptor) ──▶ slot settled? ──yes──▶ Arc<Cached>  │
//! │                         │ no                             │
//! │                         ▼                                │
//! │             ┌──────────────────────┐                     │
//! │             │  DatasetStore (disk) │ hit ──▶ index       │
//! │             └──────────┬───────────┘                     │
//! │                        │ miss / expired                  │
//! │                        ▼                                 │
//! │   DatasetSource::locate(broad, narrow...)                │
//! │                        │                                 │
//! │                        ▼                                 │
//! │   DatasetFetcher::fetch ──▶ persist ──▶ index            │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod fetch;
pub mod source;
pub mod store;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use cache::{CachedDataset, DatasetCache, DatasetError, DatasetOrigin};
pub use fetch::{DatasetFetcher, FetchError, HttpFetcher};
pub use source::DatasetSource;
pub use store::{CleanupReport, DatasetStore, FsStore, StoredDataset};

// test-only re-export so other modules' tests can build a cache without
// `use crate::dataset::fetch::MockFetcher`.
#[cfg(test)]
pub use fetch::MockFetcher;
