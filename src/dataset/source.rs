//! Remote dataset locations.
//!
//! [`DatasetSource`] turns a [`VarietyDescriptor`] and a [`Granularity`] into
//! the URL of the upstream TSV file.  No I/O happens here.

use crate::table::{Granularity, VarietyDescriptor};

/// Builds dataset URLs under a base URL.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    base_url: String,
}

impl DatasetSource {
    /// Trailing slashes on `base_url` are ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// File name of a dataset, e.g. `eng_latn_uk_broad.tsv`.
    pub fn file_name(descriptor: &VarietyDescriptor, granularity: Granularity) -> String {
        format!("{}_{}.tsv", descriptor.key(), granularity)
    }

    /// Full URL of a dataset.
    pub fn locate(&self, descriptor: &VarietyDescriptor, granularity: Granularity) -> String {
        format!("{}/{}", self.base_url, Self::file_name(descriptor, granularity))
    }

    /// Granularities to attempt, in order.
    ///
    /// A broad variety is only ever fetched as broad.  Anything else tries
    /// broad first and falls back to narrow.
    pub fn resolve_granularity(descriptor: &VarietyDescriptor) -> Vec<Granularity> {
        match descriptor.granularity {
            Granularity::Broad => vec![Granularity::Broad],
            Granularity::Narrow => vec![Granularity::Broad, Granularity::Narrow],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
