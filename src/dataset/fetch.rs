//! Remote dataset download.
//!
//! [`DatasetFetcher`] is the async seam between the cache and the network.
//! [`HttpFetcher`] is the production implementation backed by `reqwest`.
//!
//! A missing dataset (HTTP 404) is an expected outcome and is reported as
//! `Ok(None)`, not as an error: it tells the cache to try the next
//! granularity.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SourceConfig;

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Errors that can occur while downloading a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("dataset request timed out")]
    Timeout,

    /// The server answered with a non-success status other than 404.
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// DatasetFetcher trait
// ---------------------------------------------------------------------------

/// Async download of one dataset file.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn DatasetFetcher>` by every cache slot.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    /// Fetch the TSV text at `url`; `Ok(None)` when it does not exist.
    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError>;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Plain HTTP(S) GET with a per-request timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from source config.
    ///
    /// A default (no-timeout) client is used as a last-resort fallback if the
    /// builder fails.
    pub fn from_config(config: &SourceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }
}

#[async_trait]
impl DatasetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(Some(response.text().await?))
    }
}

// ---------------------------------------------------------------------------
// MockFetcher  (test double)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockFetcher;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
