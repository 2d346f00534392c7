//! Language → ready pronunciation indexes.
//!
//! [`VarietyResolver`] loads every variety of a language through the
//! [`DatasetCache`], concurrently and independently, and reports one
//! [`VarietyOutcome`] per variety in table order.  A failing variety is
//! skipped; the language fails only when all of its varieties do.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::dataset::{CachedDataset, DatasetCache, DatasetError};
use crate::error::LookupError;
use crate::table::{normalize_code, VarietyDescriptor, VarietyTable};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A variety whose dataset is loaded.
#[derive(Debug, Clone)]
pub struct ResolvedVariety {
    pub descriptor: VarietyDescriptor,
    pub dataset: Arc<CachedDataset>,
}

/// A variety whose dataset could not be loaded.
#[derive(Debug, Clone)]
pub struct VarietyFailure {
    pub descriptor: VarietyDescriptor,
    pub error: DatasetError,
}

/// Per-variety result of a resolution.
pub type VarietyOutcome = Result<ResolvedVariety, VarietyFailure>;

// ---------------------------------------------------------------------------
// ResolvedLanguage
// ---------------------------------------------------------------------------

/// Snapshot of a language's loaded varieties, in table order.
///
/// Holds `Arc`s to the datasets, so it stays valid and unchanged even if the
/// cache refreshes a variety afterwards.
#[derive(Debug, Clone)]
pub struct ResolvedLanguage {
    code: String,
    varieties: Vec<ResolvedVariety>,
    failures: Vec<VarietyFailure>,
}

impl ResolvedLanguage {
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Loaded varieties, in table order.
    pub fn varieties(&self) -> &[ResolvedVariety] {
        &self.varieties
    }

    /// Varieties that were skipped, in table order.
    pub fn failures(&self) -> &[VarietyFailure] {
        &self.failures
    }
}

// ---------------------------------------------------------------------------
// VarietyResolver
// ---------------------------------------------------------------------------

/// Resolves language codes against a [`VarietyTable`] and a [`DatasetCache`].
#[derive(Clone)]
pub struct VarietyResolver {
    table: Arc<VarietyTable>,
    cache: Arc<DatasetCache>,
}

impl VarietyResolver {
    pub fn new(table: Arc<VarietyTable>, cache: Arc<DatasetCache>) -> Self {
        Self { table, cache }
    }

    pub fn table(&self) -> &VarietyTable {
        &self.table
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// One outcome per variety of `code`, in table order.
    ///
    /// Fails only with `UnknownLanguage`.
    pub async fn resolve_outcomes(&self, code: &str) -> Result<Vec<VarietyOutcome>, LookupError> {
        let descriptors = self.table.varieties_for(code)?.to_vec();
        Ok(self.load_all(descriptors, false).await)
    }

    /// Loaded varieties of `code`.
    ///
    /// # Errors
    ///
    /// `UnknownLanguage` when the code is not in the table,
    /// `NoVarietyAvailable` when every variety failed.
    pub async fn resolve(&self, code: &str) -> Result<ResolvedLanguage, LookupError> {
        let outcomes = self.resolve_outcomes(code).await?;
        let code = normalize_code(code);

        let mut varieties = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(resolved) => varieties.push(resolved),
                Err(failure) => {
                    log::warn!(
                        "language {code}: skipping variety {}: {}",
                        failure.descriptor.key(),
                        failure.error
                    );
                    failures.push(failure);
                }
            }
        }

        if varieties.is_empty() {
            return Err(LookupError::NoVarietyAvailable(code));
        }
        Ok(ResolvedLanguage {
            code,
            varieties,
            failures,
        })
    }

    /// Re-download every variety of `code`.
    pub async fn refresh(&self, code: &str) -> Result<Vec<VarietyOutcome>, LookupError> {
        let descriptors = self.table.varieties_for(code)?.to_vec();
        Ok(self.load_all(descriptors, true).await)
    }

    /// Load (or refresh) each descriptor on its own task.  Results are written
    /// back by position, so the output follows table order whatever the
    /// completion order.
    async fn load_all(
        &self,
        descriptors: Vec<VarietyDescriptor>,
        refresh: bool,
    ) -> Vec<VarietyOutcome> {
        let mut slots: Vec<Option<VarietyOutcome>> = vec![None; descriptors.len()];
        let mut tasks = JoinSet::new();

        for (position, descriptor) in descriptors.iter().cloned().enumerate() {
            let cache = Arc::clone(&self.cache);
            tasks.spawn(async move {
                let result = if refresh {
                    cache.refresh(&descriptor).await
                } else {
                    cache.get(&descriptor).await
                };
                let outcome = match result {
                    Ok(dataset) => Ok(ResolvedVariety {
                        descriptor,
                        dataset,
                    }),
                    Err(error) => Err(VarietyFailure { descriptor, error }),
                };
                (position, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, outcome)) => slots[position] = Some(outcome),
                Err(e) => log::error!("variety load task failed: {e}"),
            }
        }

        slots
            .into_iter()
            .zip(descriptors)
            .map(|(slot, descriptor)| {
                slot.unwrap_or_else(|| {
                    let key = descriptor.key();
                    Err(VarietyFailure {
                        descriptor,
                        error: DatasetError::Internal {
                            key,
                            reason: "load task did not complete".into(),
                        },
                    })
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
