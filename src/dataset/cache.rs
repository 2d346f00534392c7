//! Dataset cache with single-flight downloads.
//!
//! # Slot model
//!
//! ```text
//! slots: Mutex<HashMap<VarietyKey, Arc<Slot>>>     (held only to find a slot)
//!
//! Slot
//!  ├─ fetch: tokio Mutex<()>      one load/refresh per key at a time
//!  └─ state: RwLock<SlotState>    Empty | Ready(Arc<CachedDataset>) | Failed(err)
//! ```
//!
//! `get` reads `state` first and returns immediately when the key is settled.
//! Otherwise it queues on `fetch`; the first caller loads (disk, then remote)
//! and the rest find the settled state when they get the lock.  Locks are per
//! key, so resolving one variety never waits on another.
//!
//! A failed load is remembered until [`DatasetCache::invalidate`].  Both
//! `invalidate` and [`DatasetCache::clear_all`] take the key's `fetch` lock
//! before resetting it, so an in-flight load never lands after a reset.  A
//! [`DatasetCache::refresh`] swaps in a new `Arc<CachedDataset>`; holders of
//! the previous `Arc` keep their snapshot.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use thiserror::Error;

use crate::config::AppConfig;
use crate::error::LookupError;
use crate::lexicon::PronunciationIndex;
use crate::table::{Granularity, VarietyDescriptor, VarietyKey};

use super::fetch::{DatasetFetcher, FetchError, HttpFetcher};
use super::source::DatasetSource;
use super::store::{CleanupReport, DatasetStore, FsStore, StoredDataset};

// ---------------------------------------------------------------------------
// DatasetError
// ---------------------------------------------------------------------------

/// Why a variety's dataset could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    /// Every attempted URL answered 404.
    #[error("dataset '{key}' not found upstream (tried {})", .attempted.join(", "))]
    NotFound {
        key: VarietyKey,
        attempted: Vec<String>,
    },

    /// The download failed (transport error, timeout, bad status).
    #[error("dataset '{key}' could not be fetched: {error}")]
    Fetch { key: VarietyKey, error: FetchError },

    /// The index build task did not complete.
    #[error("dataset '{key}' could not be indexed: {reason}")]
    Internal { key: VarietyKey, reason: String },
}

impl DatasetError {
    pub fn key(&self) -> &VarietyKey {
        match self {
            DatasetError::NotFound { key, .. }
            | DatasetError::Fetch { key, .. }
            | DatasetError::Internal { key, .. } => key,
        }
    }
}

impl From<DatasetError> for LookupError {
    fn from(e: DatasetError) -> Self {
        LookupError::DatasetUnavailable(e.key().clone())
    }
}

// ---------------------------------------------------------------------------
// CachedDataset
// ---------------------------------------------------------------------------

/// Where a dataset's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetOrigin {
    /// Downloaded in this process, at the given granularity.
    Remote(Granularity),
    /// Read from the durable store.
    Disk,
}

/// One variety's dataset, indexed and ready for lookups.  Never mutated; a
/// refresh produces a new value.
#[derive(Debug)]
pub struct CachedDataset {
    key: VarietyKey,
    origin: DatasetOrigin,
    fetched_at: SystemTime,
    index: PronunciationIndex,
}

impl CachedDataset {
    pub fn key(&self) -> &VarietyKey {
        &self.key
    }

    pub fn origin(&self) -> DatasetOrigin {
        self.origin
    }

    /// Download time (or store write time for datasets read from disk).
    pub fn fetched_at(&self) -> SystemTime {
        self.fetched_at
    }

    pub fn index(&self) -> &PronunciationIndex {
        &self.index
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
enum SlotState {
    #[default]
    Empty,
    Ready(Arc<CachedDataset>),
    Failed(DatasetError),
}

#[derive(Debug, Default)]
struct Slot {
    fetch: tokio::sync::Mutex<()>,
    state: RwLock<SlotState>,
}

impl Slot {
    /// The settled result, if any.
    fn settled(&self) -> Option<Result<Arc<CachedDataset>, DatasetError>> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SlotState::Empty => None,
            SlotState::Ready(dataset) => Some(Ok(Arc::clone(dataset))),
            SlotState::Failed(err) => Some(Err(err.clone())),
        }
    }

    fn set(&self, state: SlotState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

// ---------------------------------------------------------------------------
// DatasetCache
// ---------------------------------------------------------------------------

/// Fetches, persists and indexes variety datasets, at most once per key.
pub struct DatasetCache {
    source: DatasetSource,
    fetcher: Arc<dyn DatasetFetcher>,
    store: Arc<dyn DatasetStore>,
    join_segments: bool,
    max_age: Option<Duration>,
    slots: Mutex<HashMap<VarietyKey, Arc<Slot>>>,
}

impl DatasetCache {
    pub fn new(
        source: DatasetSource,
        fetcher: Arc<dyn DatasetFetcher>,
        store: Arc<dyn DatasetStore>,
    ) -> Self {
        Self {
            source,
            fetcher,
            store,
            join_segments: false,
            max_age: None,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// HTTP fetcher and directory store as described by `config`.
    pub fn from_config(config: &AppConfig) -> io::Result<Self> {
        let store = FsStore::open(&config.cache.directory)?;
        Ok(Self::new(
            DatasetSource::new(config.source.base_url.clone()),
            Arc::new(HttpFetcher::from_config(&config.source)),
            Arc::new(store),
        )
        .with_join_segments(config.lookup.join_segments)
        .with_max_age(config.cache.max_age()))
    }

    /// Remove the spaces between IPA segments when indexing.
    pub fn with_join_segments(mut self, join_segments: bool) -> Self {
        self.join_segments = join_segments;
        self
    }

    /// Re-download persisted datasets older than `max_age`.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    fn slot(&self, key: &VarietyKey) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// The dataset for `descriptor`, loading it on first access.
    ///
    /// Concurrent callers for the same key share one load.  A failure is
    /// returned again on every later call until [`invalidate`](Self::invalidate).
    pub async fn get(
        &self,
        descriptor: &VarietyDescriptor,
    ) -> Result<Arc<CachedDataset>, DatasetError> {
        let key = descriptor.key();
        let slot = self.slot(&key);
        if let Some(settled) = slot.settled() {
            return settled;
        }

        let _guard = slot.fetch.lock().await;
        if let Some(settled) = slot.settled() {
            return settled;
        }

        let result = self.load(descriptor).await;
        slot.set(match &result {
            Ok(dataset) => SlotState::Ready(Arc::clone(dataset)),
            Err(err) => SlotState::Failed(err.clone()),
        });
        result
    }

    /// Download `descriptor` again and swap it in.
    ///
    /// On failure a previously loaded dataset stays in place.
    pub async fn refresh(
        &self,
        descriptor: &VarietyDescriptor,
    ) -> Result<Arc<CachedDataset>, DatasetError> {
        let slot = self.slot(&descriptor.key());
        let _guard = slot.fetch.lock().await;

        match self.fetch_remote(descriptor).await {
            Ok(dataset) => {
                slot.set(SlotState::Ready(Arc::clone(&dataset)));
                Ok(dataset)
            }
            Err(err) => {
                if !matches!(slot.settled(), Some(Ok(_))) {
                    slot.set(SlotState::Failed(err.clone()));
                } else {
                    log::warn!("refresh of {} failed, keeping current copy: {err}", err.key());
                }
                Err(err)
            }
        }
    }

    /// Forget whatever is cached in memory for `key`, including a remembered
    /// failure, so the next `get` loads again.
    ///
    /// Waits for a load of `key` that is already running, so its result
    /// cannot land after the reset.
    pub async fn invalidate(&self, key: &VarietyKey) {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        if let Some(slot) = slot {
            let _guard = slot.fetch.lock().await;
            slot.set(SlotState::Empty);
        }
    }

    /// The in-memory dataset for `key`, without loading.
    pub fn peek(&self, key: &VarietyKey) -> Option<Arc<CachedDataset>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(key)?.settled()? {
            Ok(dataset) => Some(dataset),
            Err(_) => None,
        }
    }

    /// Whether the durable store holds a copy of `key`.
    pub fn is_persisted(&self, key: &VarietyKey) -> bool {
        self.store.exists(key)
    }

    /// Reset every in-memory entry and wipe the durable store.
    ///
    /// Loads already running finish first; new ones wait until the store is
    /// wiped.  Slots are reset in place, so a key still has one load at a time.
    pub async fn clear_all(&self) -> io::Result<CleanupReport> {
        let slots: Vec<Arc<Slot>> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut guards = Vec::with_capacity(slots.len());
        for slot in &slots {
            guards.push(slot.fetch.lock().await);
        }

        let store = Arc::clone(&self.store);
        let cleared = tokio::task::spawn_blocking(move || store.clear())
            .await
            .map_err(io::Error::other)
            .and_then(|result| result);

        for slot in &slots {
            slot.set(SlotState::Empty);
        }
        drop(guards);

        let report = cleared?;

        log::info!(
            "dataset cache cleared: {} files, {}",
            report.files_removed,
            report.formatted_size()
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Disk first, then remote.  A stale disk copy is used when the
    /// re-download fails.
    async fn load(
        &self,
        descriptor: &VarietyDescriptor,
    ) -> Result<Arc<CachedDataset>, DatasetError> {
        let key = descriptor.key();

        let stale = match self.read_stored(&key).await {
            Some(stored) if !self.is_expired(&stored) => {
                log::info!("dataset {key}: loaded from cache");
                return self
                    .build(key, DatasetOrigin::Disk, stored.modified, stored.content, false)
                    .await;
            }
            other => other,
        };

        match self.fetch_remote(descriptor).await {
            Ok(dataset) => Ok(dataset),
            Err(err) => match stale {
                Some(stored) => {
                    log::warn!("dataset {key}: re-download failed ({err}), serving stale copy");
                    self.build(key, DatasetOrigin::Disk, stored.modified, stored.content, false)
                        .await
                }
                None => Err(err),
            },
        }
    }

    /// Try each granularity in order; the first hit is persisted and indexed.
    async fn fetch_remote(
        &self,
        descriptor: &VarietyDescriptor,
    ) -> Result<Arc<CachedDataset>, DatasetError> {
        let key = descriptor.key();
        let mut attempted = Vec::new();
        let mut last_error = None;

        for granularity in DatasetSource::resolve_granularity(descriptor) {
            let url = self.source.locate(descriptor, granularity);
            log::debug!("dataset {key}: requesting {url}");

            match self.fetcher.fetch(&url).await {
                Ok(Some(content)) => {
                    log::info!(
                        "dataset {key}: downloaded {granularity} transcriptions ({} bytes)",
                        content.len()
                    );
                    return self
                        .build(
                            key,
                            DatasetOrigin::Remote(granularity),
                            SystemTime::now(),
                            content,
                            true,
                        )
                        .await;
                }
                Ok(None) => log::debug!("dataset {key}: {url} not found"),
                Err(e) => {
                    log::debug!("dataset {key}: {url} failed: {e}");
                    last_error = Some(e);
                }
            }
            attempted.push(url);
        }

        Err(match last_error {
            Some(error) => DatasetError::Fetch { key, error },
            None => DatasetError::NotFound { key, attempted },
        })
    }

    async fn read_stored(&self, key: &VarietyKey) -> Option<StoredDataset> {
        let store = Arc::clone(&self.store);
        let k = key.clone();
        match tokio::task::spawn_blocking(move || store.read(&k)).await {
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) => {
                log::warn!("dataset {key}: cached copy unreadable: {e}");
                None
            }
            Err(e) => {
                log::warn!("dataset {key}: cache read task failed: {e}");
                None
            }
        }
    }

    fn is_expired(&self, stored: &StoredDataset) -> bool {
        match (self.max_age, stored.modified.elapsed()) {
            (Some(max_age), Ok(age)) => age >= max_age,
            _ => false,
        }
    }

    /// Index `content` on the blocking pool, writing it to the store first
    /// when `persist` is set.  A failed write is logged; the dataset is still
    /// served from memory.
    async fn build(
        &self,
        key: VarietyKey,
        origin: DatasetOrigin,
        fetched_at: SystemTime,
        content: String,
        persist: bool,
    ) -> Result<Arc<CachedDataset>, DatasetError> {
        let store = Arc::clone(&self.store);
        let join_segments = self.join_segments;
        let k = key.clone();

        let index = tokio::task::spawn_blocking(move || {
            if persist {
                if let Err(e) = store.write(&k, &content) {
                    log::warn!("dataset {k}: could not persist: {e}");
                }
            }
            PronunciationIndex::build_with(&content, join_segments)
        })
        .await
        .map_err(|e| DatasetError::Internal {
            key: key.clone(),
            reason: e.to_string(),
        })?;

        Ok(Arc::new(CachedDataset {
            key,
            origin,
            fetched_at,
            index,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fetch::MockFetcher;
    use tempfile::{tempdir, TempDir};

    const UK: &str = "schedule\tʃɛdjuːl\ntomato\ttəmɑːtəʊ\n";

    fn uk() -> VarietyDescriptor {
        VarietyDescriptor::new("eng", "latn", Granularity::Broad).with_variant("uk")
    }

    fn danish() -> VarietyDescriptor {
        VarietyDescriptor::new("dan", "latn", Granularity::Narrow)
    }

    fn german() -> VarietyDescriptor {
        VarietyDescriptor::new("deu", "latn", Granularity::Broad)
    }

    /// Wait until `fetcher` has been asked for `file_name`.
    async fn wait_for_request(fetcher: &MockFetcher, file_name: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !fetcher.requested().iter().any(|f| f == file_name) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("request never made");
    }

    fn make_cache(fetcher: Arc<MockFetcher>, dir: &TempDir) -> DatasetCache {
        let store = FsStore::open(dir.path()).expect("store");
        DatasetCache::new(
            DatasetSource::new("http://datasets.test/tsv"),
            fetcher,
            Arc::new(store),
        )
    }

    // -----------------------------------------------------------------------
    // Fetch, persist, reuse
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn first_get_downloads_and_persists() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        let cache = make_cache(Arc::clone(&fetcher), &dir);

        let dataset = cache.get(&uk()).await.unwrap();

        assert_eq!(dataset.origin(), DatasetOrigin::Remote(Granularity::Broad));
        assert_eq!(dataset.index().lookup("schedule"), ["ʃɛdjuːl"]);
        assert!(cache.is_persisted(&uk().key()));
        assert_eq!(fetcher.calls(), 1);
    }

    /// The second resolution is a memory hit with identical content.
    #[tokio::test]
    async fn second_get_is_served_from_memory() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        let cache = make_cache(Arc::clone(&fetcher), &dir);

        let first = cache.get(&uk()).await.unwrap();
        let second = cache.get(&uk()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls(), 1);
    }

    /// A new process finds the persisted file and never touches the network.
    #[tokio::test]
    async fn restart_loads_from_disk() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        let first = make_cache(Arc::clone(&fetcher), &dir).get(&uk()).await.unwrap();

        let offline = Arc::new(MockFetcher::failing(FetchError::Timeout));
        let cache = make_cache(Arc::clone(&offline), &dir);
        let reloaded = cache.get(&uk()).await.unwrap();

        assert_eq!(reloaded.origin(), DatasetOrigin::Disk);
        assert_eq!(reloaded.index(), first.index());
        assert_eq!(offline.calls(), 0);
    }

    #[tokio::test]
    async fn join_segments_applies_to_downloads() {
        let dir = tempdir().expect("temp dir");
        let fetcher =
            Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", "cat\tk æ t\n"));
        let cache = make_cache(fetcher, &dir).with_join_segments(true);

        let dataset = cache.get(&uk()).await.unwrap();
        assert_eq!(dataset.index().lookup("cat"), ["kæt"]);
    }

    // -----------------------------------------------------------------------
    // Single flight
    // -----------------------------------------------------------------------

    /// Many concurrent requests for one unresolved key cause one download.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_gets_fetch_once() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_dataset("eng_latn_uk_broad.tsv", UK)
                .with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(make_cache(Arc::clone(&fetcher), &dir));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            tasks.spawn(async move { cache.get(&uk()).await });
        }
        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap().is_ok());
        }

        assert_eq!(fetcher.calls(), 1);
    }

    /// A download stalled on one key leaves other keys free to load.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stalled_key_does_not_block_other_keys() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_dataset("eng_latn_uk_broad.tsv", UK)
                .with_dataset("deu_latn_broad.tsv", "hund\thʊnt\n"),
        );
        let gate = fetcher.gate("eng_latn_uk_broad.tsv");
        let cache = Arc::new(make_cache(Arc::clone(&fetcher), &dir));

        let stalled = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(&uk()).await })
        };
        wait_for_request(&fetcher, "eng_latn_uk_broad.tsv").await;

        let dataset = tokio::time::timeout(Duration::from_secs(5), cache.get(&german()))
            .await
            .expect("deu_latn waited on eng_latn_uk")
            .unwrap();
        assert_eq!(dataset.index().lookup("hund"), ["hʊnt"]);
        assert!(!stalled.is_finished());

        gate.notify_one();
        assert!(stalled.await.unwrap().is_ok());
    }

    // -----------------------------------------------------------------------
    // Granularity fallback and failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn narrow_variety_falls_back_from_broad() {
        let dir = tempdir().expect("temp dir");
        let fetcher =
            Arc::new(MockFetcher::new().with_dataset("dan_latn_narrow.tsv", "hund\thunˀ\n"));
        let cache = make_cache(Arc::clone(&fetcher), &dir);

        let dataset = cache.get(&danish()).await.unwrap();

        assert_eq!(dataset.origin(), DatasetOrigin::Remote(Granularity::Narrow));
        assert_eq!(
            fetcher.requested(),
            vec!["dan_latn_broad.tsv", "dan_latn_narrow.tsv"]
        );
    }

    #[tokio::test]
    async fn all_granularities_missing_is_not_found() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new());
        let cache = make_cache(Arc::clone(&fetcher), &dir);

        let err = cache.get(&danish()).await.unwrap_err();

        match &err {
            DatasetError::NotFound { key, attempted } => {
                assert_eq!(key.as_str(), "dan_latn");
                assert_eq!(attempted.len(), 2);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert_eq!(
            LookupError::from(err),
            LookupError::DatasetUnavailable(VarietyKey::from("dan_latn"))
        );
    }

    /// A failure is remembered until the key is invalidated.
    #[tokio::test]
    async fn failure_is_cached_until_invalidated() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new());
        let cache = make_cache(Arc::clone(&fetcher), &dir);

        assert!(cache.get(&uk()).await.is_err());
        assert!(cache.get(&uk()).await.is_err());
        assert_eq!(fetcher.calls(), 1);

        fetcher.set_dataset("eng_latn_uk_broad.tsv", UK);
        cache.invalidate(&uk().key()).await;

        assert!(cache.get(&uk()).await.is_ok());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn timeout_is_a_fetch_error() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::failing(FetchError::Timeout));
        let cache = make_cache(fetcher, &dir);

        let err = cache.get(&uk()).await.unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Fetch {
                error: FetchError::Timeout,
                ..
            }
        ));
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Refresh swaps in new content; an earlier snapshot is unaffected.
    #[tokio::test]
    async fn refresh_swaps_snapshot() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        let cache = make_cache(Arc::clone(&fetcher), &dir);

        let before = cache.get(&uk()).await.unwrap();
        fetcher.set_dataset("eng_latn_uk_broad.tsv", "schedule\tskɛdʒuːl\n");

        let after = cache.refresh(&uk()).await.unwrap();

        assert_eq!(before.index().lookup("schedule"), ["ʃɛdjuːl"]);
        assert_eq!(after.index().lookup("schedule"), ["skɛdʒuːl"]);
        let current = cache.get(&uk()).await.unwrap();
        assert!(Arc::ptr_eq(&current, &after));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_current_copy() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        let cache = make_cache(Arc::clone(&fetcher), &dir);
        let before = cache.get(&uk()).await.unwrap();

        fetcher.remove_dataset("eng_latn_uk_broad.tsv");
        let err = cache.refresh(&uk()).await.unwrap_err();

        assert!(matches!(err, DatasetError::NotFound { .. }));
        assert!(Arc::ptr_eq(&cache.get(&uk()).await.unwrap(), &before));
    }

    // -----------------------------------------------------------------------
    // Expiry and cleanup
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn expired_copy_is_downloaded_again() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        make_cache(Arc::clone(&fetcher), &dir).get(&uk()).await.unwrap();

        let cache = make_cache(Arc::clone(&fetcher), &dir).with_max_age(Some(Duration::ZERO));
        let dataset = cache.get(&uk()).await.unwrap();

        assert_eq!(dataset.origin(), DatasetOrigin::Remote(Granularity::Broad));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn expired_copy_is_served_when_download_fails() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        make_cache(fetcher, &dir).get(&uk()).await.unwrap();

        let offline = Arc::new(MockFetcher::failing(FetchError::Request("offline".into())));
        let cache = make_cache(Arc::clone(&offline), &dir).with_max_age(Some(Duration::ZERO));
        let dataset = cache.get(&uk()).await.unwrap();

        assert_eq!(dataset.origin(), DatasetOrigin::Disk);
        assert_eq!(dataset.index().lookup("tomato"), ["təmɑːtəʊ"]);
        assert_eq!(offline.calls(), 1);
    }

    #[tokio::test]
    async fn clear_all_empties_memory_and_disk() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        let cache = make_cache(Arc::clone(&fetcher), &dir);
        cache.get(&uk()).await.unwrap();

        let report = cache.clear_all().await.unwrap();

        assert_eq!(report.files_removed, 1);
        assert!(report.bytes_freed > 0);
        assert!(cache.peek(&uk().key()).is_none());
        assert!(!cache.is_persisted(&uk().key()));

        cache.get(&uk()).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    /// A reset issued while a load is running is applied after that load, so
    /// the load's result cannot overwrite it.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn invalidate_waits_for_in_flight_load() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        let gate = fetcher.gate("eng_latn_uk_broad.tsv");
        let cache = Arc::new(make_cache(Arc::clone(&fetcher), &dir));

        let loading = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(&uk()).await })
        };
        wait_for_request(&fetcher, "eng_latn_uk_broad.tsv").await;

        let invalidating = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.invalidate(&uk().key()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!invalidating.is_finished());

        gate.notify_one();
        assert!(loading.await.unwrap().is_ok());
        invalidating.await.unwrap();

        assert!(cache.peek(&uk().key()).is_none());
    }

    /// `clear_all` lets a running load finish and then wipes its result; no
    /// second download of the key starts in between.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn clear_all_waits_for_in_flight_load() {
        let dir = tempdir().expect("temp dir");
        let fetcher = Arc::new(MockFetcher::new().with_dataset("eng_latn_uk_broad.tsv", UK));
        let gate = fetcher.gate("eng_latn_uk_broad.tsv");
        let cache = Arc::new(make_cache(Arc::clone(&fetcher), &dir));

        let loading = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(&uk()).await })
        };
        wait_for_request(&fetcher, "eng_latn_uk_broad.tsv").await;

        let clearing = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.clear_all().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!clearing.is_finished());

        gate.notify_one();
        assert!(loading.await.unwrap().is_ok());
        let report = clearing.await.unwrap().unwrap();

        assert_eq!(report.files_removed, 1);
        assert!(cache.peek(&uk().key()).is_none());
        assert!(!cache.is_persisted(&uk().key()));
        assert_eq!(fetcher.calls(), 1);
    }
}
