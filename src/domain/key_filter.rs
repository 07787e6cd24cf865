//! Probabilistic membership filter over every issued short key.
//!
//! The filter answers "definitely never issued" or "maybe issued" without a
//! store round trip. A negative answer is authoritative; a positive answer has
//! to be confirmed against the [`LinkRepository`].
//!
//! # Lifecycle
//!
//! 1. [`KeyFilter::initialize`] loads the last snapshot from the
//!    [`SnapshotStore`], or rebuilds from the link store when the snapshot is
//!    absent, corrupt or unreachable.
//! 2. [`KeyFilter::might_contain`] and [`KeyFilter::add`] initialize lazily,
//!    so a filter that was never explicitly initialized still works.
//! 3. [`KeyFilter::persist`] writes the current state back after each add.
//!
//! Concurrent initialization is collapsed into a single load: the first
//! caller does the work and every other caller awaits the same result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bloomfilter::Bloom;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::snapshot::SnapshotStore;
use crate::utils::deadline::bounded;

/// Snapshot name shared by every replica.
pub const DEFAULT_SNAPSHOT_NAME: &str = "api:bloomFilter:shortenKeys";

const REBUILD_PAGE_SIZE: i64 = 10_000;
const REBUILD_PAGE_RETRIES: usize = 3;

/// Sizing and storage parameters of the filter.
#[derive(Debug, Clone)]
pub struct FilterSettings {
    /// Expected number of keys.
    pub capacity: usize,
    /// Target false positive rate at `capacity`.
    pub error_rate: f64,
    pub snapshot_name: String,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            capacity: 10_000_000,
            error_rate: 0.01,
            snapshot_name: DEFAULT_SNAPSHOT_NAME.to_string(),
        }
    }
}

/// Diagnostic view of the filter.
#[derive(Debug, Clone, Serialize)]
pub struct FilterStats {
    pub ready: bool,
    pub capacity: usize,
    pub error_rate: f64,
    pub number_of_bits: u64,
    pub number_of_hash_functions: u32,
    /// Keys added through this instance since it started.
    pub added_since_start: u64,
}

pub struct KeyFilter {
    links: Arc<dyn LinkRepository>,
    snapshots: Arc<dyn SnapshotStore>,
    settings: FilterSettings,
    op_timeout: Duration,
    bloom: OnceCell<RwLock<Bloom<str>>>,
    /// Some while a rebuild is in flight; captures keys added meanwhile.
    rebuild_buffer: Mutex<Option<Vec<String>>>,
    added: AtomicU64,
}

impl KeyFilter {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        snapshots: Arc<dyn SnapshotStore>,
        settings: FilterSettings,
        op_timeout: Duration,
    ) -> Self {
        Self {
            links,
            snapshots,
            settings,
            op_timeout,
            bloom: OnceCell::new(),
            rebuild_buffer: Mutex::new(None),
            added: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Returns true once the filter has been loaded or rebuilt.
    pub fn is_ready(&self) -> bool {
        self.bloom.initialized()
    }

    /// Loads the filter from its snapshot, falling back to a rebuild.
    ///
    /// Idempotent. Concurrent callers share one load.
    pub async fn initialize(&self) -> Result<(), AppError> {
        self.ready().await.map(|_| ())
    }

    /// Returns false only for keys that were never added.
    pub async fn might_contain(&self, key: &str) -> Result<bool, AppError> {
        let bloom = self.ready().await?;
        Ok(bloom.read().check(key))
    }

    /// Records `key` as issued. Adding the same key twice is harmless.
    pub async fn add(&self, key: &str) -> Result<(), AppError> {
        let bloom = self.ready().await?;

        // Lock order: buffer, then filter (same as `swap_in`).
        let mut buffer = self.rebuild_buffer.lock();
        bloom.write().set(key);
        if let Some(pending) = buffer.as_mut() {
            pending.push(key.to_string());
        }
        drop(buffer);

        self.added.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes the current filter state to the snapshot store.
    pub async fn persist(&self) -> Result<(), AppError> {
        let Some(bloom) = self.bloom.get() else {
            debug!("Filter not initialized, nothing to persist");
            return Ok(());
        };

        let bytes = bloom.read().to_bytes();
        self.save_snapshot(&bytes).await
    }

    /// Discards the snapshot and rebuilds the filter from the link store.
    ///
    /// Readers keep seeing the previous complete filter until the rebuilt one
    /// is swapped in. Returns the number of keys loaded.
    pub async fn reset(&self) -> Result<usize, AppError> {
        bounded(
            self.op_timeout,
            "snapshot delete",
            self.snapshots.delete(&self.settings.snapshot_name),
        )
        .await?;

        *self.rebuild_buffer.lock() = Some(Vec::new());
        let rebuilt = self.build_from_store().await;

        let (fresh, loaded) = match rebuilt {
            Ok(result) => result,
            Err(e) => {
                *self.rebuild_buffer.lock() = None;
                return Err(e);
            }
        };

        let bytes = self.swap_in(fresh);
        info!("✓ Key filter rebuilt from {} stored keys", loaded);

        self.save_snapshot(&bytes).await?;
        Ok(loaded)
    }

    pub fn stats(&self) -> FilterStats {
        let (number_of_bits, number_of_hash_functions) = match self.bloom.get() {
            Some(bloom) => {
                let bloom = bloom.read();
                (bloom.len(), bloom.number_of_hash_functions())
            }
            None => (0, 0),
        };

        FilterStats {
            ready: self.is_ready(),
            capacity: self.settings.capacity,
            error_rate: self.settings.error_rate,
            number_of_bits,
            number_of_hash_functions,
            added_since_start: self.added.load(Ordering::Relaxed),
        }
    }

    async fn ready(&self) -> Result<&RwLock<Bloom<str>>, AppError> {
        self.bloom
            .get_or_try_init(|| async { self.load_or_rebuild().await.map(RwLock::new) })
            .await
    }

    async fn load_or_rebuild(&self) -> Result<Bloom<str>, AppError> {
        let name = &self.settings.snapshot_name;

        match bounded(self.op_timeout, "snapshot load", self.snapshots.load(name)).await {
            Ok(Some(bytes)) => match Bloom::from_slice(&bytes) {
                Ok(bloom) => {
                    info!("✓ Key filter loaded from snapshot {} ({} bytes)", name, bytes.len());
                    return Ok(bloom);
                }
                Err(e) => warn!("Snapshot {} is corrupt ({}), rebuilding", name, e),
            },
            Ok(None) => info!("No snapshot under {}, rebuilding key filter", name),
            Err(e) => warn!("Snapshot store unavailable ({}), rebuilding key filter", e),
        }

        let (bloom, loaded) = self.build_from_store().await?;
        info!("✓ Key filter rebuilt from {} stored keys", loaded);

        if let Err(e) = self.save_snapshot(&bloom.to_bytes()).await {
            warn!("Failed to persist rebuilt key filter: {}", e);
        }

        Ok(bloom)
    }

    /// Streams every stored key into a new filter.
    async fn build_from_store(&self) -> Result<(Bloom<str>, usize), AppError> {
        let stored = bounded(self.op_timeout, "link count", self.links.count()).await?;
        let capacity = self
            .settings
            .capacity
            .max(usize::try_from(stored).unwrap_or(0));

        let mut bloom = Bloom::new_for_fp_rate(capacity, self.settings.error_rate).map_err(|e| {
            AppError::internal(
                "Failed to create key filter",
                json!({ "reason": format!("{e}"), "capacity": capacity }),
            )
        })?;

        let mut cursor: Option<String> = None;
        let mut loaded = 0usize;

        loop {
            let page = self.fetch_page(cursor.clone()).await?;
            let Some(last) = page.last().cloned() else {
                break;
            };

            for key in &page {
                bloom.set(key.as_str());
            }
            loaded += page.len();
            debug!("Loaded {} keys into key filter", loaded);

            if (page.len() as i64) < REBUILD_PAGE_SIZE {
                break;
            }
            cursor = Some(last);
        }

        Ok((bloom, loaded))
    }

    async fn fetch_page(&self, cursor: Option<String>) -> Result<Vec<String>, AppError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(25)
            .max_delay(Duration::from_secs(1))
            .map(jitter)
            .take(REBUILD_PAGE_RETRIES);

        Retry::spawn(strategy, || {
            let cursor = cursor.clone();
            async move {
                bounded(
                    self.op_timeout,
                    "link key scan",
                    self.links.keys_after(cursor, REBUILD_PAGE_SIZE),
                )
                .await
            }
        })
        .await
    }

    /// Replaces the live filter with `fresh` plus any keys added during the rebuild.
    fn swap_in(&self, mut fresh: Bloom<str>) -> Vec<u8> {
        let mut buffer = self.rebuild_buffer.lock();
        if let Some(pending) = buffer.take() {
            for key in &pending {
                fresh.set(key.as_str());
            }
            if !pending.is_empty() {
                debug!("Replayed {} keys added during rebuild", pending.len());
            }
        }

        let bytes = fresh.to_bytes();
        match self.bloom.get() {
            Some(live) => *live.write() = fresh,
            None => {
                // Never initialized: the rebuilt filter becomes the first one.
                if let Err(e) = self.bloom.set(RwLock::new(fresh)) {
                    debug!("Filter initialized concurrently during rebuild: {}", e);
                }
            }
        }

        bytes
    }

    async fn save_snapshot(&self, bytes: &[u8]) -> Result<(), AppError> {
        bounded(
            self.op_timeout,
            "snapshot save",
            self.snapshots.save(&self.settings.snapshot_name, bytes),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NewLink;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::persistence::MemoryLinkRepository;
    use crate::infrastructure::snapshot::{
        MemorySnapshotStore, MockSnapshotStore, SnapshotError,
    };

    fn small_settings() -> FilterSettings {
        FilterSettings {
            capacity: 1_000,
            error_rate: 0.01,
            snapshot_name: "test:filter".to_string(),
        }
    }

    fn filter_with(
        links: Arc<dyn LinkRepository>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> KeyFilter {
        KeyFilter::new(links, snapshots, small_settings(), Duration::from_secs(1))
    }

    async fn seed(repo: &MemoryLinkRepository, keys: &[&str]) {
        for key in keys {
            repo.insert(NewLink {
                shorten_key: key.to_string(),
                original_url: format!("https://example.com/{key}"),
                owner_id: None,
            })
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_added_keys_are_never_reported_absent() {
        let filter = filter_with(
            Arc::new(MemoryLinkRepository::new()),
            Arc::new(MemorySnapshotStore::new()),
        );

        for n in 0..200u64 {
            let key = crate::utils::base62::encode(n);
            filter.add(&key).await.unwrap();
            filter.add(&key).await.unwrap();
        }

        for n in 0..200u64 {
            let key = crate::utils::base62::encode(n);
            assert!(filter.might_contain(&key).await.unwrap(), "lost {key}");
        }
    }

    #[tokio::test]
    async fn test_lazy_initialization_on_first_use() {
        let filter = filter_with(
            Arc::new(MemoryLinkRepository::new()),
            Arc::new(MemorySnapshotStore::new()),
        );

        assert!(!filter.is_ready());
        assert!(!filter.might_contain("abc").await.unwrap());
        assert!(filter.is_ready());
    }

    #[tokio::test]
    async fn test_initialize_rebuilds_from_store_and_persists() {
        let repo = Arc::new(MemoryLinkRepository::new());
        seed(&repo, &["1", "2", "3"]).await;
        let snapshots = Arc::new(MemorySnapshotStore::new());

        let filter = filter_with(repo, snapshots.clone());
        filter.initialize().await.unwrap();

        for key in ["1", "2", "3"] {
            assert!(filter.might_contain(key).await.unwrap());
        }
        assert!(snapshots.contains("test:filter"));
    }

    #[tokio::test]
    async fn test_initialize_loads_existing_snapshot() {
        let snapshots = Arc::new(MemorySnapshotStore::new());

        let first = filter_with(Arc::new(MemoryLinkRepository::new()), snapshots.clone());
        first.add("persisted").await.unwrap();
        first.persist().await.unwrap();

        // The store is empty, so the key can only come from the snapshot.
        let second = filter_with(Arc::new(MemoryLinkRepository::new()), snapshots);
        second.initialize().await.unwrap();

        assert!(second.might_contain("persisted").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_triggers_rebuild() {
        let repo = Arc::new(MemoryLinkRepository::new());
        seed(&repo, &["a1"]).await;
        let snapshots = Arc::new(MemorySnapshotStore::new());
        snapshots.save("test:filter", b"garbage").await.unwrap();

        let filter = filter_with(repo, snapshots);
        filter.initialize().await.unwrap();

        assert!(filter.might_contain("a1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_snapshot_store_triggers_rebuild() {
        let repo = Arc::new(MemoryLinkRepository::new());
        seed(&repo, &["zz"]).await;

        let mut snapshots = MockSnapshotStore::new();
        snapshots
            .expect_load()
            .returning(|_| Err(SnapshotError::ConnectionError("refused".into())));
        snapshots
            .expect_save()
            .returning(|_, _| Err(SnapshotError::ConnectionError("refused".into())));

        let filter = filter_with(repo, Arc::new(snapshots));
        filter.initialize().await.unwrap();

        assert!(filter.is_ready());
        assert!(filter.might_contain("zz").await.unwrap());
    }

    #[tokio::test]
    async fn test_rebuild_pages_until_short_page() {
        let mut links = MockLinkRepository::new();
        links.expect_count().times(1).returning(|| Ok(2));
        links
            .expect_keys_after()
            .withf(|cursor, _| cursor.is_none())
            .times(1)
            .returning(|_, _| Ok(vec!["k1".to_string(), "k2".to_string()]));

        let filter = filter_with(Arc::new(links), Arc::new(MemorySnapshotStore::new()));
        filter.initialize().await.unwrap();

        assert!(filter.might_contain("k1").await.unwrap());
        assert!(filter.might_contain("k2").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_initialize_rebuilds_once() {
        let mut links = MockLinkRepository::new();
        links.expect_count().times(1).returning(|| Ok(1));
        links
            .expect_keys_after()
            .times(1)
            .returning(|_, _| Ok(vec!["only".to_string()]));

        let filter = Arc::new(filter_with(
            Arc::new(links),
            Arc::new(MemorySnapshotStore::new()),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let filter = filter.clone();
                tokio::spawn(async move { filter.initialize().await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(filter.might_contain("only").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_rebuild_leaves_filter_uninitialized() {
        let mut links = MockLinkRepository::new();
        links
            .expect_count()
            .returning(|| Err(AppError::unavailable("db down", json!({}))));

        let filter = filter_with(Arc::new(links), Arc::new(MemorySnapshotStore::new()));

        assert!(filter.initialize().await.is_err());
        assert!(!filter.is_ready());
    }

    #[tokio::test]
    async fn test_reset_replaces_contents_with_store_keys() {
        let repo = Arc::new(MemoryLinkRepository::new());
        seed(&repo, &["kept"]).await;
        let snapshots = Arc::new(MemorySnapshotStore::new());

        let filter = filter_with(repo, snapshots.clone());
        filter.initialize().await.unwrap();

        let loaded = filter.reset().await.unwrap();

        assert_eq!(loaded, 1);
        assert!(filter.might_contain("kept").await.unwrap());
        assert!(snapshots.contains("test:filter"));
    }

    #[tokio::test]
    async fn test_stats_reflect_lifecycle() {
        let filter = filter_with(
            Arc::new(MemoryLinkRepository::new()),
            Arc::new(MemorySnapshotStore::new()),
        );

        let before = filter.stats();
        assert!(!before.ready);
        assert_eq!(before.number_of_bits, 0);

        filter.add("x").await.unwrap();
        let after = filter.stats();

        assert!(after.ready);
        assert!(after.number_of_bits > 0);
        assert!(after.number_of_hash_functions > 0);
        assert_eq!(after.added_since_start, 1);
    }
}
