//! Link registration and resolution service.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::application::services::KeyIssuer;
use crate::domain::entities::{Link, NewLink, Resolution, ShortenOutcome};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, CachedLink};
use crate::utils::deadline::bounded;

/// Service for registering and resolving short links.
///
/// Resolution is cache-aside: the cache is consulted first and the store is
/// only read on a miss, after which the cache is repopulated. Registration
/// writes through to the cache so a fresh key resolves without a store read.
pub struct LinkService {
    links: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
    issuer: Arc<KeyIssuer>,
    op_timeout: Duration,
}

impl LinkService {
    /// Creates a new link service.
    pub fn new(
        links: Arc<dyn LinkRepository>,
        cache: Arc<dyn CacheService>,
        issuer: Arc<KeyIssuer>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            links,
            cache,
            issuer,
            op_timeout,
        }
    }

    /// Registers `original_url` for `owner_id`, or returns the existing link.
    ///
    /// # Deduplication
    ///
    /// A link already registered for the same `(original_url, owner_id)` pair
    /// is returned with `created = false` and no key is issued. Anonymous links
    /// only match anonymous links.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] if a dependency is unreachable.
    /// Returns [`AppError::KeyGenerationExhausted`] if no free key was found.
    /// Returns [`AppError::Conflict`] if the issued key was stored concurrently.
    pub async fn shorten(
        &self,
        original_url: String,
        owner_id: Option<i64>,
    ) -> Result<ShortenOutcome, AppError> {
        if let Some(existing) = bounded(
            self.op_timeout,
            "link dedup lookup",
            self.links.find_by_url_and_owner(&original_url, owner_id),
        )
        .await?
        {
            debug!("Reusing key {} for {}", existing.shorten_key, original_url);
            return Ok(ShortenOutcome {
                link: existing,
                created: false,
            });
        }

        let shorten_key = self.issuer.issue().await?;

        let link = bounded(
            self.op_timeout,
            "link insert",
            self.links.insert(NewLink {
                shorten_key,
                original_url,
                owner_id,
            }),
        )
        .await?;

        self.populate_cache(&link.shorten_key, Resolution::from(&link))
            .await;

        Ok(ShortenOutcome {
            link,
            created: true,
        })
    }

    /// Resolves a short key to its target.
    ///
    /// A cache hit never touches the store. A cache failure is treated as a
    /// miss.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the key was never registered; nothing
    /// is written in that case.
    /// Returns [`AppError::Unavailable`] if the store cannot be reached.
    pub async fn resolve(&self, shorten_key: &str) -> Result<Resolution, AppError> {
        match bounded(self.op_timeout, "cache read", self.cache.get_link(shorten_key)).await {
            Ok(Some(cached)) => {
                debug!("Cache hit for {}", shorten_key);
                return Ok(cached.into());
            }
            Ok(None) => debug!("Cache miss for {}", shorten_key),
            Err(e) => warn!("Cache read failed for {}, using store: {}", shorten_key, e),
        }

        let link = bounded(
            self.op_timeout,
            "link lookup",
            self.links.find_by_key(shorten_key),
        )
        .await?
        .ok_or_else(|| {
            AppError::not_found("Short link not found", json!({ "shorten_key": shorten_key }))
        })?;

        let resolution = Resolution::from(&link);
        self.populate_cache(shorten_key, resolution.clone()).await;

        Ok(resolution)
    }

    /// Lists every link registered by `owner_id`, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError> {
        bounded(
            self.op_timeout,
            "link listing",
            self.links.list_by_owner(owner_id),
        )
        .await
    }

    async fn populate_cache(&self, shorten_key: &str, resolution: Resolution) {
        let cached = CachedLink::new(resolution.original_url, resolution.owner_id);

        if let Err(e) = bounded(
            self.op_timeout,
            "cache write",
            self.cache.set_link(shorten_key, &cached, None),
        )
        .await
        {
            warn!("Failed to cache {}: {}", shorten_key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::RedirectKind;
    use crate::domain::key_filter::{FilterSettings, KeyFilter};
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::{CacheError, MemoryCache, MockCacheService};
    use crate::infrastructure::counter::MemoryCounterStore;
    use crate::infrastructure::persistence::MemoryLinkRepository;
    use crate::infrastructure::snapshot::MemorySnapshotStore;
    use chrono::Utc;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn issuer(links: Arc<dyn LinkRepository>) -> Arc<KeyIssuer> {
        let settings = FilterSettings {
            capacity: 1_000,
            error_rate: 0.01,
            snapshot_name: "test:filter".to_string(),
        };
        let filter = Arc::new(KeyFilter::new(
            links.clone(),
            Arc::new(MemorySnapshotStore::new()),
            settings,
            TIMEOUT,
        ));

        Arc::new(KeyIssuer::new(
            Arc::new(MemoryCounterStore::new()),
            filter,
            links,
            10,
            TIMEOUT,
        ))
    }

    fn service(links: Arc<dyn LinkRepository>, cache: Arc<dyn CacheService>) -> LinkService {
        LinkService::new(links.clone(), cache, issuer(links), TIMEOUT)
    }

    fn create_test_link(id: i64, key: &str, url: &str, owner_id: Option<i64>) -> Link {
        Link::new(
            id,
            key.to_string(),
            url.to_string(),
            owner_id,
            0,
            Utc::now(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_shorten_first_anonymous_link_gets_key_one() {
        let links = Arc::new(MemoryLinkRepository::new());
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        let service = service(links, cache.clone());

        let outcome = service
            .shorten("https://example.com/long-url".to_string(), None)
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.link.shorten_key, "1");
        assert_eq!(
            cache.get_link("1").await.unwrap(),
            Some(CachedLink::new("https://example.com/long-url", None))
        );
    }

    #[tokio::test]
    async fn test_shorten_deduplicates_same_url_and_owner() {
        let links = Arc::new(MemoryLinkRepository::new());
        let service = service(links.clone(), Arc::new(MemoryCache::new(TIMEOUT)));

        let first = service
            .shorten("https://example.com".to_string(), Some(7))
            .await
            .unwrap();
        let second = service
            .shorten("https://example.com".to_string(), Some(7))
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.link.shorten_key, second.link.shorten_key);
        assert_eq!(links.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_shorten_different_owner_gets_new_key() {
        let links = Arc::new(MemoryLinkRepository::new());
        let service = service(links, Arc::new(MemoryCache::new(TIMEOUT)));

        let anonymous = service
            .shorten("https://example.com".to_string(), None)
            .await
            .unwrap();
        let owned = service
            .shorten("https://example.com".to_string(), Some(1))
            .await
            .unwrap();

        assert!(owned.created);
        assert_ne!(anonymous.link.shorten_key, owned.link.shorten_key);
    }

    #[tokio::test]
    async fn test_shorten_dedup_issues_no_key() {
        let mut mock_links = MockLinkRepository::new();
        let existing = create_test_link(5, "existing", "https://example.com", None);
        mock_links
            .expect_find_by_url_and_owner()
            .withf(|url, owner| url == "https://example.com" && owner.is_none())
            .times(1)
            .returning(move |_, _| Ok(Some(existing.clone())));
        mock_links.expect_insert().times(0);

        let mut mock_cache = MockCacheService::new();
        mock_cache.expect_set_link().times(0);

        let service = service(Arc::new(mock_links), Arc::new(mock_cache));
        let outcome = service
            .shorten("https://example.com".to_string(), None)
            .await
            .unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.link.shorten_key, "existing");
    }

    #[tokio::test]
    async fn test_shorten_survives_cache_write_failure() {
        let links = Arc::new(MemoryLinkRepository::new());
        let mut mock_cache = MockCacheService::new();
        mock_cache
            .expect_set_link()
            .times(1)
            .returning(|_, _, _| Err(CacheError::ConnectionError("refused".into())));

        let service = service(links.clone(), Arc::new(mock_cache));
        let outcome = service
            .shorten("https://example.com".to_string(), None)
            .await
            .unwrap();

        assert!(outcome.created);
        assert!(links.find_by_key(&outcome.link.shorten_key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resolve_cache_hit_never_reads_store() {
        let mut mock_links = MockLinkRepository::new();
        mock_links.expect_find_by_key().times(0);

        let mut mock_cache = MockCacheService::new();
        mock_cache
            .expect_get_link()
            .withf(|key| key == "abc")
            .times(1)
            .returning(|_| Ok(Some(CachedLink::new("https://example.com", Some(3)))));

        let service = service(Arc::new(mock_links), Arc::new(mock_cache));
        let resolution = service.resolve("abc").await.unwrap();

        assert_eq!(resolution.original_url, "https://example.com");
        assert_eq!(resolution.redirect_kind(), RedirectKind::Temporary);
    }

    #[tokio::test]
    async fn test_resolve_miss_repopulates_cache() {
        let mut mock_links = MockLinkRepository::new();
        let stored = create_test_link(1, "1", "https://example.com/long-url", None);
        mock_links
            .expect_find_by_key()
            .times(1)
            .returning(move |_| Ok(Some(stored.clone())));

        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        let service = service(Arc::new(mock_links), cache.clone());

        let first = service.resolve("1").await.unwrap();
        // Second resolution is served by the cache (find_by_key expects one call).
        let second = service.resolve("1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.redirect_kind(), RedirectKind::Permanent);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_unknown_key_mutates_nothing() {
        let links = Arc::new(MemoryLinkRepository::new());
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        let service = service(links.clone(), cache.clone());

        let result = service.resolve("nope").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
        assert!(cache.is_empty());
        assert_eq!(links.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resolve_cache_failure_falls_back_to_store() {
        let links = Arc::new(MemoryLinkRepository::new());
        links
            .insert(NewLink {
                shorten_key: "k".to_string(),
                original_url: "https://example.com".to_string(),
                owner_id: None,
            })
            .await
            .unwrap();

        let mut mock_cache = MockCacheService::new();
        mock_cache
            .expect_get_link()
            .returning(|_| Err(CacheError::ConnectionError("refused".into())));
        mock_cache
            .expect_set_link()
            .returning(|_, _, _| Err(CacheError::ConnectionError("refused".into())));

        let service = service(links, Arc::new(mock_cache));
        let resolution = service.resolve("k").await.unwrap();

        assert_eq!(resolution.original_url, "https://example.com");
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let links = Arc::new(MemoryLinkRepository::new());
        let service = service(links, Arc::new(MemoryCache::new(TIMEOUT)));

        service
            .shorten("https://a.com".to_string(), Some(1))
            .await
            .unwrap();
        service
            .shorten("https://b.com".to_string(), Some(2))
            .await
            .unwrap();

        let listed = service.list_by_owner(1).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].original_url, "https://a.com");
    }
}
