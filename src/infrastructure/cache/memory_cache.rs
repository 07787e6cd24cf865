//! In-process cache with TTL support.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::service::{CacheResult, CacheService, CachedLink};

/// Longest lifetime an entry can get; larger TTLs are clamped.
const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Every this many writes, expired entries are swept.
const SWEEP_EVERY: u64 = 1024;

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// A cache held in process memory.
///
/// Stores the same encoded payloads as [`super::RedisCache`], so legacy bare
/// URL entries can be seeded with [`MemoryCache::insert_raw`]. Expired entries
/// are dropped on read and swept periodically on write.
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    default_ttl: Duration,
    writes: AtomicU64,
}

impl MemoryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            writes: AtomicU64::new(0),
        }
    }

    /// Stores a raw payload as-is.
    pub fn insert_raw(&self, shorten_key: &str, payload: &str, ttl: Duration) {
        self.entries.insert(
            shorten_key.to_string(),
            Entry {
                payload: payload.to_string(),
                expires_at: Instant::now() + ttl.min(MAX_TTL),
            },
        );

        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            let removed = self.purge_expired();
            if removed > 0 {
                debug!("Cache sweep removed {} expired entries", removed);
            }
        }
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Returns the remaining lifetime of an entry, if it is still live.
    pub fn remaining_ttl(&self, shorten_key: &str) -> Option<Duration> {
        self.entries
            .get(shorten_key)
            .and_then(|e| e.expires_at.checked_duration_since(Instant::now()))
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get_link(&self, shorten_key: &str) -> CacheResult<Option<CachedLink>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(shorten_key)
            .map(|e| (e.expires_at > now).then(|| CachedLink::decode(&e.payload)));

        match hit {
            Some(Some(link)) => Ok(Some(link)),
            Some(None) => {
                debug!("Cache EXPIRED: {}", shorten_key);
                self.entries
                    .remove_if(shorten_key, |_, e| e.expires_at <= Instant::now());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_link(
        &self,
        shorten_key: &str,
        link: &CachedLink,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.insert_raw(shorten_key, &link.encode(), ttl.unwrap_or(self.default_ttl));
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
