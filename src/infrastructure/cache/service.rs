//! Cache service trait, cached value shape and error types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::domain::entities::Resolution;
use crate::error::AppError;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::unavailable("Cache unavailable", json!({ "reason": e.to_string() }))
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// The value cached for a short key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
///
/// Entries written by earlier deployments use camelCase field names
/// (`originalUrl`, `userId`); both spellings decode.
pub struct CachedLink {
    #[serde(alias = "originalUrl")]
    pub original_url: String,
    #[serde(alias = "userId", alias = "ownerId")]
    pub owner_id: Option<i64>,
}

/// Shapes a cached payload may take.
///
/// Older deployments cached the bare target URL; newer ones cache a JSON object.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Structured(CachedLink),
    Bare(String),
}

impl CachedLink {
    pub fn new(original_url: impl Into<String>, owner_id: Option<i64>) -> Self {
        Self {
            original_url: original_url.into(),
            owner_id,
        }
    }

    /// Serializes into the structured payload format.
    pub fn encode(&self) -> String {
        json!({ "original_url": self.original_url, "owner_id": self.owner_id }).to_string()
    }

    /// Decodes a cached payload, accepting both the structured and the legacy shape.
    ///
    /// Anything that is not a structured object is taken verbatim as the target
    /// URL of an anonymous link. Never fails.
    pub fn decode(payload: &str) -> Self {
        match serde_json::from_str::<StoredValue>(payload) {
            Ok(StoredValue::Structured(link)) => link,
            Ok(StoredValue::Bare(url)) => Self::new(url, None),
            Err(_) => Self::new(payload, None),
        }
    }
}

impl From<CachedLink> for Resolution {
    fn from(cached: CachedLink) -> Self {
        Self {
            original_url: cached.original_url,
            owner_id: cached.owner_id,
        }
    }
}

/// Read-through cache for short key resolution.
///
/// Entries expire after their TTL. The TTL is renewed by every write and never
/// by reads. The cache is never authoritative: a miss only means the store
/// has to be consulted.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Retrieves the cached resolution of a short key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(link))` on cache hit
    /// - `Ok(None)` on cache miss
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be reached; callers fall
    /// back to the persisted store.
    async fn get_link(&self, shorten_key: &str) -> CacheResult<Option<CachedLink>>;

    /// Stores a resolution, replacing any previous entry and resetting its TTL.
    ///
    /// `ttl = None` uses the implementation's default TTL.
    async fn set_link(
        &self,
        shorten_key: &str,
        link: &CachedLink,
        ttl: Option<Duration>,
    ) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
