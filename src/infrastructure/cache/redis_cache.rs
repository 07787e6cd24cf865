//! Redis-backed cache implementation.

use std::sync::Arc;
use std::time::Duration;

use super::service::{CacheError, CacheResult, CacheService, CachedLink};
use crate::infrastructure::redis_connector::RedisConnector;
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, error, warn};

/// Redis cache implementation for fast key resolution.
///
/// Shares its connection with the other Redis-backed components through
/// [`RedisConnector`]. Values are written with `SET .. EX`, so every write
/// renews the TTL and reads leave it untouched.
pub struct RedisCache {
    connector: Arc<RedisConnector>,
    default_ttl: Duration,
    key_prefix: String,
}

impl RedisCache {
    /// Creates a cache over a shared connector.
    ///
    /// `default_ttl` applies when [`CacheService::set_link`] is called with
    /// `ttl = None`; controlled via `CACHE_TTL_SECONDS`.
    pub fn new(connector: Arc<RedisConnector>, default_ttl: Duration) -> Self {
        Self {
            connector,
            default_ttl,
            key_prefix: "link:".to_string(),
        }
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, shorten_key: &str) -> String {
        format!("{}{}", self.key_prefix, shorten_key)
    }

    async fn conn(&self) -> CacheResult<redis::aio::ConnectionManager> {
        self.connector
            .connection()
            .await
            .map_err(|e| CacheError::ConnectionError(e.to_string()))
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_link(&self, shorten_key: &str) -> CacheResult<Option<CachedLink>> {
        let key = self.build_key(shorten_key);
        let mut conn = self.conn().await?;

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(payload)) => {
                debug!("Cache HIT: {}", shorten_key);
                Ok(Some(CachedLink::decode(&payload)))
            }
            Ok(None) => {
                debug!("Cache MISS: {}", shorten_key);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", shorten_key, e);
                Err(CacheError::OperationError(e.to_string()))
            }
        }
    }

    async fn set_link(
        &self,
        shorten_key: &str,
        link: &CachedLink,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let key = self.build_key(shorten_key);
        let mut conn = self.conn().await?;
        let ttl_seconds = ttl.unwrap_or(self.default_ttl).as_secs().max(1);

        match conn
            .set_ex::<_, _, ()>(&key, link.encode(), ttl_seconds)
            .await
        {
            Ok(_) => {
                debug!(
                    "Cache SET: {} -> {} (TTL: {}s)",
                    shorten_key, link.original_url, ttl_seconds
                );
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", shorten_key, e);
                Err(CacheError::OperationError(e.to_string()))
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self.conn().await {
            Ok(mut conn) => conn.ping::<()>().await.is_ok(),
            Err(_) => false,
        }
    }
}
