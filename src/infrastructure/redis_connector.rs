//! Shared, lazily established Redis connection.
//!
//! All Redis-backed components (cache, counters, filter snapshots) share one
//! [`RedisConnector`]. The first caller establishes the connection while
//! concurrent callers await the same attempt, so a cold start produces a
//! single connection handshake instead of one per request.

use std::time::Duration;

use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tokio::sync::OnceCell;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{info, warn};

/// Errors raised while establishing the Redis connection.
#[derive(Debug, thiserror::Error)]
pub enum RedisConnectError {
    #[error("invalid Redis URL: {0}")]
    InvalidUrl(String),
    #[error("failed to connect to Redis after {attempts} attempts: {reason}")]
    Exhausted { attempts: usize, reason: String },
}

/// Lazily connects to Redis with exponential backoff.
pub struct RedisConnector {
    client: Client,
    max_retries: usize,
    connect_timeout: Duration,
    manager: OnceCell<ConnectionManager>,
}

impl RedisConnector {
    /// Creates a connector without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`RedisConnectError::InvalidUrl`] if the URL cannot be parsed.
    pub fn new(
        redis_url: &str,
        max_retries: usize,
        connect_timeout: Duration,
    ) -> Result<Self, RedisConnectError> {
        let client =
            Client::open(redis_url).map_err(|e| RedisConnectError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client,
            max_retries,
            connect_timeout,
            manager: OnceCell::new(),
        })
    }

    /// Returns a handle to the shared connection, establishing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RedisConnectError::Exhausted`] once every retry has failed.
    /// A later call starts a fresh round of attempts.
    pub async fn connection(&self) -> Result<ConnectionManager, RedisConnectError> {
        self.manager
            .get_or_try_init(|| self.establish())
            .await
            .cloned()
    }

    /// Returns true once a connection has been established.
    pub fn is_connected(&self) -> bool {
        self.manager.initialized()
    }

    async fn establish(&self) -> Result<ConnectionManager, RedisConnectError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(50)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.max_retries);

        let mut attempts = 0usize;
        Retry::spawn(strategy, || {
            attempts += 1;
            let attempt = attempts;
            async move {
                self.connect_once().await.inspect_err(|reason| {
                    warn!("Redis connection attempt {} failed: {}", attempt, reason);
                })
            }
        })
        .await
        .map_err(|reason| RedisConnectError::Exhausted {
            attempts: self.max_retries + 1,
            reason,
        })
    }

    async fn connect_once(&self) -> Result<ConnectionManager, String> {
        let connect = async {
            let manager = ConnectionManager::new(self.client.clone())
                .await
                .map_err(|e| format!("Failed to connect to Redis: {}", e))?;

            let mut conn = manager.clone();
            conn
                .ping::<()>()
                .await
                .map_err(|e| format!("Redis PING failed: {}", e))?;

            Ok::<_, String>(manager)
        };

        let manager = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| format!("timed out after {:?}", self.connect_timeout))??;

        info!("✓ Connected to Redis");
        Ok(manager)
    }
}
