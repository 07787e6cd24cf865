//! Redis-backed counter store.

use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{error, trace};

use super::service::{CounterError, CounterResult, CounterStore};
use crate::infrastructure::redis_connector::RedisConnector;

/// Counters stored as Redis integers and advanced with `INCR`.
///
/// `INCR` is atomic on the server, so every replica sharing the Redis instance
/// draws from the same sequence.
pub struct RedisCounterStore {
    connector: Arc<RedisConnector>,
}

impl RedisCounterStore {
    pub fn new(connector: Arc<RedisConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, name: &str) -> CounterResult<u64> {
        let mut conn = self
            .connector
            .connection()
            .await
            .map_err(|e| CounterError::ConnectionError(e.to_string()))?;

        match conn.incr::<_, _, u64>(name, 1u64).await {
            Ok(value) => {
                trace!("Counter INCR: {} -> {}", name, value);
                Ok(value)
            }
            Err(e) => {
                error!("Redis INCR error for {}: {}", name, e);
                Err(CounterError::OperationError(e.to_string()))
            }
        }
    }
}
