//! Redis-backed snapshot store.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use redis::AsyncCommands;
use tracing::debug;

use super::service::{SnapshotError, SnapshotResult, SnapshotStore};
use crate::infrastructure::redis_connector::RedisConnector;

/// Stores snapshots as base64 text values in Redis.
///
/// Snapshots are written without a TTL; they are replaced on every save.
pub struct RedisSnapshotStore {
    connector: Arc<RedisConnector>,
}

impl RedisSnapshotStore {
    pub fn new(connector: Arc<RedisConnector>) -> Self {
        Self { connector }
    }

    async fn conn(&self) -> SnapshotResult<redis::aio::ConnectionManager> {
        self.connector
            .connection()
            .await
            .map_err(|e| SnapshotError::ConnectionError(e.to_string()))
    }
}

/// Decodes a stored base64 value. Undecodable text is an operation error, which
/// the filter treats like a missing snapshot and rebuilds.
fn decode_snapshot(name: &str, encoded: &str) -> SnapshotResult<Vec<u8>> {
    STANDARD.decode(encoded.as_bytes()).map_err(|e| {
        SnapshotError::OperationError(format!("snapshot {name} is not valid base64: {e}"))
    })
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn load(&self, name: &str) -> SnapshotResult<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;

        let encoded = conn
            .get::<_, Option<String>>(name)
            .await
            .map_err(|e| SnapshotError::OperationError(e.to_string()))?;

        let Some(encoded) = encoded else {
            debug!("No snapshot stored under {}", name);
            return Ok(None);
        };

        decode_snapshot(name, &encoded).map(Some)
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> SnapshotResult<()> {
        let mut conn = self.conn().await?;
        let encoded = STANDARD.encode(bytes);

        conn.set::<_, _, ()>(name, encoded)
            .await
            .map_err(|e| SnapshotError::OperationError(e.to_string()))?;

        debug!("Snapshot SET: {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    async fn delete(&self, name: &str) -> SnapshotResult<()> {
        let mut conn = self.conn().await?;

        conn.del::<_, i32>(name)
            .await
            .map_err(|e| SnapshotError::OperationError(e.to_string()))?;

        debug!("Snapshot DEL: {}", name);
        Ok(())
    }
}
