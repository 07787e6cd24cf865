//! Snapshot store trait and error types.

use async_trait::async_trait;
use serde_json::json;

use crate::error::AppError;

/// Errors that can occur while loading or saving a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot connection error: {0}")]
    ConnectionError(String),
    #[error("Snapshot operation error: {0}")]
    OperationError(String),
}

impl From<SnapshotError> for AppError {
    fn from(e: SnapshotError) -> Self {
        AppError::unavailable("Snapshot store unavailable", json!({ "reason": e.to_string() }))
    }
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Named binary blobs used to persist the membership filter across restarts.
///
/// # Implementations
///
/// - [`crate::infrastructure::snapshot::RedisSnapshotStore`] - Shared by all replicas
/// - [`crate::infrastructure::snapshot::MemorySnapshotStore`] - Process-local
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Loads the snapshot stored under `name`, if any.
    async fn load(&self, name: &str) -> SnapshotResult<Option<Vec<u8>>>;

    /// Stores `bytes` under `name`, replacing any previous snapshot.
    async fn save(&self, name: &str, bytes: &[u8]) -> SnapshotResult<()>;

    /// Removes the snapshot stored under `name`.
    async fn delete(&self, name: &str) -> SnapshotResult<()>;
}
