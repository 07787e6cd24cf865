//! Counter store trait and error types.

use async_trait::async_trait;
use serde_json::json;

use crate::error::AppError;

/// Errors that can occur while incrementing a counter.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("Counter connection error: {0}")]
    ConnectionError(String),
    #[error("Counter operation error: {0}")]
    OperationError(String),
}

impl From<CounterError> for AppError {
    fn from(e: CounterError) -> Self {
        AppError::unavailable("Counter store unavailable", json!({ "reason": e.to_string() }))
    }
}

/// Result type for counter operations.
pub type CounterResult<T> = Result<T, CounterError>;

/// Atomic increment over named integer sequences.
///
/// Every call returns a value strictly greater than every value previously
/// returned for the same name, visible to all callers immediately. The key
/// issuer draws from one global sequence; the click accumulator keeps one
/// sequence per short key.
///
/// # Implementations
///
/// - [`crate::infrastructure::counter::RedisCounterStore`] - Shared across replicas (`INCR`)
/// - [`crate::infrastructure::counter::MemoryCounterStore`] - Process-local
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increments the sequence `name` by one and returns the new value.
    ///
    /// A sequence that has never been touched starts at zero, so its first
    /// increment returns 1.
    async fn incr(&self, name: &str) -> CounterResult<u64>;
}
