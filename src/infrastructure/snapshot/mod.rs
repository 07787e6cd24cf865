//! Persistence for the membership filter snapshot.
//!
//! - [`RedisSnapshotStore`] - Shared snapshot, reloaded by every replica on start
//! - [`MemorySnapshotStore`] - Process-local, for tests

mod memory_snapshot;
mod redis_snapshot;
mod service;

pub use memory_snapshot::MemorySnapshotStore;
pub use redis_snapshot::RedisSnapshotStore;
pub use service::{SnapshotError, SnapshotResult, SnapshotStore};

#[cfg(test)]
pub use service::MockSnapshotStore;
