//! Process-local snapshot store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::service::{SnapshotResult, SnapshotStore};

/// Keeps snapshots in a map; lost when the process exits.
#[derive(Default)]
pub struct MemorySnapshotStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a snapshot is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.blobs.lock().contains_key(name)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, name: &str) -> SnapshotResult<Option<Vec<u8>>> {
        Ok(self.blobs.lock().get(name).cloned())
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> SnapshotResult<()> {
        self.blobs.lock().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, name: &str) -> SnapshotResult<()> {
        self.blobs.lock().remove(name);
        Ok(())
    }
}
