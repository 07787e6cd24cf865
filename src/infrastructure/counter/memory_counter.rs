//! Process-local counter store.

use async_trait::async_trait;
use dashmap::DashMap;

use super::service::{CounterResult, CounterStore};

/// In-memory counters for tests and single-instance deployments.
///
/// Atomic within one process only; replicas must use
/// [`super::RedisCounterStore`] to share a sequence.
#[derive(Default)]
pub struct MemoryCounterStore {
    values: DashMap<String, u64>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value of a sequence without advancing it.
    pub fn current(&self, name: &str) -> u64 {
        self.values.get(name).map(|v| *v).unwrap_or(0)
    }

    /// Forces a sequence to `value`, e.g. to simulate a reseeded counter.
    pub fn reset_to(&self, name: &str, value: u64) {
        self.values.insert(name.to_string(), value);
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, name: &str) -> CounterResult<u64> {
        let mut entry = self.values.entry(name.to_string()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_increment_returns_one() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.incr("seq").await.unwrap(), 1);
        assert_eq!(store.incr("seq").await.unwrap(), 2);
        assert_eq!(store.current("seq"), 2);
    }

    #[tokio::test]
    async fn test_sequences_are_independent() {
        let store = MemoryCounterStore::new();
        store.incr("a").await.unwrap();
        store.incr("a").await.unwrap();

        assert_eq!(store.incr("b").await.unwrap(), 1);
        assert_eq!(store.current("a"), 2);
    }

    #[tokio::test]
    async fn test_reset_to_reseeds_sequence() {
        let store = MemoryCounterStore::new();
        store.reset_to("seq", 99);
        assert_eq!(store.incr("seq").await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_unique() {
        let store = Arc::new(MemoryCounterStore::new());
        let mut handles = Vec::new();

        for _ in 0..50 {
            let s = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..20 {
                    seen.push(s.incr("seq").await.unwrap());
                }
                seen
            }));
        }

        let mut all = HashSet::new();
        for handle in handles {
            for value in handle.await.unwrap() {
                assert!(all.insert(value), "value {} returned twice", value);
            }
        }

        assert_eq!(all.len(), 1000);
        assert_eq!(store.current("seq"), 1000);
    }
}
