//! Distributed counters: the key sequence and per-key click counters.
//!
//! Provides a [`CounterStore`] trait with two implementations:
//! - [`RedisCounterStore`] - Shared across service replicas
//! - [`MemoryCounterStore`] - Process-local, for tests and single-instance runs

mod memory_counter;
mod redis_counter;
mod service;

pub use memory_counter::MemoryCounterStore;
pub use redis_counter::RedisCounterStore;
pub use service::{CounterError, CounterResult, CounterStore};

#[cfg(test)]
pub use service::MockCounterStore;
