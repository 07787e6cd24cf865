//! Infrastructure layer for external integrations.
//!
//! This layer implements the interfaces the core consumes, providing
//! concrete implementations backed by PostgreSQL, Redis, or process memory.
//!
//! # Modules
//!
//! - [`cache`] - Read-through cache (Redis, memory, no-op)
//! - [`counter`] - Atomic named counters (Redis `INCR`, memory)
//! - [`persistence`] - Link store (PostgreSQL, memory)
//! - [`snapshot`] - Membership filter snapshots (Redis, memory)
//! - [`redis_connector`] - Shared lazily established Redis connection

pub mod cache;
pub mod counter;
pub mod persistence;
pub mod redis_connector;
pub mod snapshot;
