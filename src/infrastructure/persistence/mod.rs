//! Link store implementations.
//!
//! - [`PgLinkRepository`] - PostgreSQL, the production store
//! - [`MemoryLinkRepository`] - In-process store for tests and local runs

pub mod memory_link_repository;
pub mod pg_link_repository;

pub use memory_link_repository::MemoryLinkRepository;
pub use pg_link_repository::PgLinkRepository;
