//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating the link store,
//! the counters, the membership filter and the cache. Services consume
//! repository and infrastructure traits and provide a clean API for HTTP
//! handlers.
//!
//! # Available Services
//!
//! - [`services::key_issuer::KeyIssuer`] - Collision-free key generation
//! - [`services::link_service::LinkService`] - Link registration and resolution
//! - [`services::click_accumulator::ClickAccumulator`] - Click counting and batched flush

pub mod services;
