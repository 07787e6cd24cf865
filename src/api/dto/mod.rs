//! Data Transfer Objects for API requests and responses.
//!
//! All DTOs use Serde for JSON serialization/deserialization. Payloads are
//! taken as already validated by the caller; only their shape is checked.

pub mod health;
pub mod links;
