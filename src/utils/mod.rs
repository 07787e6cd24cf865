//! Small helpers shared across layers.
//!
//! - [`base62`] - Counter value to short key encoding
//! - [`deadline`] - Time bounds for external calls

pub mod base62;
pub mod deadline;
