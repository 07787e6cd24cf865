//! Core domain entities.
//!
//! - [`Link`] / [`NewLink`] - A persisted short link and its creation input
//! - [`Resolution`] / [`RedirectKind`] - What a key resolves to and how to redirect
//! - [`ShortenOutcome`] - A shorten result with its "already existed" indicator

pub mod link;

pub use link::{Link, NewLink, RedirectKind, Resolution, ShortenOutcome};
