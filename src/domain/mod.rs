//! Domain layer containing business entities and logic.
//!
//! This module implements the core domain logic following Clean Architecture principles.
//! It defines entities, repository interfaces, and domain services independent of
//! presentation concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`key_filter`] - Membership filter over issued keys
//! - [`click_event`] - Click flush job model
//! - [`click_worker`] - Asynchronous click count reconciliation
//!
//! # Click Processing Flow
//!
//! 1. HTTP handler resolves a key and redirects
//! 2. The fast click counter is incremented
//! 3. At batch boundaries a [`click_event::ClickFlush`] is queued (non-blocking)
//! 4. [`click_worker::run_click_worker`] writes the count via [`repositories::LinkRepository`]

pub mod click_event;
pub mod click_worker;
pub mod entities;
pub mod key_filter;
pub mod repositories;
