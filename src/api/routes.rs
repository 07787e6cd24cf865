//! API route configuration.
//!
//! Owner identities arrive already authenticated; no auth layer is applied.

use crate::api::handlers::{create_link_handler, health_handler, list_links_handler};
use crate::state::AppState;
use axum::{Router, routing::get};

/// All API routes, mounted under `/api`.
///
/// # Endpoints
///
/// - `POST /links`            - Register a URL (deduplicated per owner)
/// - `GET  /links?owner_id=`  - List an owner's links
/// - `GET  /health`           - Component health
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/links", get(list_links_handler).post(create_link_handler))
        .route("/health", get(health_handler))
}
