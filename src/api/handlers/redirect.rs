//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::domain::entities::RedirectKind;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short key to its original URL.
///
/// # Endpoint
///
/// `GET /{key}`
///
/// # Request Flow
///
/// 1. Resolve the key (cache first, store on miss, cache repopulated)
/// 2. Increment the fast click counter; the persisted count is updated by
///    the background worker at batch boundaries
/// 3. Redirect
///
/// # Status Policy
///
/// - **301 Moved Permanently** for anonymous links, so clients and proxies
///   may cache them (their clicks undercount)
/// - **302 Found** for owned links, so every visit comes back and is counted
///
/// A failure to record the click is logged and never fails the redirect.
///
/// # Errors
///
/// Returns 404 Not Found if the key was never registered.
/// Returns 503 Service Unavailable if neither cache nor store can answer.
pub async fn redirect_handler(
    Path(shorten_key): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let resolution = state.link_service.resolve(&shorten_key).await?;

    match state.click_accumulator.record_click(&shorten_key).await {
        Ok(count) => debug!("Click {} recorded for {}", count, shorten_key),
        Err(e) => warn!("Failed to record click for {}: {}", shorten_key, e),
    }

    let status = match resolution.redirect_kind() {
        RedirectKind::Permanent => StatusCode::MOVED_PERMANENTLY,
        RedirectKind::Temporary => StatusCode::FOUND,
    };

    Ok((status, [(header::LOCATION, resolution.original_url)]).into_response())
}
