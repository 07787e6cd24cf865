//! Handlers for link registration and listing.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde_json::json;

use crate::api::dto::links::{CreateLinkRequest, LinkListResponse, LinkResponse, ListLinksQuery};
use crate::error::AppError;
use crate::state::AppState;

/// Registers a URL and returns its short key.
///
/// # Endpoint
///
/// `POST /api/links`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/long-url", "owner_id": 42 }
/// ```
///
/// `owner_id` is optional; omit it for an anonymous link.
///
/// # Response
///
/// - **201 Created** with the new link
/// - **200 OK** with the existing link when the same owner already
///   registered the same URL
///
/// ```json
/// {
///   "shorten_key": "1",
///   "short_url": "https://s.example.com/1",
///   "original_url": "https://example.com/long-url",
///   "owner_id": 42,
///   "click_count": 0,
///   "created_at": "2025-01-01T00:00:00Z",
///   "created": true
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if `url` is empty.
/// Returns 500 `key_generation_exhausted` if no free key could be issued.
/// Returns 503 Service Unavailable if a backing store is unreachable.
pub async fn create_link_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    if payload.url.trim().is_empty() {
        return Err(AppError::bad_request(
            "url must not be empty",
            json!({ "field": "url" }),
        ));
    }

    let outcome = state
        .link_service
        .shorten(payload.url, payload.owner_id)
        .await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let short_url = state.short_url(&outcome.link.shorten_key);

    Ok((
        status,
        Json(LinkResponse::from_link(outcome.link, short_url).with_created(outcome.created)),
    ))
}

/// Lists the links registered by one owner, newest first.
///
/// # Endpoint
///
/// `GET /api/links?owner_id=42`
pub async fn list_links_handler(
    State(state): State<AppState>,
    Query(query): Query<ListLinksQuery>,
) -> Result<Json<LinkListResponse>, AppError> {
    let links = state.link_service.list_by_owner(query.owner_id).await?;

    let items: Vec<LinkResponse> = links
        .into_iter()
        .map(|link| {
            let short_url = state.short_url(&link.shorten_key);
            LinkResponse::from_link(link, short_url)
        })
        .collect();

    Ok(Json(LinkListResponse {
        owner_id: query.owner_id,
        total: items.len(),
        items,
    }))
}
