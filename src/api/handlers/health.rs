//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;
use crate::utils::deadline::bounded;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /api/health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Database**: Round trip to the link store
/// 2. **Cache**: Backend ping
/// 3. **Key filter**: Loaded or rebuilt
/// 4. **Click Queue**: Open, with remaining capacity
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let checks = HealthChecks {
        database: check_database(&state).await,
        cache: check_cache(&state).await,
        key_filter: check_key_filter(&state),
        click_queue: check_click_queue(&state),
    };

    let all_healthy = checks.database.is_ok()
        && checks.cache.is_ok()
        && checks.key_filter.is_ok()
        && checks.click_queue.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match bounded(state.op_timeout, "database ping", state.links.ping()).await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(format!("Database error: {}", e)),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    match tokio::time::timeout(state.op_timeout, state.cache.health_check()).await {
        Ok(true) => CheckStatus::ok("Cache reachable"),
        Ok(false) => CheckStatus::error("Cache unreachable"),
        Err(_) => CheckStatus::error(format!(
            "Cache check timed out after {}ms",
            state.op_timeout.as_millis()
        )),
    }
}

fn check_key_filter(state: &AppState) -> CheckStatus {
    if state.key_filter.is_ready() {
        let stats = state.key_filter.stats();
        CheckStatus::ok(format!(
            "{} bits, {} hash functions",
            stats.number_of_bits, stats.number_of_hash_functions
        ))
    } else {
        CheckStatus::error("Key filter not loaded")
    }
}

/// Checks if the click flush queue is operational.
fn check_click_queue(state: &AppState) -> CheckStatus {
    if state.click_sender.is_closed() {
        CheckStatus::error("Click queue is closed")
    } else {
        CheckStatus::ok(format!("Capacity: {}", state.click_sender.capacity()))
    }
}
