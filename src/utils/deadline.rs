//! Time bounds for calls that leave the process.

use std::future::Future;
use std::time::Duration;

use serde_json::json;

use crate::error::AppError;

/// Runs `fut` with an upper bound on its duration.
///
/// Errors from the operation are converted into [`AppError`]; exceeding the
/// bound yields [`AppError::Unavailable`] naming the operation.
pub async fn bounded<T, E, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<AppError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(AppError::unavailable(
            format!("{operation} timed out"),
            json!({
                "operation": operation,
                "timeout_ms": u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
        )),
    }
}
