//! Background worker applying click flush jobs to the link store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::click_event::ClickFlush;
use crate::domain::repositories::LinkRepository;
use crate::utils::deadline::bounded;

/// Drains `rx` until every sender is dropped.
///
/// Failures are logged as reconciliation failures and not retried: the next
/// flush for the same key carries a count at least as large.
pub async fn run_click_worker(
    mut rx: mpsc::Receiver<ClickFlush>,
    links: Arc<dyn LinkRepository>,
    op_timeout: Duration,
) {
    while let Some(job) = rx.recv().await {
        apply_flush(&job, links.as_ref(), op_timeout).await;
    }

    info!("Click worker stopped");
}

/// Writes one flush job to the store. Returns true if a stored link was updated.
pub async fn apply_flush(
    job: &ClickFlush,
    links: &dyn LinkRepository,
    op_timeout: Duration,
) -> bool {
    let count = i64::try_from(job.count).unwrap_or(i64::MAX);

    match bounded(
        op_timeout,
        "click count update",
        links.update_click_count(&job.shorten_key, count),
    )
    .await
    {
        Ok(true) => {
            debug!("Persisted click count {} for {}", count, job.shorten_key);
            true
        }
        Ok(false) => {
            warn!(
                "Click reconciliation skipped: no stored link for {}",
                job.shorten_key
            );
            false
        }
        Err(e) => {
            warn!(
                "Click reconciliation failed for {} (count {}): {}",
                job.shorten_key, count, e
            );
            false
        }
    }
}
