//! Fast click counting with batched reconciliation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::domain::click_event::ClickFlush;
use crate::error::AppError;
use crate::infrastructure::counter::CounterStore;
use crate::utils::deadline::bounded;

/// Name of the fast click counter of `shorten_key`.
pub fn click_counter_name(shorten_key: &str) -> String {
    format!("api:clicks:{shorten_key}")
}

/// Returns true when `count` is a reconciliation point: the first click and
/// every multiple of `batch_size`.
pub fn should_flush(count: u64, batch_size: u64) -> bool {
    count == 1 || (batch_size > 0 && count % batch_size == 0)
}

/// Counts clicks in the shared counter store and periodically copies the
/// total into the link store.
///
/// The fast counter is authoritative for the live count. The persisted
/// `click_count` trails it by less than one batch, except when flush jobs
/// are dropped or fail; the next successful flush repairs either case.
pub struct ClickAccumulator {
    counter: Arc<dyn CounterStore>,
    flush_tx: mpsc::Sender<ClickFlush>,
    batch_size: u64,
    op_timeout: Duration,
}

impl ClickAccumulator {
    pub fn new(
        counter: Arc<dyn CounterStore>,
        flush_tx: mpsc::Sender<ClickFlush>,
        batch_size: u64,
        op_timeout: Duration,
    ) -> Self {
        Self {
            counter,
            flush_tx,
            batch_size,
            op_timeout,
        }
    }

    /// Increments the click counter of `shorten_key` and returns the new total.
    ///
    /// Queues a flush at batch boundaries without waiting for it. A full or
    /// closed queue drops the flush with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] if the counter store cannot be reached.
    pub async fn record_click(&self, shorten_key: &str) -> Result<u64, AppError> {
        let count = bounded(
            self.op_timeout,
            "click counter increment",
            self.counter.incr(&click_counter_name(shorten_key)),
        )
        .await?;

        if should_flush(count, self.batch_size) {
            match self.flush_tx.try_send(ClickFlush::new(shorten_key, count)) {
                Ok(()) => debug!("Queued click flush for {} at {}", shorten_key, count),
                Err(TrySendError::Full(job)) => warn!(
                    "Click flush queue full, dropping {} at {}",
                    job.shorten_key, job.count
                ),
                Err(TrySendError::Closed(job)) => warn!(
                    "Click worker stopped, dropping flush for {} at {}",
                    job.shorten_key, job.count
                ),
            }
        }

        Ok(count)
    }
}
