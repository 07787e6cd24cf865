//! Collision-free short key issuance.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::key_filter::KeyFilter;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::counter::CounterStore;
use crate::utils::base62;
use crate::utils::deadline::bounded;

/// Name of the shared key sequence.
pub const KEY_SEQUENCE: &str = "api:globalCounter";

/// Issues short keys drawn from the shared counter.
///
/// Each attempt takes the next counter value and encodes it in base 62. The
/// membership filter rules out keys that were certainly never issued; a
/// "maybe" is confirmed against the link store. A key found in the store
/// costs one attempt and a fresh draw from the counter.
pub struct KeyIssuer {
    counter: Arc<dyn CounterStore>,
    filter: Arc<KeyFilter>,
    links: Arc<dyn LinkRepository>,
    max_attempts: usize,
    op_timeout: Duration,
}

impl KeyIssuer {
    pub fn new(
        counter: Arc<dyn CounterStore>,
        filter: Arc<KeyFilter>,
        links: Arc<dyn LinkRepository>,
        max_attempts: usize,
        op_timeout: Duration,
    ) -> Self {
        Self {
            counter,
            filter,
            links,
            max_attempts,
            op_timeout,
        }
    }

    /// Returns a key not present in the link store at the time of checking.
    ///
    /// The accepted key is added to the filter and the filter snapshot is
    /// written back; a failed snapshot write is logged and does not fail the
    /// issuance.
    ///
    /// # Errors
    ///
    /// - [`AppError::Unavailable`] if the counter or the link store cannot be reached
    /// - [`AppError::KeyGenerationExhausted`] after `max_attempts` collisions
    pub async fn issue(&self) -> Result<String, AppError> {
        for attempt in 1..=self.max_attempts {
            let n = bounded(self.op_timeout, "counter increment", self.counter.incr(KEY_SEQUENCE))
                .await?;
            let candidate = base62::encode(n);

            if self.is_free(&candidate).await? {
                self.filter.add(&candidate).await?;
                if let Err(e) = self.filter.persist().await {
                    warn!("Failed to persist key filter after issuing {}: {}", candidate, e);
                }

                debug!("Issued key {} on attempt {}", candidate, attempt);
                return Ok(candidate);
            }

            warn!(
                "Key {} already stored, drawing again (attempt {}/{})",
                candidate, attempt, self.max_attempts
            );
        }

        Err(AppError::exhausted(
            "Failed to generate a unique key",
            json!({ "attempts": self.max_attempts }),
        ))
    }

    async fn is_free(&self, candidate: &str) -> Result<bool, AppError> {
        if !self.filter.might_contain(candidate).await? {
            return Ok(true);
        }

        let stored = bounded(self.op_timeout, "link lookup", self.links.find_by_key(candidate))
            .await?;
        if stored.is_none() {
            debug!("Filter false positive for {}", candidate);
        }

        Ok(stored.is_none())
    }
}
