//! Shared application state and service wiring.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::application::services::{ClickAccumulator, KeyIssuer, LinkService};
use crate::config::CoreSettings;
use crate::domain::click_event::ClickFlush;
use crate::domain::key_filter::KeyFilter;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::counter::CounterStore;
use crate::infrastructure::snapshot::SnapshotStore;

/// The external stores the core runs on.
///
/// Production uses PostgreSQL plus Redis for the other three; tests and
/// single-instance runs use the in-memory implementations.
#[derive(Clone)]
pub struct Backends {
    pub links: Arc<dyn LinkRepository>,
    pub counter: Arc<dyn CounterStore>,
    pub cache: Arc<dyn CacheService>,
    pub snapshots: Arc<dyn SnapshotStore>,
}

/// State injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub click_accumulator: Arc<ClickAccumulator>,
    pub key_filter: Arc<KeyFilter>,
    pub links: Arc<dyn LinkRepository>,
    pub cache: Arc<dyn CacheService>,
    /// Kept for queue health reporting.
    pub click_sender: mpsc::Sender<ClickFlush>,
    /// Public prefix of short URLs, without trailing slash.
    pub base_url: String,
    /// Limit applied to each store call made directly by handlers.
    pub op_timeout: Duration,
}

impl AppState {
    /// Wires services over `backends`.
    ///
    /// Returns the receiving end of the click flush queue; the caller is
    /// expected to hand it to [`crate::domain::click_worker::run_click_worker`].
    pub fn assemble(
        backends: Backends,
        settings: &CoreSettings,
        base_url: impl Into<String>,
    ) -> (Self, mpsc::Receiver<ClickFlush>) {
        let (click_sender, click_rx) = mpsc::channel(settings.click_queue_capacity);

        let key_filter = Arc::new(KeyFilter::new(
            backends.links.clone(),
            backends.snapshots,
            settings.filter.clone(),
            settings.op_timeout,
        ));

        let issuer = Arc::new(KeyIssuer::new(
            backends.counter.clone(),
            key_filter.clone(),
            backends.links.clone(),
            settings.key_issue_max_attempts,
            settings.op_timeout,
        ));

        let link_service = Arc::new(LinkService::new(
            backends.links.clone(),
            backends.cache.clone(),
            issuer,
            settings.op_timeout,
        ));

        let click_accumulator = Arc::new(ClickAccumulator::new(
            backends.counter,
            click_sender.clone(),
            settings.click_flush_batch_size,
            settings.op_timeout,
        ));

        let state = Self {
            link_service,
            click_accumulator,
            key_filter,
            links: backends.links,
            cache: backends.cache,
            click_sender,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            op_timeout: settings.op_timeout,
        };

        (state, click_rx)
    }

    /// Full short URL for `shorten_key`.
    pub fn short_url(&self, shorten_key: &str) -> String {
        format!("{}/{}", self.base_url, shorten_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::MemoryCache;
    use crate::infrastructure::counter::MemoryCounterStore;
    use crate::infrastructure::persistence::MemoryLinkRepository;
    use crate::infrastructure::snapshot::MemorySnapshotStore;

    fn memory_backends(settings: &CoreSettings) -> Backends {
        Backends {
            links: Arc::new(MemoryLinkRepository::new()),
            counter: Arc::new(MemoryCounterStore::new()),
            cache: Arc::new(MemoryCache::new(settings.cache_ttl)),
            snapshots: Arc::new(MemorySnapshotStore::new()),
        }
    }

    #[test]
    fn test_short_url_trims_trailing_slash() {
        let settings = CoreSettings::default();
        let (state, _rx) =
            AppState::assemble(memory_backends(&settings), &settings, "https://s.example.com/");

        assert_eq!(state.short_url("1"), "https://s.example.com/1");
    }

    #[tokio::test]
    async fn test_assembled_services_share_the_filter() {
        let mut settings = CoreSettings::default();
        settings.filter.capacity = 1_000;
        let (state, _rx) =
            AppState::assemble(memory_backends(&settings), &settings, "http://localhost");

        let outcome = state
            .link_service
            .shorten("https://example.com".to_string(), None)
            .await
            .unwrap();

        assert!(state.key_filter.is_ready());
        assert!(
            state
                .key_filter
                .might_contain(&outcome.link.shorten_key)
                .await
                .unwrap()
        );
    }
}
