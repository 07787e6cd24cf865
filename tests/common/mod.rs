#![allow(dead_code)]

use axum_test::TestServer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use shortkey::config::CoreSettings;
use shortkey::domain::click_event::ClickFlush;
use shortkey::domain::click_worker::apply_flush;
use shortkey::domain::key_filter::FilterSettings;
use shortkey::infrastructure::cache::MemoryCache;
use shortkey::infrastructure::counter::MemoryCounterStore;
use shortkey::infrastructure::persistence::MemoryLinkRepository;
use shortkey::infrastructure::snapshot::MemorySnapshotStore;
use shortkey::routes::build_router;
use shortkey::state::{AppState, Backends};

pub const BASE_URL: &str = "https://s.example.com";

/// An application wired over in-memory stores.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub links: Arc<MemoryLinkRepository>,
    pub counter: Arc<MemoryCounterStore>,
    pub cache: Arc<MemoryCache>,
    pub snapshots: Arc<MemorySnapshotStore>,
    pub click_rx: mpsc::Receiver<ClickFlush>,
}

pub fn test_settings() -> CoreSettings {
    CoreSettings {
        filter: FilterSettings {
            capacity: 10_000,
            error_rate: 0.01,
            snapshot_name: "test:filter".to_string(),
        },
        click_queue_capacity: 100,
        op_timeout: Duration::from_secs(1),
        ..CoreSettings::default()
    }
}

pub fn create_test_app() -> TestApp {
    let links = Arc::new(MemoryLinkRepository::new());
    let counter = Arc::new(MemoryCounterStore::new());
    let cache = Arc::new(MemoryCache::new(Duration::from_secs(604_800)));
    let snapshots = Arc::new(MemorySnapshotStore::new());

    let backends = Backends {
        links: links.clone(),
        counter: counter.clone(),
        cache: cache.clone(),
        snapshots: snapshots.clone(),
    };

    let (state, click_rx) = AppState::assemble(backends, &test_settings(), BASE_URL);
    let server = TestServer::new(build_router(state.clone(), Duration::from_secs(30))).unwrap();

    TestApp {
        server,
        state,
        links,
        counter,
        cache,
        snapshots,
        click_rx,
    }
}

impl TestApp {
    /// Applies every queued click flush, as the background worker would.
    pub async fn drain_click_flushes(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(job) = self.click_rx.try_recv() {
            apply_flush(&job, self.links.as_ref(), Duration::from_secs(1)).await;
            applied += 1;
        }
        applied
    }
}
