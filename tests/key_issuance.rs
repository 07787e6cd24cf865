mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use shortkey::application::services::KeyIssuer;
use shortkey::application::services::key_issuer::KEY_SEQUENCE;
use shortkey::domain::entities::NewLink;
use shortkey::domain::key_filter::KeyFilter;
use shortkey::domain::repositories::LinkRepository;
use shortkey::infrastructure::counter::MemoryCounterStore;
use shortkey::infrastructure::persistence::MemoryLinkRepository;
use shortkey::infrastructure::snapshot::{MemorySnapshotStore, SnapshotStore};

#[tokio::test]
async fn test_concurrent_registrations_get_distinct_keys() {
    let app = common::create_test_app();
    let service = app.state.link_service.clone();

    let mut handles = Vec::new();
    for i in 0..50 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .shorten(format!("https://example.com/page/{}", i), None)
                .await
                .unwrap()
                .link
                .shorten_key
        }));
    }

    let mut keys = HashSet::new();
    for handle in handles {
        assert!(keys.insert(handle.await.unwrap()));
    }

    assert_eq!(keys.len(), 50);
    assert_eq!(app.links.keys().len(), 50);
    assert_eq!(app.counter.current(KEY_SEQUENCE), 50);
}

#[tokio::test]
async fn test_issuance_skips_keys_already_stored() {
    let app = common::create_test_app();

    // "1" and "2" were registered out of band, e.g. imported.
    for key in ["1", "2"] {
        app.links
            .insert(NewLink {
                shorten_key: key.to_string(),
                original_url: "https://legacy.example.com".to_string(),
                owner_id: None,
            })
            .await
            .unwrap();
    }

    let outcome = app
        .state
        .link_service
        .shorten("https://example.com/new".to_string(), None)
        .await
        .unwrap();

    assert_eq!(outcome.link.shorten_key, "3");
    assert!(outcome.created);
}

#[tokio::test]
async fn test_filter_snapshot_survives_restart() {
    let app = common::create_test_app();

    let outcome = app
        .state
        .link_service
        .shorten("https://example.com/persisted".to_string(), Some(3))
        .await
        .unwrap();
    assert!(app.snapshots.contains("test:filter"));

    let restarted = KeyFilter::new(
        app.links.clone(),
        app.snapshots.clone(),
        common::test_settings().filter,
        common::test_settings().op_timeout,
    );

    assert!(
        restarted
            .might_contain(&outcome.link.shorten_key)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_filter_rebuilds_when_snapshot_missing() {
    let app = common::create_test_app();

    app.state
        .link_service
        .shorten("https://example.com/rebuild".to_string(), None)
        .await
        .unwrap();
    app.snapshots.delete("test:filter").await.unwrap();

    let restarted = KeyFilter::new(
        app.links.clone(),
        app.snapshots.clone(),
        common::test_settings().filter,
        common::test_settings().op_timeout,
    );

    assert!(restarted.might_contain("1").await.unwrap());
    assert!(app.snapshots.contains("test:filter"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_replicas_sharing_a_counter_issue_distinct_keys() {
    const REPLICAS: usize = 4;
    const KEYS_PER_REPLICA: usize = 25;

    let counter = Arc::new(MemoryCounterStore::new());
    let links = Arc::new(MemoryLinkRepository::new());
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let settings = common::test_settings();

    // Each replica owns its filter and issuer; only the stores are shared.
    let issuers: Vec<Arc<KeyIssuer>> = (0..REPLICAS)
        .map(|_| {
            let filter = Arc::new(KeyFilter::new(
                links.clone(),
                snapshots.clone(),
                settings.filter.clone(),
                Duration::from_secs(1),
            ));
            Arc::new(KeyIssuer::new(
                counter.clone(),
                filter,
                links.clone(),
                settings.key_issue_max_attempts,
                Duration::from_secs(1),
            ))
        })
        .collect();

    let mut handles = Vec::new();
    for (replica, issuer) in issuers.iter().enumerate() {
        for i in 0..KEYS_PER_REPLICA {
            let issuer = issuer.clone();
            let links = links.clone();
            handles.push(tokio::spawn(async move {
                let key = issuer.issue().await.unwrap();
                links
                    .insert(NewLink {
                        shorten_key: key.clone(),
                        original_url: format!("https://example.com/{replica}/{i}"),
                        owner_id: None,
                    })
                    .await
                    .unwrap();
                key
            }));
        }
    }

    let mut keys = HashSet::new();
    for handle in handles {
        assert!(keys.insert(handle.await.unwrap()));
    }

    let total = REPLICAS * KEYS_PER_REPLICA;
    assert_eq!(keys.len(), total);
    assert_eq!(links.keys().len(), total);
    assert_eq!(counter.current(KEY_SEQUENCE), total as u64);
}
