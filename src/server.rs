//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, Redis-backed stores, filter warm-up, worker
//! spawning, and Axum server lifecycle.

use crate::config::Config;
use crate::domain::click_worker::run_click_worker;
use crate::infrastructure::cache::{MemoryCache, NullCache, RedisCache};
use crate::infrastructure::counter::{MemoryCounterStore, RedisCounterStore};
use crate::infrastructure::persistence::PgLinkRepository;
use crate::infrastructure::redis_connector::RedisConnector;
use crate::infrastructure::snapshot::{MemorySnapshotStore, RedisSnapshotStore};
use crate::routes::app_router;
use crate::state::{AppState, Backends};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the PostgreSQL pool with the configured limits.
///
/// # Errors
///
/// Returns an error if no connection can be established.
pub async fn connect_database(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");
    Ok(pool)
}

/// Builds the store backends: PostgreSQL for links, Redis (or process memory
/// when Redis is not configured) for counters, cache and filter snapshots.
/// With `CACHE_ENABLED=false` the cache is a [`NullCache`].
///
/// The Redis connection is established here, outside any request deadline,
/// so its capped retries run to completion once.
///
/// # Errors
///
/// Returns an error if the Redis URL is invalid or Redis stays unreachable
/// after every retry.
pub async fn build_backends(config: &Config, pool: PgPool) -> Result<Backends> {
    let links = Arc::new(PgLinkRepository::new(Arc::new(pool)));
    let cache_ttl = Duration::from_secs(config.cache_ttl_seconds);

    let mut backends = match &config.redis_url {
        Some(redis_url) => {
            let connector = Arc::new(
                RedisConnector::new(redis_url, config.redis_connect_retries, config.op_timeout())
                    .context("Failed to configure Redis")?,
            );
            connector
                .connection()
                .await
                .context("Redis unreachable")?;
            tracing::info!("Counters, cache and filter snapshot backed by Redis");

            Backends {
                links,
                counter: Arc::new(RedisCounterStore::new(connector.clone())),
                cache: Arc::new(RedisCache::new(connector.clone(), cache_ttl)),
                snapshots: Arc::new(RedisSnapshotStore::new(connector)),
            }
        }
        None => {
            tracing::warn!(
                "Redis not configured: counters, cache and filter snapshot are process-local. \
                 Do not run more than one instance."
            );

            Backends {
                links,
                counter: Arc::new(MemoryCounterStore::new()),
                cache: Arc::new(MemoryCache::new(cache_ttl)),
                snapshots: Arc::new(MemorySnapshotStore::new()),
            }
        }
    };

    if !config.cache_enabled {
        tracing::info!("Resolution cache disabled");
        backends.cache = Arc::new(NullCache::new());
    }

    Ok(backends)
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Redis-backed counters, cache and snapshot store (or in-memory fallback)
/// - Key filter (snapshot load or rebuild)
/// - Background click worker
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;
    tracing::info!("Migrations applied");

    let backends = build_backends(&config, pool).await?;
    let settings = config.core_settings();
    let (state, click_rx) = AppState::assemble(backends, &settings, config.base_url.clone());

    // A failed warm-up is retried lazily by the first issue or lookup.
    match state.key_filter.initialize().await {
        Ok(()) => tracing::info!("Key filter ready"),
        Err(e) => tracing::warn!("Key filter warm-up failed, will retry on demand: {}", e),
    }

    let worker = tokio::spawn(run_click_worker(
        click_rx,
        state.links.clone(),
        settings.op_timeout,
    ));
    tracing::info!("Click worker started");

    let app = app_router(state, config.request_timeout());

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Every click sender lives in the router; once it is dropped the worker drains and exits.
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Click worker terminated abnormally: {}", e),
        Err(_) => tracing::warn!("Click worker did not drain in time, pending flushes dropped"),
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
}
