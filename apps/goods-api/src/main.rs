//! # Goods API Server
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  config ─► tracing ─► Postgres (+migrations) ─► ClickHouse (+schema)   │
//! │        ─► NATS (publisher + consumer) ─► Redis (or NullCache)          │
//! │        ─► GoodsService ─► axum on BIND_ADDRESS                         │
//! │                                                                         │
//! │  SIGINT/SIGTERM:                                                        │
//! │    stop accepting ─► drain (≤ SHUTDOWN_TIMEOUT) ─► NATS flush           │
//! │    ─► consumer final flush ─► close pool                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use goods_api::cache::{Cache, NullCache, RedisCache};
use goods_api::{routes, ApiConfig, AppState, GoodsService, JwtVerifier};
use goods_audit::{AuditBatcher, AuditConsumer, ClickHouseConfig, ClickHouseSink, NatsPublisher};
use goods_core::Context;
use goods_db::{Database, DbConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Name the NATS connection reports to the server.
const CLIENT_NAME: &str = "goods-api";

/// How long to wait for Redis before running without a cache.
const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load().context("loading configuration")?;
    init_tracing(&config.log_level);

    info!(addr = %config.bind_address, "Starting goods API server...");

    // Authoritative store
    let db = Database::new(
        DbConfig::new(&config.postgres_dsn)
            .max_connections(config.postgres_max_connections)
            .run_migrations(config.run_migrations),
    )
    .await
    .context("connecting to Postgres")?;

    // Audit pipeline: ClickHouse sink fed from the bus
    let audit = config.audit_config();
    let sink = ClickHouseSink::new(&ClickHouseConfig::from_dsn(&config.clickhouse_dsn)?);
    sink.ensure_schema()
        .await
        .context("creating goods_logs in ClickHouse")?;

    let nats = goods_audit::connect(&config.nats_url, CLIENT_NAME)
        .await
        .context("connecting to NATS")?;
    let messages = goods_audit::subscribe(&nats, &audit.subject).await?;
    let batcher = AuditBatcher::new(Arc::new(sink), &audit);
    let consumer = AuditConsumer::new(batcher, audit.flush_interval).spawn(messages);
    let publisher = NatsPublisher::new(nats, audit.subject.clone());

    // Cache (optional)
    let cache: Arc<dyn Cache> =
        match tokio::time::timeout(REDIS_CONNECT_TIMEOUT, RedisCache::connect(&config.redis_url()))
            .await
        {
            Ok(Ok(redis)) => Arc::new(redis),
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to connect to Redis, continuing without cache");
                Arc::new(NullCache)
            }
            Err(_) => {
                warn!("Timed out connecting to Redis, continuing without cache");
                Arc::new(NullCache)
            }
        };

    let service = GoodsService::new(
        Arc::new(db.goods()),
        cache,
        Arc::new(publisher.clone()),
        config.cache_ttl,
    );

    let root = Context::background();
    let state = AppState::new(service, JwtVerifier::embedded()?, config.request_timeout)
        .with_database(db.clone())
        .with_root(root.clone());
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    info!(addr = %config.bind_address, "Listening");

    let stop = CancellationToken::new();
    let graceful = {
        let stop = stop.clone();
        async move { stop.cancelled().await }
    };
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
        }
        _ = shutdown_signal() => {
            stop.cancel();
            match tokio::time::timeout(config.shutdown_timeout, &mut server).await {
                Ok(result) => result??,
                Err(_) => {
                    warn!(
                        timeout_secs = config.shutdown_timeout.as_secs(),
                        "In-flight requests did not finish in time, cancelling them"
                    );
                    root.cancel();
                    server.abort();
                }
            }
        }
    }

    // The last requests' events are flushed onto the bus before the
    // subscription stops.
    match consumer.drain(&publisher).await {
        Ok(flushed) => info!(flushed, "Audit consumer drained"),
        Err(e) => error!(error = %e, "Final audit flush failed"),
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Installs the global subscriber; an unusable `LOG_LEVEL` falls back to `info`.
fn init_tracing(level: &str) {
    let (filter, invalid) = match EnvFilter::try_new(level) {
        Ok(filter) => (filter, false),
        Err(_) => (EnvFilter::new("info"), true),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if invalid {
        warn!(level, "Invalid LOG_LEVEL, using info");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
