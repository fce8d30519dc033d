//! smartpro-realtime server entry point.
//!
//! Wires the stores, cache, bus, and outbox from configuration and starts
//! the Axum HTTP server.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use smartpro_realtime::api;
use smartpro_realtime::app_state::AppState;
use smartpro_realtime::config::{AppConfig, KvBackend, LogFormat};
use smartpro_realtime::domain::{MetricsCache, Outbox, UpdateBus};
use smartpro_realtime::kv::{KvClient, KvHandle, KvStore, MemoryKvStore, RestKvStore};
use smartpro_realtime::persistence::{MemoryStore, PostgresStore, RecordStore};
use smartpro_realtime::service::DashboardService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting smartpro-realtime");

    // Build storage
    let kv = KvClient::new(build_kv(&config)?, config.kv_retry_policy());
    let store = build_record_store(&config).await?;

    // Build domain layer
    let cache = MetricsCache::new(kv.clone(), Arc::clone(&store)).with_ttl(config.metrics_cache_ttl());
    let bus = UpdateBus::new(kv);
    let (outbox, dispatcher) = Outbox::new(config.outbox_capacity, cache.clone(), bus.clone());
    let dispatcher_task = tokio::spawn(dispatcher.run());

    // Build service layer and application state
    let app_state = AppState::new(DashboardService::new(store, cache, bus, outbox));

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it the last outbox sender) is gone; let the
    // dispatcher flush what is queued.
    if tokio::time::timeout(Duration::from_secs(5), dispatcher_task)
        .await
        .is_err()
    {
        tracing::warn!("outbox dispatcher did not finish in time");
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn build_kv(config: &AppConfig) -> anyhow::Result<KvHandle> {
    let handle: KvHandle = match &config.kv_backend {
        KvBackend::Disabled => {
            tracing::warn!("no key-value credentials configured, realtime features disabled");
            None
        }
        KvBackend::Memory => {
            tracing::info!("using in-memory key-value store");
            let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
            Some(store)
        }
        KvBackend::Rest { url, token } => {
            let timeout = Duration::from_millis(config.kv_request_timeout_ms);
            let store: Arc<dyn KvStore> = Arc::new(RestKvStore::new(url.as_str(), token.as_str(), timeout)?);
            Some(store)
        }
    };
    Ok(handle)
}

async fn build_record_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled, records are kept in memory");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect_lazy(&config.database_url)?;
    if config.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        tracing::info!("database migrations applied");
    }
    Ok(Arc::new(PostgresStore::new(pool)))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
