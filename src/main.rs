//! Rollup Engine
//!
//! Multi-resolution time-series ingestion and aggregation for per-asset
//! sensor readings:
//! - batch-atomic, idempotent ingestion into the raw store
//! - dirty-range tracking with overlap merging
//! - background workers recomputing minute/hour/day rollups from raw data
//! - range queries with best-effort staleness flags

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

use api::{router, AppState};
use ingest::CoordinatorConfig;
use registry::HttpAssetRegistry;
use rollup_store::MemoryStore;
use telemetry::{health, init_tracing_from_env};
use worker::{WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Asset registry base URL; "mock" accepts every asset.
    #[serde(default = "default_registry_url")]
    registry_url: String,

    /// Number of aggregation workers.
    #[serde(default = "default_workers")]
    workers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_registry_url() -> String {
    "mock".to_string()
}

fn default_workers() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            registry_url: default_registry_url(),
            workers: default_workers(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting Rollup Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    let store = Arc::new(MemoryStore::new());
    health().store.set_healthy();

    let asset_registry = Arc::new(HttpAssetRegistry::new(config.registry_url.clone()));
    if asset_registry.check_connection().await {
        health().registry.set_healthy();
        info!("Asset registry: healthy");
    } else {
        health().registry.set_unhealthy("Connection failed");
        tracing::error!("Asset registry: unhealthy");
    }

    // Start the aggregation worker pool
    let scheduler = Arc::new(WorkerScheduler::new(
        WorkerConfig {
            workers: config.workers,
            ..WorkerConfig::default()
        },
        store.clone(),
    ));
    let _worker_handles = scheduler.start();

    // HTTP surface
    let state = AppState::new(store, asset_registry, CoordinatorConfig::default());
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("ROLLUP")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // The config crate's env parsing is unreliable with underscored field
    // names; keep explicit overrides for the ones that matter.
    if let Ok(url) = std::env::var("ROLLUP_REGISTRY_URL") {
        config.registry_url = url;
    }
    if let Ok(workers) = std::env::var("ROLLUP_WORKERS") {
        if let Ok(workers) = workers.parse() {
            config.workers = workers;
        }
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
