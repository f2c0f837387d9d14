//! grantgate Server
//!
//! Serves the grant authorization API and forwards approved transfers to a
//! relayer.
//!
//! # Usage
//!
//! ```bash
//! # In-memory grants, default relayer
//! grantgate-server
//!
//! # Persistent grants
//! grantgate-server --store-path ./data/grants --relayer-url http://relayer:3100/transfers
//!
//! # Environment overrides
//! GRANTGATE__SERVER__PORT=8080 GRANTGATE__ENGINE__TRANSFER_TIMEOUT_MS=5000 grantgate-server
//! ```

mod config;
mod relay;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use grantgate_api::{create_router, ApiConfig, AppState};
use grantgate_core::{AuthzEngine, GrantEvent};
use grantgate_store::{GrantStore, MemoryGrantStore, SledGrantStore};

use crate::config::{ServerConfig, StoreBackend};
use crate::relay::RelayerTransferExecutor;

// =============================================================================
// CLI Arguments
// =============================================================================

/// grantgate Server - delegated transfer authorization
#[derive(Parser, Debug)]
#[command(name = "grantgate-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "GRANTGATE_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "GRANTGATE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "GRANTGATE_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GRANTGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "GRANTGATE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Persist grants in a sled database at this path
    #[arg(long, env = "GRANTGATE_STORE_PATH")]
    store_path: Option<String>,

    /// Relayer endpoint that performs transfers
    #[arg(long, env = "GRANTGATE_RELAYER_URL")]
    relayer_url: Option<String>,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(path) = self.store_path {
            config.store.backend = StoreBackend::Sled;
            config.store.path = path.into();
        }
        if let Some(url) = self.relayer_url {
            config.relayer.url = url;
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    args.apply(&mut server_config);

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting grantgate server"
    );

    let store = init_store(&server_config.store)?;

    if server_config.relayer.timeout() > server_config.engine.transfer_timeout() {
        tracing::warn!(
            relayer_timeout_secs = server_config.relayer.timeout_secs,
            engine_timeout_ms = server_config.engine.transfer_timeout_ms,
            "Relayer timeout exceeds engine transfer timeout; the engine bound wins"
        );
    }
    let executor = Arc::new(RelayerTransferExecutor::new(
        server_config.relayer.url.clone(),
        server_config.relayer.timeout(),
    )?);
    tracing::info!(url = %server_config.relayer.url, "Relayer configured");

    let engine = Arc::new(AuthzEngine::new(store, executor, server_config.engine.clone()));
    tokio::spawn(audit_events(engine.subscribe()));

    let state = Arc::new(AppState::new(engine));
    let api_config = ApiConfig {
        enable_cors: server_config.api.enable_cors,
        cors_origins: server_config.api.cors_origins.clone(),
        enable_tracing: server_config.api.enable_tracing,
    };
    let app = create_router(state, api_config);

    let addr = server_config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.server.shutdown_timeout()))
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .init();
        }
    }

    Ok(())
}

/// Open the configured grant store
fn init_store(config: &config::StoreConfig) -> anyhow::Result<Arc<dyn GrantStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory grant store; grants are lost on restart");
            Ok(Arc::new(MemoryGrantStore::new()))
        }
        StoreBackend::Sled => {
            tracing::info!(path = %config.path.display(), "Opening sled grant store");
            Ok(Arc::new(SledGrantStore::open(&config.path)?))
        }
    }
}

/// Write every grant event to the audit log target
async fn audit_events(mut events: broadcast::Receiver<GrantEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let (granter, grantee) = event.pair();
                match serde_json::to_string(&event) {
                    Ok(payload) => tracing::info!(
                        target: "grantgate::audit",
                        kind = event.kind(),
                        granter,
                        grantee,
                        event = %payload,
                        "Grant event"
                    ),
                    Err(e) => tracing::warn!(
                        target: "grantgate::audit",
                        error = %e,
                        "Unserializable grant event"
                    ),
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(target: "grantgate::audit", skipped, "Audit log fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    tracing::info!(
        timeout_secs = timeout.as_secs(),
        "Waiting for in-flight requests to complete..."
    );

    tokio::time::sleep(timeout).await;
}

// =============================================================================
// Tests
// =============================================================================
