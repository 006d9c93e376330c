//! Weatherdash Service - Background collector and HTTP API.
//!
//! Run with: `cargo run -p weatherdash-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, middleware as axum_middleware};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use weatherdash_service::{AppState, Collector, Config, api, middleware};
use weatherdash_store::Store;

/// Weatherdash Service - Background collector and HTTP REST API.
#[derive(Parser, Debug)]
#[command(name = "weatherdash-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Disable background collector (API only mode).
    #[arg(long)]
    no_collector: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("weatherdash_service=info".parse()?)
                .add_directive("weatherdash_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }
    if args.no_collector {
        config.collector.enabled = false;
    }
    config.validate()?;

    info!("Opening database at {:?}", config.storage.path);
    let store = Store::open(&config.storage.path)?;

    let state = AppState::new(store, config.clone());

    if config.collector.enabled {
        let collector = Collector::new(Arc::clone(&state));
        collector.start();
    } else {
        info!("Background collector disabled");
    }

    if config.security.api_key_enabled {
        info!("API key authentication enabled");
    }

    let app = Router::new()
        .merge(api::router())
        .layer(axum_middleware::from_fn_with_state(
            Arc::new(config.security.clone()),
            middleware::api_key_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(Arc::clone(&state));

    let addr: SocketAddr = config.server.bind.parse()?;
    info!(
        "Starting server on {} for {}",
        addr, config.location.name
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.collector.signal_stop();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
