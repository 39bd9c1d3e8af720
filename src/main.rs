//! Station Relay
//!
//! An HTTP gateway that relays live internet radio stations. Each request
//! resolves the station's source (redirects, PLS, M3U, HLS), hands the
//! playable URL to ffmpeg, and streams the re-muxed output to the client
//! until either side goes away.

mod cli;
mod config;
mod config_file;
mod error;
mod hls;
mod http;
#[cfg(test)]
mod integration;
mod relay;
mod resolve;
mod state;
mod stations;
mod transcode;

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Args;
use crate::config::ServerConfig;
use crate::config_file::ConfigFile;
use crate::error::{RelayError, Result};
use crate::http::create_router;
use crate::state::AppState;
use crate::stations::StationRegistry;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "station-relay";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.write_default_config {
        config_file::generate_default_config(&args.config)
            .map_err(|e| RelayError::Config(e.to_string()))?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let mut config = load_config(&args);
    args.apply(&mut config);

    // Initialize logging
    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    tracing::debug!("Configuration loaded: {:?}", config);

    let stations = StationRegistry::from_file(&config.stations_file)?;
    tracing::info!(
        "Loaded {} stations from {}",
        stations.len(),
        config.stations_file
    );
    if stations.is_empty() {
        tracing::warn!("No stations configured; every relay request will be rejected");
    }

    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| RelayError::Config(format!("invalid listen address: {}", e)))?;

    // Create application state
    let state = Arc::new(AppState::new(config, stations)?);

    // Build router
    let app = create_router(state);

    // Start server
    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Config file if present, otherwise defaults.
///
/// Runs before logging is initialized, so problems go to stderr.
fn load_config(args: &Args) -> ServerConfig {
    let path = &args.config;
    if !path.exists() {
        eprintln!(
            "Config file {} not found, using defaults",
            path.display()
        );
        return ServerConfig::default();
    }

    match ConfigFile::from_file(path) {
        Ok(cf) => cf.into_server_config(),
        Err(e) => {
            eprintln!(
                "Failed to load config file {}: {}. Using defaults.",
                path.display(),
                e
            );
            ServerConfig::default()
        }
    }
}

/// Initialize logging with tracing
fn init_logging(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("station_relay={},tower_http=info", config.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
