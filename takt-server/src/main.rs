//! TAKT server - Main entry point
//!
//! Real-time production post occupancy tracking service: REST API for
//! session entry/exit, RFID badge toggling, cancellation archive, and
//! an SSE stream pushing occupancy snapshots to dashboard clients.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use takt_common::config::{resolve_root_folder, ServerConfig};
use takt_common::db::init_database;
use takt_server::{build_router, AppState};

/// Command-line arguments for takt-server
#[derive(Parser, Debug)]
#[command(name = "takt-server")]
#[command(about = "Production post occupancy tracking service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5760", env = "TAKT_PORT")]
    port: u16,

    /// Data folder holding takt.db
    #[arg(short, long, env = "TAKT_ROOT_FOLDER")]
    root_folder: Option<String>,

    /// Minimum milliseconds between dashboard broadcasts
    #[arg(long, default_value = "2000", env = "TAKT_BROADCAST_INTERVAL_MS")]
    broadcast_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "takt_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = ServerConfig {
        port: args.port,
        root_folder: resolve_root_folder(args.root_folder.as_deref(), "TAKT_ROOT_FOLDER"),
        broadcast_interval: Duration::from_millis(args.broadcast_interval_ms),
    };

    info!(
        "Starting TAKT server v{} on port {}",
        env!("CARGO_PKG_VERSION"),
        config.port
    );
    info!("Root folder: {}", config.root_folder.display());

    let db_pool = init_database(&config.database_path())
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(db_pool, config.broadcast_interval);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
