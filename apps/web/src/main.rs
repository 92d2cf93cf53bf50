//! # Lacteos Web Server
//!
//! ## Startup
//! ```text
//! args / LACTEOS_CONFIG ──► WebConfig::load ──► Database::new (migrations)
//!                                                     │
//!                                                     ▼
//!                          axum::serve ◄── app(AppState) ◄── JwtManager
//!                               │
//!                               ▼
//!                        Ctrl+C / SIGTERM ──► graceful shutdown ──► db.close()
//! ```
//!
//! ## Usage
//! ```bash
//! lacteos-web                       # ./lacteos.toml if present, else defaults
//! lacteos-web --config prod.toml
//! RUST_LOG=lacteos_db=debug lacteos-web
//! ```

use std::path::PathBuf;

use anyhow::Context;
use lacteos_db::{Database, DbConfig};
use lacteos_web::{app, AppState, WebConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("Starting Lacteos web server...");

    let config = WebConfig::load(config_path()).context("Failed to load configuration")?;
    let addr = config.socket_addr()?;
    info!(
        %addr,
        database = %config.database_path.display(),
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await
    .context("Failed to open database")?;
    info!("Database ready");

    let state = AppState::new(db.clone(), config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `--config PATH` / `-c PATH`, falling back to `LACTEOS_CONFIG`.
fn config_path() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => return Some(PathBuf::from(&args[i + 1])),
            _ => i += 1,
        }
    }

    std::env::var("LACTEOS_CONFIG").ok().map(PathBuf::from)
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
