//! HTTP server initialization and runtime setup.
//!
//! Handles store connection, service wiring, the expiry sweeper task, and the
//! Axum server lifecycle.

use crate::application::services::run_expiry_sweeper;
use crate::config::Config;
use crate::domain::time::SystemClock;
use crate::infrastructure::connect_store;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - The configured record store (migrations are applied for PostgreSQL)
/// - Link, eviction and sweeper services
/// - Background expiry sweeper
/// - Axum HTTP server
///
/// On Ctrl-C or SIGTERM the server stops accepting connections and drains,
/// then the sweeper is told to stop and awaited.
///
/// # Errors
///
/// Returns an error if:
/// - The store connection fails
/// - `CORS_ALLOWED_ORIGIN` is not a valid header value
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let store = connect_store(&config).await?;

    let cors_origin = config
        .cors_allowed_origin
        .as_deref()
        .map(HeaderValue::from_str)
        .transpose()
        .context("CORS_ALLOWED_ORIGIN is not a valid origin")?;

    let state = AppState::new(store, &config, Arc::new(SystemClock));

    let (sweeper_stop, sweeper_stop_rx) = oneshot::channel();
    let sweeper_task = tokio::spawn(run_expiry_sweeper(
        state.sweeper.clone(),
        Duration::from_secs(config.sweep_interval_seconds),
        sweeper_stop_rx,
    ));

    let app = app_router(state, cors_origin);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = sweeper_stop.send(());
    if let Err(e) = sweeper_task.await {
        tracing::error!("Expiry sweeper task failed: {}", e);
    }

    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
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

    tracing::info!("Shutting down gracefully...");
}
