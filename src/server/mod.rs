//! HTTP surface of the service.

pub mod api;
pub mod error;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::conversion::ConversionService;

pub use api::app_router;

pub struct AppState {
    pub conversions: ConversionService,
}

/// Serves the API on `addr` until Ctrl-C is received.
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    static_dir: Option<&Path>,
) -> Result<()> {
    let router = app_router(state, static_dir);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
