pub mod conversion;
pub mod core;
pub mod providers;
pub mod server;
pub mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::conversion::ConversionService;
use crate::core::config::AppConfig;
use crate::providers::EcbRateFetcher;
use crate::server::AppState;
use crate::store::RateStore;

/// Loads configuration and serves the API until shutdown.
///
/// `listen` takes precedence over both the config file and the `PORT`
/// environment variable.
pub async fn run(config_path: Option<&str>, listen: Option<SocketAddr>) -> Result<()> {
    info!("fxrates starting...");

    let mut config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    }
    .with_env_overrides()?;
    if let Some(addr) = listen {
        config.listen_addr = addr;
    }
    debug!("Loaded config: {config:#?}");

    let state = build_state(&config)?;
    server::serve(state, config.listen_addr, config.static_dir.as_deref()).await
}

/// Wires the fetcher, rate store and conversion service together and starts
/// the initial rate load in the background.
///
/// Must be called from within a Tokio runtime.
pub fn build_state(config: &AppConfig) -> Result<Arc<AppState>> {
    let fetcher = EcbRateFetcher::from_config(&config.providers.ecb)
        .context("Failed to create ECB rate fetcher")?;
    let store = Arc::new(RateStore::new(Arc::new(fetcher), config.cache_ttl()));
    store.start();

    Ok(Arc::new(AppState {
        conversions: ConversionService::new(store),
    }))
}
