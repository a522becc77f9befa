// =============================================================================
// MACD Signal Engine - Main Entry Point
// =============================================================================
//
// Loads configuration and the persisted signal set, kicks off a refresh when
// the cached set is stale, and serves the read-only API. Later requests
// refresh on demand through the freshness policy.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod batch;
mod divergence;
mod error;
mod freshness;
mod indicators;
mod market_data;
mod runtime_config;
mod signal_cache;
mod signals;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::{EastmoneyClient, MergedUniverse};
use crate::runtime_config::EngineConfig;
use crate::signal_cache::SignalCache;

const CONFIG_PATH: &str = "signal_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("MACD signal engine starting up");

    let mut config = EngineConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        let defaults = EngineConfig::default();
        if !std::path::Path::new(CONFIG_PATH).exists() {
            if let Err(e) = defaults.save(CONFIG_PATH) {
                warn!(error = %e, "Failed to write default config");
            }
        }
        defaults
    });
    config.apply_env_overrides();

    info!(
        universe = %config.universe_path.display(),
        cache = %config.cache_path.display(),
        bind_addr = %config.bind_addr,
        "Configuration ready"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let source = Arc::new(
        EastmoneyClient::new(Duration::from_secs(config.request_timeout_secs))
            .context("failed to build market data client")?,
    );
    let universe = MergedUniverse::new(&config.universe_path, config.supplement_path.clone());
    let cache = SignalCache::load_or_empty(&config.cache_path);
    let bind_addr = config.bind_addr.clone();

    let state = Arc::new(AppState::new(config, cache, source, Box::new(universe)));

    // ── 3. Initial refresh (background) ──────────────────────────────────
    let refresh_state = state.clone();
    tokio::spawn(async move {
        let now = chrono::Local::now().naive_local();
        match refresh_state.refresh_if_stale(now).await {
            Ok(set) => info!(signals = set.len(), update_time = ?set.update_time, "Signal set ready"),
            Err(e) => error!(error = %e, "Initial refresh failed"),
        }
    });

    // ── 4. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");
    axum::serve(listener, app).await.context("API server failed")?;

    Ok(())
}
