// =============================================================================
// SR Advisor — Main Entry Point
// =============================================================================
//
// Serves the RSI-adjusted support/resistance dashboard and its JSON API.
// Bars come from the Yahoo chart API and are cached per request for
// `cache_ttl_secs`.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod advisor;
mod api;
mod app_state;
mod chart;
mod error;
mod indicators;
mod market_data;
mod report;
mod runtime_config;
mod types;
mod yahoo;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::AdvisorConfig;
use crate::yahoo::YahooClient;

const DEFAULT_CONFIG_PATH: &str = "advisor_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        SR Advisor — Starting Up                         ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path = PathBuf::from(
        std::env::var("ADVISOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into()),
    );

    let mut config = AdvisorConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AdvisorConfig::default()
    });
    config.apply_env();

    info!(
        bind_addr = %config.bind_addr,
        provider = %config.yahoo_base_url,
        cache_ttl_secs = config.cache_ttl_secs,
        default_ticker = %config.defaults.ticker,
        "Configuration ready"
    );

    // ── 2. Price source & shared state ───────────────────────────────────
    let client = YahooClient::new(
        config.yahoo_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs.max(1)),
    )
    .context("failed to build Yahoo client")?;

    let bind_addr = config.bind_addr.clone();
    let purge_every = Duration::from_secs(config.cache_ttl_secs.max(1));
    let state = Arc::new(AppState::new(config, Arc::new(client)));

    // ── 3. Cache purge loop ──────────────────────────────────────────────
    let purge_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = purge_state.series_cache.purge_expired();
            if removed > 0 {
                info!(removed, remaining = purge_state.series_cache.len(), "expired series purged");
            }
        }
    });

    // ── 4. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "Dashboard listening — press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl+C");
            }
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await
        .context("API server failed")?;

    // ── 5. Shutdown ──────────────────────────────────────────────────────
    if !config_path.exists() {
        if let Err(e) = state.runtime_config.read().save(&config_path) {
            error!(error = %e, "Failed to write default config on shutdown");
        }
    }

    info!(
        reports = state.reports_served.load(std::sync::atomic::Ordering::Relaxed),
        "SR Advisor shut down complete."
    );
    Ok(())
}
