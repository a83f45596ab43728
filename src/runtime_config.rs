// =============================================================================
// Advisor Configuration — JSON file with env overrides and atomic save
// =============================================================================
//
// Central configuration for the advisor service: server address, provider
// endpoint, cache lifetime and the defaults used when a request leaves a
// parameter out.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::advisor::Thresholds;
use crate::types::{Interval, Period, RsiMethod};
use crate::yahoo::client::DEFAULT_BASE_URL;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_bind_addr() -> String {
    "0.0.0.0:8501".to_string()
}

fn default_yahoo_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_ws_refresh_secs() -> u64 {
    60
}

fn default_recent_rows() -> usize {
    20
}

fn default_ticker() -> String {
    "AAPL".to_string()
}

fn default_period() -> Period {
    Period::Month1
}

fn default_interval() -> Interval {
    Interval::Minute5
}

fn default_rsi_period() -> usize {
    14
}

fn default_lookback() -> usize {
    50
}

fn default_smooth_length() -> usize {
    5
}

fn default_assets() -> Vec<AssetEntry> {
    [
        ("Apple (AAPL)", "AAPL"),
        ("Tesla (TSLA)", "TSLA"),
        ("Microsoft (MSFT)", "MSFT"),
        ("Bitcoin (BTC-USD)", "BTC-USD"),
        ("Ethereum (ETH-USD)", "ETH-USD"),
        ("XRP (XRP-USD)", "XRP-USD"),
        ("Euro/USD (EURUSD=X)", "EURUSD=X"),
        ("Gold (GC=F)", "GC=F"),
        ("Crude Oil (CL=F)", "CL=F"),
        ("S&P 500 (^GSPC)", "^GSPC"),
    ]
    .into_iter()
    .map(|(label, ticker)| AssetEntry {
        label: label.to_string(),
        ticker: ticker.to_string(),
    })
    .collect()
}

// =============================================================================
// AssetEntry
// =============================================================================

/// One entry of the asset picker: display label and provider ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub label: String,
    pub ticker: String,
}

// =============================================================================
// RequestDefaults
// =============================================================================

/// Values used when a request leaves a parameter out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDefaults {
    #[serde(default = "default_ticker")]
    pub ticker: String,

    #[serde(default = "default_period")]
    pub period: Period,

    #[serde(default = "default_interval")]
    pub interval: Interval,

    /// Retry with known-good period/interval combos when the requested one
    /// returns nothing.
    #[serde(default = "default_true")]
    pub autofix: bool,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// Bars used for the rolling min/max base levels.
    #[serde(default = "default_lookback")]
    pub lookback: usize,

    /// Bars used to smooth the adjusted levels.
    #[serde(default = "default_smooth_length")]
    pub smooth_length: usize,

    #[serde(default)]
    pub rsi_method: RsiMethod,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            period: default_period(),
            interval: default_interval(),
            autofix: true,
            rsi_period: default_rsi_period(),
            lookback: default_lookback(),
            smooth_length: default_smooth_length(),
            rsi_method: RsiMethod::Simple,
        }
    }
}

// =============================================================================
// AdvisorConfig
// =============================================================================

/// Top-level configuration for the advisor service.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    // --- Server -------------------------------------------------------------

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Provider -----------------------------------------------------------

    /// Base URL of the chart API.
    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,

    /// Per-request timeout for provider calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Lifetime of cached series.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    // --- Presentation -------------------------------------------------------

    /// How often a WebSocket subscription re-evaluates its request.
    #[serde(default = "default_ws_refresh_secs")]
    pub ws_refresh_secs: u64,

    /// Rows shown in the "Recent Signals & Levels" table.
    #[serde(default = "default_recent_rows")]
    pub recent_rows: usize,

    /// RSI zone thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Asset picker entries.
    #[serde(default = "default_assets")]
    pub assets: Vec<AssetEntry>,

    // --- Request defaults ---------------------------------------------------
    #[serde(default)]
    pub defaults: RequestDefaults,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            yahoo_base_url: default_yahoo_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            ws_refresh_secs: default_ws_refresh_secs(),
            recent_rows: default_recent_rows(),
            thresholds: Thresholds::default(),
            assets: default_assets(),
            defaults: RequestDefaults::default(),
        }
    }
}

impl AdvisorConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read advisor config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse advisor config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            assets = config.assets.len(),
            "advisor config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise advisor config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "advisor config saved (atomic)");
        Ok(())
    }

    /// Apply `ADVISOR_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup` (env-var name => value).
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("ADVISOR_BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(url) = lookup("ADVISOR_YAHOO_BASE_URL").filter(|s| !s.trim().is_empty()) {
            self.yahoo_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("ADVISOR_CACHE_TTL_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(ttl) => self.cache_ttl_secs = ttl,
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid ADVISOR_CACHE_TTL_SECS"),
            }
        }
        if let Some(ticker) = lookup("ADVISOR_DEFAULT_TICKER").filter(|s| !s.trim().is_empty()) {
            self.defaults.ticker = ticker.trim().to_uppercase();
        }
    }
}
