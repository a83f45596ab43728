// =============================================================================
// Yahoo Finance Chart API Client
// =============================================================================
//
// Public, unauthenticated endpoint:
//   GET /v8/finance/chart/{symbol}?range=1mo&interval=5m
//
// The response is columnar: one `timestamp` array plus parallel OHLCV arrays
// under `indicators.quote[0]`, any of which may contain nulls for bars the
// exchange did not trade. Daily and weekly bars additionally carry
// `indicators.adjclose[0].adjclose`, used to back-adjust prices for splits and
// dividends.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::{Candle, PriceSource};
use crate::types::{Interval, Period};

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// The chart endpoint rejects requests without a browser-like agent.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against `base_url` with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// Build the chart URL for `symbol` (path-encoded, so `^GSPC` and
    /// `EURUSD=X` survive intact).
    fn chart_url(&self, symbol: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("invalid base url '{}'", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base url '{}' cannot carry a path", self.base_url))?
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{symbol}.
    ///
    /// Returns bars oldest first, auto-adjusted when the provider supplies an
    /// adjusted close.
    #[instrument(skip(self), name = "yahoo::get_chart")]
    pub async fn get_chart(&self, symbol: &str, period: Period, interval: Interval) -> Result<Vec<Candle>> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            anyhow::bail!("empty ticker symbol");
        }

        let url = self.chart_url(&symbol)?;
        let resp = self
            .client
            .get(url)
            .query(&[
                ("range", period.as_str()),
                ("interval", interval.as_str()),
                ("includePrePost", "false"),
                ("events", "div|split"),
            ])
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read chart response body")?;

        // Yahoo reports unknown symbols as 404 with a JSON error payload, so
        // parse first to surface its description.
        let parsed = parse_chart(&body);
        if !status.is_success() {
            match parsed {
                Err(e) => anyhow::bail!("Yahoo chart returned {status}: {e:#}"),
                Ok(_) => anyhow::bail!("Yahoo chart returned {status}"),
            }
        }
        let candles = parsed?;

        debug!(symbol = %symbol, %period, %interval, count = candles.len(), "chart fetched");
        Ok(candles)
    }
}

#[async_trait]
impl PriceSource for YahooClient {
    async fn fetch_bars(&self, symbol: &str, period: Period, interval: Interval) -> Result<Vec<Candle>> {
        self.get_chart(symbol, period, interval).await
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    #[serde(default)]
    adjclose: Vec<AdjCloseBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Column value at `idx`, treating missing and null alike.
fn column(values: &[Option<f64>], idx: usize) -> Option<f64> {
    values.get(idx).copied().flatten().filter(|v| v.is_finite())
}

/// Parse a chart response body into bars.
///
/// Bars with a missing open/high/low/close are dropped; a missing volume is
/// read as zero.
fn parse_chart(body: &str) -> Result<Vec<Candle>> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).context("failed to parse chart JSON")?;

    if let Some(err) = envelope.chart.error {
        anyhow::bail!("{}: {}", err.code, err.description);
    }

    let result = match envelope.chart.result.and_then(|r| r.into_iter().next()) {
        Some(r) => r,
        None => return Ok(Vec::new()),
    };

    let empty = QuoteBlock::default();
    let quote = result.indicators.quote.first().unwrap_or(&empty);
    let adjclose = result
        .indicators
        .adjclose
        .first()
        .map(|a| a.adjclose.as_slice())
        .unwrap_or(&[]);

    let mut candles = Vec::with_capacity(result.timestamp.len());
    let mut dropped = 0usize;

    for (idx, &ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            column(&quote.open, idx),
            column(&quote.high, idx),
            column(&quote.low, idx),
            column(&quote.close, idx),
        ) else {
            dropped += 1;
            continue;
        };
        let volume = column(&quote.volume, idx).unwrap_or(0.0);
        let mut candle = Candle::new(ts, open, high, low, close, volume);

        if let Some(adj) = column(adjclose, idx) {
            if close != 0.0 {
                candle = candle.adjusted(adj / close);
            }
        }
        candles.push(candle);
    }

    if dropped > 0 {
        warn!(dropped, kept = candles.len(), "dropped bars with missing prices");
    }

    Ok(candles)
}
