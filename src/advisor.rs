// =============================================================================
// Advisor — RSI-adjusted support/resistance recommendation
// =============================================================================
//
// Pipeline for one request:
//   1. Resolve query parameters against the configured defaults
//   2. Load bars (cache → provider, with period/interval auto-fix)
//   3. Compute RSI and base / adjusted / smoothed levels
//   4. Keep rows where every smoothed level and RSI exist
//   5. Flag fresh crossings on those rows:
//        BUY  = close crosses above smoothed support with rising RSI
//        SELL = close crosses below smoothed resistance with falling RSI
//   6. Latest row => BUY / SELL / WAIT plus levels, zone and bias
//   7. Wrap everything in an AdvisorReport (the caller records it once it
//      has been delivered)
// =============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app_state::AppState;
use crate::error::AdvisorError;
use crate::indicators::levels::{compute_levels, valid_rows, LevelParams, ValidRow};
use crate::market_data::loader::{load_cached, NO_DATA_MESSAGE};
use crate::market_data::{Candle, SeriesKey};
use crate::report::AdvisorReport;
use crate::runtime_config::AdvisorConfig;
use crate::types::{Action, Interval, Period, PriceBias, RsiZone};

/// Message shown when lookback/smoothing leave no valid rows.
pub const NOT_ENOUGH_BARS_MESSAGE: &str = "Not enough bars after applying lookback/smoothing. \
     Increase the period, reduce lookback/smoothing, or choose a higher timeframe.";

const MAX_TICKER_LEN: usize = 24;

// =============================================================================
// Request resolution
// =============================================================================

/// Raw query parameters shared by the REST, chart and WebSocket endpoints.
/// Everything is optional and falls back to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisQuery {
    pub ticker: Option<String>,
    pub period: Option<String>,
    pub interval: Option<String>,
    pub rsi_period: Option<String>,
    pub lookback: Option<String>,
    pub smooth: Option<String>,
    pub autofix: Option<String>,
    pub rsi_method: Option<String>,
}

/// Fully validated analysis request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub period: Period,
    pub interval: Interval,
    pub autofix: bool,
    pub params: LevelParams,
}

impl AnalysisRequest {
    pub fn resolve(query: &AnalysisQuery, config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let defaults = &config.defaults;

        let ticker = normalize_ticker(query.ticker.as_deref().unwrap_or(&defaults.ticker))?;
        let period = parse_opt(query.period.as_deref(), "period")?.unwrap_or(defaults.period);
        let interval = parse_opt(query.interval.as_deref(), "interval")?.unwrap_or(defaults.interval);
        let autofix = match query.autofix.as_deref() {
            None => defaults.autofix,
            Some(raw) => parse_bool(raw)
                .ok_or_else(|| AdvisorError::InvalidParameter(format!("autofix: '{raw}' is not a boolean")))?,
        };
        let rsi_method = parse_opt(query.rsi_method.as_deref(), "rsi_method")?
            .unwrap_or(defaults.rsi_method);

        let params = LevelParams {
            rsi_period: parse_opt(query.rsi_period.as_deref(), "rsi_period")?
                .unwrap_or(defaults.rsi_period),
            lookback: parse_opt(query.lookback.as_deref(), "lookback")?.unwrap_or(defaults.lookback),
            smooth_length: parse_opt(query.smooth.as_deref(), "smooth")?
                .unwrap_or(defaults.smooth_length),
            rsi_method,
        };
        params.validate()?;

        Ok(Self {
            ticker,
            period,
            interval,
            autofix,
            params,
        })
    }

    pub fn series_key(&self) -> SeriesKey {
        SeriesKey {
            symbol: self.ticker.clone(),
            period: self.period,
            interval: self.interval,
            autofix: self.autofix,
        }
    }
}

/// Trim and upper-case a ticker, rejecting characters the provider never uses.
pub fn normalize_ticker(raw: &str) -> Result<String, AdvisorError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AdvisorError::InvalidParameter("ticker must not be empty".into()));
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(AdvisorError::InvalidParameter(format!(
            "ticker longer than {MAX_TICKER_LEN} characters"
        )));
    }
    if let Some(bad) = ticker
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '=' | '^' | '_')))
    {
        return Err(AdvisorError::InvalidParameter(format!(
            "ticker contains invalid character '{bad}'"
        )));
    }
    Ok(ticker)
}

fn parse_opt<T>(raw: Option<&str>, name: &str) -> Result<Option<T>, AdvisorError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| AdvisorError::InvalidParameter(format!("{name}: {e}"))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Signals
// =============================================================================

/// A valid row plus its crossing flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    #[serde(flatten)]
    pub row: ValidRow,
    pub buy_signal: bool,
    pub sell_signal: bool,
}

/// Flag fresh crossings. Each row is compared with the previous *valid* row;
/// the first row never signals.
pub fn detect_signals(rows: &[ValidRow]) -> Vec<SignalRow> {
    rows.iter()
        .enumerate()
        .map(|(i, cur)| {
            let (buy_signal, sell_signal) = match i.checked_sub(1).map(|p| &rows[p]) {
                None => (false, false),
                Some(prev) => (
                    cur.close > cur.smooth_support
                        && prev.close <= prev.smooth_support
                        && cur.rsi > prev.rsi,
                    cur.close < cur.smooth_resistance
                        && prev.close >= prev.smooth_resistance
                        && cur.rsi < prev.rsi,
                ),
            };
            SignalRow {
                row: cur.clone(),
                buy_signal,
                sell_signal,
            }
        })
        .collect()
}

// =============================================================================
// Recommendation
// =============================================================================

/// RSI zone thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

/// What to do on the latest bar, with the levels that back it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    /// Dashboard headline, e.g. "Action: BUY @ ~189.4200".
    pub headline: String,
    pub timestamp: i64,
    pub close: f64,
    /// Smoothed support.
    pub buy_level: f64,
    /// Smoothed resistance.
    pub sell_level: f64,
    pub midline: f64,
    pub rsi: f64,
    pub rsi_zone: RsiZone,
    pub range: f64,
    pub base_support: f64,
    pub base_resistance: f64,
    pub adj_support: f64,
    pub adj_resistance: f64,
    pub bias: PriceBias,
    pub bias_note: String,
}

pub fn recommend(latest: &SignalRow, thresholds: Thresholds) -> Recommendation {
    let r = &latest.row;
    let (action, headline) = if latest.buy_signal {
        (Action::Buy, format!("Action: BUY @ ~{:.4}", r.close))
    } else if latest.sell_signal {
        (Action::Sell, format!("Action: SELL @ ~{:.4}", r.close))
    } else {
        (
            Action::Wait,
            "Action: WAIT — No fresh signal on the latest bar.".to_string(),
        )
    };

    let bias = PriceBias::from_close(r.close, r.smooth_midline);
    let bias_note = match bias {
        PriceBias::TowardSupport => format!(
            "Close is below the midline: price is likely to reach the suggested buy level ({:.4}).",
            r.smooth_support
        ),
        PriceBias::TowardResistance => format!(
            "Close is above the midline: price is likely to reach the suggested sell level ({:.4}).",
            r.smooth_resistance
        ),
        PriceBias::AtMidline => "Close sits on the midline.".to_string(),
    };

    Recommendation {
        action,
        headline,
        timestamp: r.timestamp,
        close: r.close,
        buy_level: r.smooth_support,
        sell_level: r.smooth_resistance,
        midline: r.smooth_midline,
        rsi: r.rsi,
        rsi_zone: RsiZone::classify(r.rsi, thresholds.overbought, thresholds.oversold),
        range: r.range,
        base_support: r.base_support,
        base_resistance: r.base_resistance,
        adj_support: r.adj_support,
        adj_resistance: r.adj_resistance,
        bias,
        bias_note,
    }
}

/// Output of the pure computation over one series.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub total_rows: usize,
    pub rows: Vec<SignalRow>,
    pub recommendation: Recommendation,
}

/// Run indicators, signals and the decision rule over `candles`.
///
/// Returns `None` when no row has every level defined.
pub fn analyze(candles: &[Candle], params: &LevelParams, thresholds: Thresholds) -> Option<Analysis> {
    let levels = compute_levels(candles, params);
    let rows = detect_signals(&valid_rows(&levels));
    let recommendation = recommend(rows.last()?, thresholds);
    Some(Analysis {
        total_rows: candles.len(),
        rows,
        recommendation,
    })
}

// =============================================================================
// Advisor
// =============================================================================

pub struct Advisor;

impl Advisor {
    /// Load, analyse and report on one request. Recording the report in the
    /// history is left to the caller that actually delivers it.
    pub async fn evaluate(
        state: &Arc<AppState>,
        request: &AnalysisRequest,
    ) -> Result<(AdvisorReport, Analysis), AdvisorError> {
        let (thresholds, recent_rows) = {
            let config = state.runtime_config.read();
            (config.thresholds, config.recent_rows)
        };

        // ── 1. Load bars ─────────────────────────────────────────────────
        let outcome = load_cached(state.source.as_ref(), &state.series_cache, &request.series_key()).await;

        if outcome.is_empty() {
            info!(ticker = %request.ticker, attempts = outcome.attempts.len(), "no data for request");
            return Err(AdvisorError::NoData {
                message: NO_DATA_MESSAGE.to_string(),
                attempts: outcome.attempts,
            });
        }

        // ── 2. Indicators, signals, decision ─────────────────────────────
        let Some(analysis) = analyze(&outcome.candles, &request.params, thresholds) else {
            info!(
                ticker = %request.ticker,
                rows = outcome.candles.len(),
                lookback = request.params.lookback,
                smooth = request.params.smooth_length,
                warmup = request.params.warmup_bars(),
                "not enough bars for levels"
            );
            return Err(AdvisorError::NotEnoughBars {
                message: NOT_ENOUGH_BARS_MESSAGE.to_string(),
                rows: outcome.candles.len(),
                attempts: outcome.attempts,
            });
        };

        debug!(
            ticker = %request.ticker,
            valid = analysis.rows.len(),
            total = analysis.total_rows,
            "levels computed"
        );

        // ── 3. Report ────────────────────────────────────────────────────
        let report = AdvisorReport::build(
            request,
            state.source.name(),
            &outcome,
            &analysis,
            recent_rows,
        );

        info!(
            ticker = %report.ticker,
            action = %report.recommendation.action,
            close = report.recommendation.close,
            rsi = report.recommendation.rsi,
            cached = report.cached,
            "advisor report"
        );

        Ok((report, analysis))
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RsiMethod;

    fn row(close: f64, rsi: f64, support: f64, resistance: f64) -> ValidRow {
        ValidRow {
            timestamp: 0,
            close,
            rsi,
            base_support: support,
            base_resistance: resistance,
            range: resistance - support,
            adj_support: support,
            adj_resistance: resistance,
            smooth_support: support,
            smooth_resistance: resistance,
            smooth_midline: (support + resistance) / 2.0,
        }
    }

    // ---- request resolution ---------------------------------------------

    #[test]
    fn resolve_uses_defaults() {
        let cfg = AdvisorConfig::default();
        let req = AnalysisRequest::resolve(&AnalysisQuery::default(), &cfg).unwrap();
        assert_eq!(req.ticker, "AAPL");
        assert_eq!(req.period, Period::Month1);
        assert_eq!(req.interval, Interval::Minute5);
        assert!(req.autofix);
        assert_eq!(req.params, LevelParams::default());
    }

    #[test]
    fn resolve_overrides_and_normalizes() {
        let cfg = AdvisorConfig::default();
        let query = AnalysisQuery {
            ticker: Some(" btc-usd ".into()),
            period: Some("6mo".into()),
            interval: Some("1d".into()),
            rsi_period: Some("21".into()),
            lookback: Some("30".into()),
            smooth: Some("3".into()),
            autofix: Some("off".into()),
            rsi_method: Some("Wilder".into()),
        };
        let req = AnalysisRequest::resolve(&query, &cfg).unwrap();
        assert_eq!(req.ticker, "BTC-USD");
        assert_eq!(req.period, Period::Month6);
        assert_eq!(req.interval, Interval::Day1);
        assert!(!req.autofix);
        assert_eq!(req.params.rsi_period, 21);
        assert_eq!(req.params.lookback, 30);
        assert_eq!(req.params.smooth_length, 3);
        assert_eq!(req.params.rsi_method, RsiMethod::Wilder);
    }

    #[test]
    fn resolve_rejects_bad_values() {
        let cfg = AdvisorConfig::default();
        let bad = |q: AnalysisQuery| AnalysisRequest::resolve(&q, &cfg).is_err();
        assert!(bad(AnalysisQuery { period: Some("10y".into()), ..Default::default() }));
        assert!(bad(AnalysisQuery { lookback: Some("abc".into()), ..Default::default() }));
        assert!(bad(AnalysisQuery { lookback: Some("2".into()), ..Default::default() }));
        assert!(bad(AnalysisQuery { autofix: Some("maybe".into()), ..Default::default() }));
        assert!(bad(AnalysisQuery { ticker: Some("AA PL".into()), ..Default::default() }));
        assert!(bad(AnalysisQuery { rsi_method: Some("ema".into()), ..Default::default() }));
    }

    #[test]
    fn tickers_from_asset_directory_are_valid() {
        for t in ["AAPL", "BTC-USD", "EURUSD=X", "GC=F", "^GSPC", "RELIANCE.NS"] {
            assert_eq!(normalize_ticker(t).unwrap(), t);
        }
        assert!(normalize_ticker("   ").is_err());
        assert!(normalize_ticker("a/b").is_err());
    }

    // ---- signals --------------------------------------------------------

    #[test]
    fn first_row_never_signals() {
        let rows = detect_signals(&[row(12.0, 60.0, 10.0, 20.0)]);
        assert!(!rows[0].buy_signal && !rows[0].sell_signal);
    }

    #[test]
    fn buy_on_cross_above_support_with_rising_rsi() {
        let rows = detect_signals(&[row(9.5, 25.0, 10.0, 20.0), row(10.5, 35.0, 10.0, 20.0)]);
        assert!(rows[1].buy_signal);
        assert!(!rows[1].sell_signal);
    }

    #[test]
    fn no_buy_when_rsi_falls() {
        let rows = detect_signals(&[row(9.5, 40.0, 10.0, 20.0), row(10.5, 35.0, 10.0, 20.0)]);
        assert!(!rows[1].buy_signal);
    }

    #[test]
    fn buy_counts_touch_as_below() {
        let rows = detect_signals(&[row(10.0, 30.0, 10.0, 20.0), row(10.1, 31.0, 10.0, 20.0)]);
        assert!(rows[1].buy_signal);
    }

    #[test]
    fn sell_on_cross_below_resistance_with_falling_rsi() {
        let rows = detect_signals(&[row(20.5, 75.0, 10.0, 20.0), row(19.5, 65.0, 10.0, 20.0)]);
        assert!(rows[1].sell_signal);
        assert!(!rows[1].buy_signal);
    }

    // ---- recommendation -------------------------------------------------

    #[test]
    fn recommend_buy_headline() {
        let rows = detect_signals(&[row(9.5, 25.0, 10.0, 20.0), row(10.5, 35.0, 10.0, 20.0)]);
        let rec = recommend(rows.last().unwrap(), Thresholds::default());
        assert_eq!(rec.action, Action::Buy);
        assert_eq!(rec.headline, "Action: BUY @ ~10.5000");
        assert_eq!(rec.buy_level, 10.0);
        assert_eq!(rec.sell_level, 20.0);
        assert_eq!(rec.bias, PriceBias::TowardSupport);
        assert_eq!(rec.rsi_zone, RsiZone::Neutral);
    }

    #[test]
    fn recommend_wait_without_signal() {
        let rows = detect_signals(&[row(16.0, 72.0, 10.0, 20.0), row(17.0, 75.0, 10.0, 20.0)]);
        let rec = recommend(rows.last().unwrap(), Thresholds::default());
        assert_eq!(rec.action, Action::Wait);
        assert!(rec.headline.contains("No fresh signal"));
        assert_eq!(rec.bias, PriceBias::TowardResistance);
        assert_eq!(rec.rsi_zone, RsiZone::Overbought);
    }

    #[test]
    fn analyze_none_when_not_enough_bars() {
        let candles: Vec<Candle> = (0..10)
            .map(|i| Candle::new(i, 1.0, 1.0, 1.0, 1.0 + i as f64, 0.0))
            .collect();
        assert!(analyze(&candles, &LevelParams::default(), Thresholds::default()).is_none());
    }

    #[test]
    fn analyze_oscillating_series() {
        let candles: Vec<Candle> = (0..300)
            .map(|i| {
                let c = 100.0 + 10.0 * (i as f64 / 12.0).sin();
                Candle::new(i * 300, c, c + 0.5, c - 0.5, c, 1000.0)
            })
            .collect();
        let a = analyze(&candles, &LevelParams::default(), Thresholds::default()).unwrap();
        assert_eq!(a.total_rows, 300);
        assert_eq!(a.rows.len(), 300 - (50 + 5 - 1) + 1);
        let last = &a.recommendation;
        assert!(last.buy_level <= last.midline && last.midline <= last.sell_level);
        assert!((0.0..=100.0).contains(&last.rsi));
    }
}
