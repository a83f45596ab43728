// =============================================================================
// Price Loader — requested combo first, then known-good fallbacks
// =============================================================================
//
// The provider silently returns nothing (or an error) for period/interval
// pairs outside its retention window, e.g. 1m bars for 6 months. With
// auto-fix enabled the loader walks a fixed list of combos that are known to
// work and keeps the first non-empty series. Every attempt is recorded so the
// dashboard can show what was tried.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::market_data::cache::{SeriesCache, SeriesKey};
use crate::market_data::source::PriceSource;
use crate::market_data::Candle;
use crate::types::{Interval, Period};

/// Combos tried after the user's own, in order, when auto-fix is on.
pub const FALLBACK_COMBOS: [(Period, Interval); 5] = [
    (Period::Year1, Interval::Day1),
    (Period::Month6, Interval::Day1),
    (Period::Month1, Interval::Hour1),
    (Period::Days7, Interval::Hour1),
    (Period::Days60, Interval::Minute5),
];

/// Message shown when every combo came back empty.
pub const NO_DATA_MESSAGE: &str = "Unable to fetch data with the tried period/interval combinations. \
     Please try again with a different ticker, shorter interval, or longer period.";

/// One provider request and what came of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchAttempt {
    pub period: Period,
    pub interval: Interval,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl std::fmt::Display for FetchAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tried Period={}, Interval={} → Rows={}",
            self.period, self.interval, self.rows
        )?;
        if let Some(err) = &self.error {
            write!(f, " ({err})")?;
        }
        Ok(())
    }
}

/// Result of a load: the winning series (possibly empty), the combo that
/// produced it and the full attempt log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub candles: Vec<Candle>,
    /// Effective period (may differ from the request after auto-fix).
    pub period: Period,
    /// Effective interval (may differ from the request after auto-fix).
    pub interval: Interval,
    pub attempts: Vec<FetchAttempt>,
    /// True when served from the cache.
    #[serde(default)]
    pub cached: bool,
}

impl LoadOutcome {
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// True when the series came from a fallback rather than the request.
    pub fn was_fixed(&self, period: Period, interval: Interval) -> bool {
        !self.is_empty() && (self.period != period || self.interval != interval)
    }
}

/// Ordered, de-duplicated list of combos to try.
pub fn candidate_combos(period: Period, interval: Interval, autofix: bool) -> Vec<(Period, Interval)> {
    let mut combos = vec![(period, interval)];
    if autofix {
        for combo in FALLBACK_COMBOS {
            if !combos.contains(&combo) {
                combos.push(combo);
            }
        }
    }
    combos
}

/// Why candidate `idx` should not be sent, if anything. The user's own combo
/// (index 0) is always sent; fallbacks must fit the provider's lookback.
fn skip_reason(idx: usize, period: Period, interval: Interval) -> Option<&'static str> {
    if idx > 0 && !period.supports(interval) {
        Some("exceeds provider lookback limit")
    } else {
        None
    }
}

/// Fetch bars for `symbol`, falling back through [`FALLBACK_COMBOS`] when
/// `autofix` is set. Never fails: provider errors are recorded in the
/// attempt log and an empty outcome is returned when nothing worked.
pub async fn load_prices(
    source: &dyn PriceSource,
    symbol: &str,
    period: Period,
    interval: Interval,
    autofix: bool,
) -> LoadOutcome {
    let mut attempts = Vec::new();

    for (idx, (p, i)) in candidate_combos(period, interval, autofix)
        .into_iter()
        .enumerate()
    {
        if let Some(reason) = skip_reason(idx, p, i) {
            debug!(symbol, period = %p, interval = %i, reason, "fallback skipped");
            attempts.push(FetchAttempt {
                period: p,
                interval: i,
                rows: 0,
                error: Some(reason.to_string()),
            });
            continue;
        }

        match source.fetch_bars(symbol, p, i).await {
            Ok(candles) => {
                debug!(symbol, period = %p, interval = %i, rows = candles.len(), "fetch attempt");
                attempts.push(FetchAttempt {
                    period: p,
                    interval: i,
                    rows: candles.len(),
                    error: None,
                });
                if !candles.is_empty() {
                    if idx > 0 {
                        info!(
                            symbol,
                            requested = %format!("{period}/{interval}"),
                            used = %format!("{p}/{i}"),
                            "auto-fixed period/interval"
                        );
                    }
                    return LoadOutcome {
                        candles,
                        period: p,
                        interval: i,
                        attempts,
                        cached: false,
                    };
                }
            }
            Err(e) => {
                warn!(symbol, period = %p, interval = %i, error = %e, "fetch attempt failed");
                attempts.push(FetchAttempt {
                    period: p,
                    interval: i,
                    rows: 0,
                    error: Some(format!("{e:#}")),
                });
            }
        }
    }

    warn!(symbol, tried = attempts.len(), "no data from any period/interval combo");
    LoadOutcome {
        candles: Vec::new(),
        period,
        interval,
        attempts,
        cached: false,
    }
}

/// [`load_prices`] behind a [`SeriesCache`].
pub async fn load_cached(source: &dyn PriceSource, cache: &SeriesCache, key: &SeriesKey) -> LoadOutcome {
    if let Some(mut hit) = cache.get(key) {
        debug!(key = %key, "series cache hit");
        hit.cached = true;
        return hit;
    }
    let outcome = load_prices(source, &key.symbol, key.period, key.interval, key.autofix).await;
    cache.insert(key.clone(), outcome.clone());
    outcome
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::market_data::source::StaticSource;

    fn bars(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle::new(i as i64 * 60, 10.0, 11.0, 9.0, 10.0 + i as f64, 1.0))
            .collect()
    }

    #[test]
    fn combos_without_autofix() {
        assert_eq!(
            candidate_combos(Period::Month1, Interval::Minute5, false),
            vec![(Period::Month1, Interval::Minute5)]
        );
    }

    #[test]
    fn combos_skip_duplicate_of_request() {
        let combos = candidate_combos(Period::Year1, Interval::Day1, true);
        assert_eq!(combos.len(), 5);
        assert_eq!(combos[0], (Period::Year1, Interval::Day1));
        assert_eq!(combos[1], (Period::Month6, Interval::Day1));
    }

    #[test]
    fn oversized_fallbacks_are_skipped_but_request_is_sent() {
        assert_eq!(
            skip_reason(1, Period::Year1, Interval::Minute5),
            Some("exceeds provider lookback limit")
        );
        assert_eq!(skip_reason(0, Period::Year1, Interval::Minute5), None);
        assert_eq!(skip_reason(3, Period::Days7, Interval::Minute1), None);
        for (idx, (p, i)) in FALLBACK_COMBOS.into_iter().enumerate() {
            assert_eq!(skip_reason(idx + 1, p, i), None, "{p}/{i}");
        }
    }

    #[tokio::test]
    async fn first_combo_wins() {
        let src = StaticSource::new().with("AAPL", Period::Month1, Interval::Minute5, bars(10));
        let out = load_prices(&src, "AAPL", Period::Month1, Interval::Minute5, true).await;
        assert_eq!(out.candles.len(), 10);
        assert_eq!(out.attempts.len(), 1);
        assert!(!out.was_fixed(Period::Month1, Interval::Minute5));
        assert_eq!(src.calls(), 1);
    }

    #[tokio::test]
    async fn falls_back_after_error_and_empty() {
        let src = StaticSource::new()
            .fail("AAPL", Period::Month6, Interval::Minute1, "range too long")
            .with("AAPL", Period::Month6, Interval::Day1, bars(120));
        let out = load_prices(&src, "AAPL", Period::Month6, Interval::Minute1, true).await;
        assert_eq!(out.period, Period::Month6);
        assert_eq!(out.interval, Interval::Day1);
        // request (error), 1y/1d (empty), 6mo/1d (hit)
        assert_eq!(out.attempts.len(), 3);
        assert!(out.attempts[0].error.as_deref().unwrap().contains("range too long"));
        assert_eq!(out.attempts[1].rows, 0);
        assert_eq!(out.attempts[2].rows, 120);
        assert!(out.was_fixed(Period::Month6, Interval::Minute1));
    }

    #[tokio::test]
    async fn autofix_disabled_returns_empty() {
        let src = StaticSource::new().with("AAPL", Period::Year1, Interval::Day1, bars(5));
        let out = load_prices(&src, "AAPL", Period::Month1, Interval::Minute5, false).await;
        assert!(out.is_empty());
        assert_eq!(out.attempts.len(), 1);
    }

    #[tokio::test]
    async fn all_empty_records_every_attempt() {
        let src = StaticSource::new();
        let out = load_prices(&src, "NOPE", Period::Month1, Interval::Minute5, true).await;
        assert!(out.is_empty());
        assert_eq!(out.attempts.len(), 6);
        assert_eq!(src.calls(), 6);
    }

    #[test]
    fn attempt_display_matches_debug_line() {
        let a = FetchAttempt {
            period: Period::Month1,
            interval: Interval::Minute5,
            rows: 42,
            error: None,
        };
        assert_eq!(a.to_string(), "Tried Period=1mo, Interval=5m → Rows=42");
    }

    #[tokio::test]
    async fn cached_load_hits_source_once() {
        let src = StaticSource::new().with("TSLA", Period::Month1, Interval::Minute5, bars(8));
        let cache = SeriesCache::new(Duration::from_secs(600));
        let key = SeriesKey {
            symbol: "TSLA".into(),
            period: Period::Month1,
            interval: Interval::Minute5,
            autofix: true,
        };
        let first = load_cached(&src, &cache, &key).await;
        let second = load_cached(&src, &cache, &key).await;
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.candles.len(), 8);
        assert_eq!(src.calls(), 1);
    }
}
