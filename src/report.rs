// =============================================================================
// Advisor Report — everything the dashboard renders for one request
// =============================================================================
//
// A report is built once per analysis and serialised as-is to the REST and
// WebSocket surfaces. A compact `ReportSummary` is kept in the app state so
// recent requests can be listed without holding on to full series.
// =============================================================================

use serde::Serialize;

use crate::advisor::{Analysis, AnalysisRequest, Recommendation, SignalRow};
use crate::indicators::levels::LevelParams;
use crate::market_data::{FetchAttempt, LoadOutcome};
use crate::types::{Action, Interval, Period};

/// Full analysis result for one ticker.
#[derive(Debug, Clone, Serialize)]
pub struct AdvisorReport {
    /// Unique identifier for this report (UUID v4).
    pub id: String,

    pub ticker: String,

    /// Price source name, e.g. "yahoo".
    pub source: String,

    pub requested_period: Period,
    pub requested_interval: Interval,

    /// Period/interval actually used (after auto-fix).
    pub period: Period,
    pub interval: Interval,

    /// True when auto-fix replaced the requested combo.
    pub autofixed: bool,

    /// True when bars came from the cache.
    pub cached: bool,

    pub params: LevelParams,

    /// Data fetch debug log.
    pub attempts: Vec<FetchAttempt>,

    pub total_rows: usize,
    pub valid_rows: usize,

    pub recommendation: Recommendation,

    /// Last N valid rows, oldest first.
    pub recent: Vec<SignalRow>,

    /// Every row that carries a buy or sell flag.
    pub signals: Vec<SignalRow>,

    /// ISO 8601 timestamp of when this report was created.
    pub created_at: String,
}

impl AdvisorReport {
    pub fn build(
        request: &AnalysisRequest,
        source: &str,
        outcome: &LoadOutcome,
        analysis: &Analysis,
        recent_rows: usize,
    ) -> Self {
        let start = analysis.rows.len().saturating_sub(recent_rows);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ticker: request.ticker.clone(),
            source: source.to_string(),
            requested_period: request.period,
            requested_interval: request.interval,
            period: outcome.period,
            interval: outcome.interval,
            autofixed: outcome.was_fixed(request.period, request.interval),
            cached: outcome.cached,
            params: request.params,
            attempts: outcome.attempts.clone(),
            total_rows: analysis.total_rows,
            valid_rows: analysis.rows.len(),
            recommendation: analysis.recommendation.clone(),
            recent: analysis.rows[start..].to_vec(),
            signals: analysis
                .rows
                .iter()
                .filter(|r| r.buy_signal || r.sell_signal)
                .cloned()
                .collect(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            id: self.id.clone(),
            ticker: self.ticker.clone(),
            period: self.period,
            interval: self.interval,
            action: self.recommendation.action,
            close: self.recommendation.close,
            rsi: self.recommendation.rsi,
            bar_time: self.recommendation.timestamp,
            created_at: self.created_at.clone(),
        }
    }
}

/// Compact record of a past report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub id: String,
    pub ticker: String,
    pub period: Period,
    pub interval: Interval,
    pub action: Action,
    pub close: f64,
    pub rsi: f64,
    pub bar_time: i64,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{analyze, Thresholds};
    use crate::market_data::Candle;

    fn outcome(period: Period, interval: Interval) -> LoadOutcome {
        let candles: Vec<Candle> = (0..120)
            .map(|i| {
                let c = 50.0 + 5.0 * (i as f64 / 7.0).sin();
                Candle::new(i * 3600, c, c, c, c, 10.0)
            })
            .collect();
        LoadOutcome {
            candles,
            period,
            interval,
            attempts: vec![FetchAttempt {
                period,
                interval,
                rows: 120,
                error: None,
            }],
            cached: false,
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            ticker: "MSFT".into(),
            period: Period::Year1,
            interval: Interval::Minute1,
            autofix: true,
            params: LevelParams {
                lookback: 20,
                ..LevelParams::default()
            },
        }
    }

    #[test]
    fn build_trims_recent_and_flags_autofix() {
        let req = request();
        let out = outcome(Period::Month1, Interval::Hour1);
        let analysis = analyze(&out.candles, &req.params, Thresholds::default()).unwrap();
        let report = AdvisorReport::build(&req, "static", &out, &analysis, 20);

        assert_eq!(report.recent.len(), 20);
        assert_eq!(report.recent.last(), analysis.rows.last());
        assert!(report.autofixed);
        assert_eq!(report.period, Period::Month1);
        assert_eq!(report.requested_period, Period::Year1);
        assert_eq!(report.total_rows, 120);
        assert_eq!(report.valid_rows, analysis.rows.len());
        assert!(report.signals.iter().all(|r| r.buy_signal || r.sell_signal));
        assert_eq!(uuid::Uuid::parse_str(&report.id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn summary_mirrors_recommendation() {
        let req = request();
        let out = outcome(Period::Year1, Interval::Minute1);
        let analysis = analyze(&out.candles, &req.params, Thresholds::default()).unwrap();
        let report = AdvisorReport::build(&req, "static", &out, &analysis, 5);
        assert!(!report.autofixed);
        let s = report.summary();
        assert_eq!(s.ticker, "MSFT");
        assert_eq!(s.action, report.recommendation.action);
        assert_eq!(s.bar_time, report.recommendation.timestamp);
    }
}
