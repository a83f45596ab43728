// =============================================================================
// Central Application State — SR Advisor
// =============================================================================
//
// Shared by every HTTP handler, WebSocket session and background task via
// `Arc<AppState>`. Holds the configuration, the price source, the series
// cache and short audit trails of recent reports and request failures.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
//   - The price source and cache manage their own interior mutability.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::{PriceSource, SeriesCache};
use crate::report::{AdvisorReport, ReportSummary};
use crate::runtime_config::AdvisorConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A failed analysis request, kept for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub ticker: String,
    pub message: String,
    /// HTTP status the request was answered with.
    pub status: u16,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Maximum number of recent report summaries to retain.
const MAX_RECENT_REPORTS: usize = 50;

pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Incremented whenever a report or error is recorded.
    pub state_version: AtomicU64,

    /// Total reports delivered (analysis responses and WebSocket pushes).
    pub reports_served: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<AdvisorConfig>>,

    // ── Market Data ─────────────────────────────────────────────────────
    pub source: Arc<dyn PriceSource>,
    pub series_cache: Arc<SeriesCache>,

    // ── Audit Trail ─────────────────────────────────────────────────────
    pub recent_reports: RwLock<Vec<ReportSummary>>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build the state around `source`. The cache TTL comes from `config`.
    pub fn new(config: AdvisorConfig, source: Arc<dyn PriceSource>) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            state_version: AtomicU64::new(1),
            reports_served: AtomicU64::new(0),
            runtime_config: Arc::new(RwLock::new(config)),
            source,
            series_cache: Arc::new(SeriesCache::new(ttl)),
            recent_reports: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Report Audit ────────────────────────────────────────────────────

    /// Record a report summary. The ring buffer is capped at
    /// [`MAX_RECENT_REPORTS`]; oldest entries are evicted first.
    pub fn push_report(&self, report: &AdvisorReport) {
        let mut reports = self.recent_reports.write();
        reports.push(report.summary());
        while reports.len() > MAX_RECENT_REPORTS {
            reports.remove(0);
        }
        drop(reports);

        self.reports_served.fetch_add(1, Ordering::Relaxed);
        self.increment_version();
    }

    /// Most recent report summaries, newest first.
    pub fn recent_reports(&self, limit: usize) -> Vec<ReportSummary> {
        self.recent_reports
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    // ── Error Logging ───────────────────────────────────────────────────

    pub fn push_error(&self, ticker: &str, message: String, status: u16) {
        let record = ErrorRecord {
            ticker: ticker.to_string(),
            message,
            status,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Liveness payload for `GET /api/v1/health`.
    pub fn health_snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            source: self.source.name(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            state_version: self.current_state_version(),
            reports_served: self.reports_served.load(Ordering::Relaxed),
            cache_entries: self.series_cache.len(),
            cache_ttl_secs: self.series_cache.ttl().as_secs(),
            recent_errors: self.recent_errors.read().iter().rev().take(10).cloned().collect(),
            server_time: Utc::now().timestamp_millis(),
        }
    }
}

/// Service status for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub version: &'static str,
    pub source: &'static str,
    pub uptime_secs: u64,
    pub state_version: u64,
    pub reports_served: u64,
    pub cache_entries: usize,
    pub cache_ttl_secs: u64,
    pub recent_errors: Vec<ErrorRecord>,
    pub server_time: i64,
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::source::StaticSource;

    fn state() -> AppState {
        AppState::new(AdvisorConfig::default(), Arc::new(StaticSource::new()))
    }

    #[test]
    fn error_ring_buffer_is_capped() {
        let s = state();
        let v0 = s.current_state_version();
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            s.push_error("AAPL", format!("e{i}"), 502);
        }
        let errors = s.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "e5");
        assert_eq!(s.current_state_version(), v0 + (MAX_RECENT_ERRORS + 5) as u64);
    }

    #[test]
    fn health_reports_source_and_cache() {
        let s = state();
        let h = s.health_snapshot();
        assert_eq!(h.status, "ok");
        assert_eq!(h.source, "static");
        assert_eq!(h.cache_entries, 0);
        assert_eq!(h.cache_ttl_secs, 600);
        assert_eq!(h.reports_served, 0);
    }
}
