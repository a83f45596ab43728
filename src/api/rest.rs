// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All JSON endpoints live under `/api/v1/`; the dashboard page is served at
// `/`. Analysis, chart and WebSocket endpoints share the same query
// parameters (ticker, period, interval, rsi_period, lookback, smooth,
// autofix, rsi_method), each falling back to the configured default.
//
// CORS is configured permissively; the service holds no credentials.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::advisor::{Advisor, Analysis, AnalysisQuery, AnalysisRequest};
use crate::app_state::AppState;
use crate::chart::render_svg;
use crate::error::AdvisorError;
use crate::indicators::{levels, rsi};
use crate::report::AdvisorReport;
use crate::types::{Interval, Period};

/// Upper bound for `GET /api/v1/history?limit=`.
const MAX_HISTORY: usize = 50;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Dashboard ───────────────────────────────────────────────
        .route("/", get(crate::api::dashboard::index))
        // ── Metadata ────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/assets", get(assets))
        .route("/api/v1/options", get(options))
        // ── Analysis ────────────────────────────────────────────────
        .route("/api/v1/analysis", get(analysis))
        .route("/api/v1/chart.svg", get(chart_svg))
        .route("/api/v1/history", get(history))
        .route("/api/v1/cache/clear", post(clear_cache))
        // ── WebSocket (handled separately in ws module but mounted here) ─
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Shared evaluation path
// =============================================================================

/// Resolve `query` against the current config and run the advisor.
/// Failures are logged and recorded in the app state error log; successful
/// reports are not recorded here.
pub(crate) async fn evaluate_query(
    state: &Arc<AppState>,
    query: &AnalysisQuery,
) -> Result<(AdvisorReport, Analysis), AdvisorError> {
    let resolved = {
        let config = state.runtime_config.read();
        AnalysisRequest::resolve(query, &config)
    };

    let ticker = match &resolved {
        Ok(req) => req.ticker.clone(),
        Err(_) => query.ticker.clone().unwrap_or_default(),
    };

    let result = match resolved {
        Ok(request) => Advisor::evaluate(state, &request).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        warn!(ticker = %ticker, status = e.status().as_u16(), error = %e, "analysis request failed");
        state.push_error(&ticker, e.to_string(), e.status().as_u16());
    }
    result
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health_snapshot())
}

// =============================================================================
// Asset directory & selector options
// =============================================================================

async fn assets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let assets = state.runtime_config.read().assets.clone();
    Json(assets)
}

#[derive(Serialize)]
struct Bounds {
    min: usize,
    max: usize,
}

#[derive(Serialize)]
struct OptionsResponse {
    periods: Vec<Period>,
    intervals: Vec<Interval>,
    rsi_period: Bounds,
    lookback: Bounds,
    smooth: Bounds,
    defaults: crate::runtime_config::RequestDefaults,
    thresholds: crate::advisor::Thresholds,
    ws_refresh_secs: u64,
}

async fn options(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.runtime_config.read();
    Json(OptionsResponse {
        periods: Period::SELECTABLE.to_vec(),
        intervals: Interval::SELECTABLE.to_vec(),
        rsi_period: Bounds {
            min: rsi::MIN_PERIOD,
            max: rsi::MAX_PERIOD,
        },
        lookback: Bounds {
            min: levels::MIN_LOOKBACK,
            max: levels::MAX_LOOKBACK,
        },
        smooth: Bounds {
            min: levels::MIN_SMOOTH,
            max: levels::MAX_SMOOTH,
        },
        defaults: config.defaults.clone(),
        thresholds: config.thresholds,
        ws_refresh_secs: config.ws_refresh_secs,
    })
}

// =============================================================================
// Analysis & chart
// =============================================================================

async fn analysis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AdvisorReport>, AdvisorError> {
    let (report, _) = evaluate_query(&state, &query).await?;
    state.push_report(&report);
    Ok(Json(report))
}

async fn chart_svg(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalysisQuery>,
) -> Result<impl IntoResponse, AdvisorError> {
    let (report, analysis) = evaluate_query(&state, &query).await?;
    let svg = render_svg(&report.ticker, &analysis.rows);
    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        svg,
    ))
}

// =============================================================================
// History & cache
// =============================================================================

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(MAX_HISTORY).min(MAX_HISTORY);
    Json(state.recent_reports(limit))
}

async fn clear_cache(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.series_cache.len();
    state.series_cache.clear();
    state.increment_version();
    info!(cleared, "series cache cleared");
    Json(serde_json::json!({ "cleared": cleared }))
}
