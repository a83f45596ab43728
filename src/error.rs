// =============================================================================
// Request-level errors and their HTTP mapping
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::market_data::FetchAttempt;

/// Why an analysis request could not produce a report.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// A query parameter is missing, unparseable or out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Every period/interval combination came back empty or failed.
    #[error("{message}")]
    NoData {
        message: String,
        attempts: Vec<FetchAttempt>,
    },

    /// Data arrived but lookback/smoothing consumed every bar.
    #[error("{message}")]
    NotEnoughBars {
        message: String,
        rows: usize,
        attempts: Vec<FetchAttempt>,
    },

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AdvisorError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::NoData { .. } => StatusCode::BAD_GATEWAY,
            Self::NotEnoughBars { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body shared by the REST and WebSocket surfaces.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::NoData { attempts, .. } => serde_json::json!({
                "error": self.to_string(),
                "attempts": attempts,
            }),
            Self::NotEnoughBars { rows, attempts, .. } => serde_json::json!({
                "error": self.to_string(),
                "rows": rows,
                "attempts": attempts,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        }
    }
}

impl IntoResponse for AdvisorError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_json())).into_response()
    }
}
