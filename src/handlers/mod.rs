pub mod best_cdn;
pub mod metrics;
pub mod stream;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::ranking::NoHealthyEndpoint;
use crate::store::StoreError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    /// Ranking found nothing with a healthy status.
    NoHealthyCdn,
    /// The persisted snapshot could not be read or parsed.
    MetricsUnavailable(StoreError),
    Internal(String),
}

impl From<NoHealthyEndpoint> for AppError {
    fn from(_: NoHealthyEndpoint) -> Self {
        Self::NoHealthyCdn
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::MetricsUnavailable(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            Self::NoHealthyCdn => NoHealthyEndpoint.to_string(),
            Self::MetricsUnavailable(e) => {
                error!(error = %e, "error reading results");
                "Failed to load metrics.".to_string()
            }
            Self::Internal(msg) => {
                error!(error = %msg, "internal error");
                msg
            }
        };

        let body = serde_json::json!({ "error": message });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// ─── Test helpers ────────────────────────────────────────────────
