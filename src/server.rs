use axum::{middleware as axum_mw, routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes, middleware, and static serving.
pub fn create_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        // ── Recommendation ──────────────────────────────────────
        .route("/best-cdn", get(handlers::best_cdn::best_cdn))
        .route("/best-cdn/top", get(handlers::best_cdn::top_cdn))
        // ── Measurements ────────────────────────────────────────
        .route("/metrics", get(handlers::metrics::get_metrics))
        .route("/metrics/stream", get(handlers::stream::metrics_stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Serve the frontend for everything else ──────────────
        .fallback_service(ServeDir::new(static_dir))
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
