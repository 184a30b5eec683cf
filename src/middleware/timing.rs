use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Adds two response headers:
///
///   X-Response-Time-Us: total handler wall time in microseconds
///   Server-Timing: same value in the standard Server-Timing format
///
/// and logs one line per API request.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros() as u64;

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing =
        format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // ── Log ─────────────────────────────────────────────────────
    // Static files and the SSE stream are too noisy to log.
    if is_api_path(&path) {
        let status = response.status().as_u16();
        if response.status().is_success() {
            info!(%method, %path, status, us, "request");
        } else {
            warn!(%method, %path, status, us, "request");
        }
    }

    response
}

fn is_api_path(path: &str) -> bool {
    path.starts_with("/best-cdn") || path == "/metrics"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn adds_timing_headers() {
        let app = Router::new()
            .route("/best-cdn", get(|| async { "ok" }))
            .layer(middleware::from_fn(timing_middleware));

        let response = app
            .oneshot(Request::builder().uri("/best-cdn").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().contains_key("X-Response-Time-Us"));
        let timing = response.headers()["Server-Timing"].to_str().unwrap();
        assert!(timing.starts_with("total;dur="));
    }

    #[test]
    fn only_api_routes_are_logged() {
        assert!(is_api_path("/best-cdn"));
        assert!(is_api_path("/best-cdn/top"));
        assert!(is_api_path("/metrics"));
        assert!(!is_api_path("/metrics/stream"));
        assert!(!is_api_path("/index.html"));
    }
}
