use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::ranking;
use crate::AppState;

use super::metrics::LabelledRecord;
use super::AppError;

#[derive(Debug, Serialize)]
pub struct BestCdnResponse {
    /// Healthy CDN base URLs, fastest first.
    pub cdns: Vec<String>,
}

// ─── GET /best-cdn ───────────────────────────────────────────────

pub async fn best_cdn(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BestCdnResponse>, AppError> {
    let snapshot = state.store.current();
    let cdns = ranking::best_endpoints(&snapshot)?
        .into_iter()
        .map(|e| e.into_string())
        .collect();

    Ok(Json(BestCdnResponse { cdns }))
}

// ─── GET /best-cdn/top ───────────────────────────────────────────
/// The single fastest healthy CDN with its measurement.

pub async fn top_cdn(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LabelledRecord>, AppError> {
    let snapshot = state.store.current();
    let best = ranking::best_measurement(&snapshot)?;

    Ok(Json(LabelledRecord::from(best)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{get_json, router, snapshot};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn no_round_yet_is_a_500() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _store) = router(&dir.path().join("results.json"));

        let (status, body) = get_json(app, "/best-cdn").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({ "error": "No healthy CDN found." }));
    }

    #[tokio::test]
    async fn lists_healthy_cdns_fastest_first() {
        let dir = tempfile::tempdir().unwrap();
        let (app, store) = router(&dir.path().join("results.json"));
        store.commit(snapshot(&[
            ("https://a.example/", Some(200), 80),
            ("https://b.example/", Some(200), 40),
            ("https://c.example/", None, 0),
        ]));

        let (status, body) = get_json(app, "/best-cdn").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({ "cdns": ["https://b.example/", "https://a.example/"] })
        );
    }

    #[tokio::test]
    async fn top_returns_single_best_with_label() {
        let dir = tempfile::tempdir().unwrap();
        let (app, store) = router(&dir.path().join("results.json"));
        store.commit(snapshot(&[
            ("https://site.netlify.app/", Some(200), 70),
            ("https://site.vercel.app/", Some(200), 30),
        ]));

        let (status, body) = get_json(app, "/best-cdn/top").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cdn"], "https://site.vercel.app/");
        assert_eq!(body["status"], 200);
        assert_eq!(body["latency"], 30);
        assert_eq!(body["name"], "Vercel");
    }

    #[tokio::test]
    async fn top_with_only_failures_is_a_500() {
        let dir = tempfile::tempdir().unwrap();
        let (app, store) = router(&dir.path().join("results.json"));
        store.commit(snapshot(&[("https://a.example/", None, 0)]));

        let (status, body) = get_json(app, "/best-cdn/top").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "No healthy CDN found.");
    }
}
