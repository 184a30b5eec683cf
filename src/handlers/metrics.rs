use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::monitor::{Measurement, Snapshot};
use crate::store::MeasurementRecord;
use crate::AppState;

use super::AppError;

// ─── Provider labels ─────────────────────────────────────────────

/// Hostname substring → friendly provider name. First match wins.
const PROVIDER_LABELS: &[(&str, &str)] = &[
    ("dynamiccdnswitch", "Cloudflare"),
    ("vercel", "Vercel"),
    ("netlify", "Netlify"),
    ("github", "GitHub Pages"),
];

/// Friendly provider name for a CDN URL. Unknown hosts come back as the
/// hostname itself, unparseable URLs as given.
pub fn provider_label(cdn: &str) -> String {
    let Ok(url) = reqwest::Url::parse(cdn) else {
        return cdn.to_string();
    };
    let Some(host) = url.host_str() else {
        return cdn.to_string();
    };

    PROVIDER_LABELS
        .iter()
        .find(|(needle, _)| host.contains(needle))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| host.to_string())
}

/// A persisted record plus its provider `name`.
#[derive(Debug, Clone, Serialize)]
pub struct LabelledRecord {
    #[serde(flatten)]
    pub record: MeasurementRecord,
    pub name: String,
}

impl From<&Measurement> for LabelledRecord {
    fn from(m: &Measurement) -> Self {
        Self {
            name: provider_label(m.endpoint.as_str()),
            record: MeasurementRecord::from(m),
        }
    }
}

pub fn labelled(snapshot: &Snapshot) -> Vec<LabelledRecord> {
    snapshot.measurements.iter().map(LabelledRecord::from).collect()
}

// ─── GET /metrics ────────────────────────────────────────────────
/// The persisted snapshot, as external readers of `results.json` see it.

pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LabelledRecord>>, AppError> {
    let store = Arc::clone(&state.store);
    let snapshot = tokio::task::spawn_blocking(move || store.load_persisted())
        .await
        .map_err(|e| AppError::Internal(format!("metrics task failed: {e}")))??;

    Ok(Json(labelled(&snapshot)))
}
