use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::monitor::{Endpoint, FailureReason, Measurement, ProbeOutcome};

/// Status marker written in place of a status code for failed probes.
pub const FAIL_MARKER: &str = "FAIL";

/// Latency written for failed probes.
pub const FAIL_LATENCY: i64 = -1;

/// `status` field: a numeric HTTP code or the failure marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusField {
    Code(u16),
    Marker(String),
}

/// One measurement as it appears in `results.json` and on the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub cdn: String,
    pub status: StatusField,
    pub latency: i64,
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
fn serialize_millis<S: Serializer>(
    ts: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl From<&Measurement> for MeasurementRecord {
    fn from(m: &Measurement) -> Self {
        let (status, latency, reason) = match m.outcome {
            ProbeOutcome::Success {
                status_code,
                latency_ms,
            } => (StatusField::Code(status_code), latency_ms as i64, None),
            ProbeOutcome::Failure { reason } => (
                StatusField::Marker(FAIL_MARKER.to_string()),
                FAIL_LATENCY,
                Some(reason),
            ),
        };

        Self {
            cdn: m.endpoint.as_str().to_string(),
            status,
            latency,
            timestamp: m.observed_at,
            reason,
        }
    }
}

impl From<MeasurementRecord> for Measurement {
    /// Numeric strings like `"200"` count as status codes. Anything
    /// else, or a negative latency, reads back as a failure.
    fn from(record: MeasurementRecord) -> Self {
        let code = match &record.status {
            StatusField::Code(code) => Some(*code),
            StatusField::Marker(text) => text.trim().parse::<u16>().ok(),
        };
        let endpoint = Endpoint::new(record.cdn);

        match code {
            Some(status_code) if record.latency >= 0 => Measurement::success(
                endpoint,
                status_code,
                record.latency as u64,
                record.timestamp,
            ),
            _ => Measurement::failure(
                endpoint,
                record.reason.unwrap_or(FailureReason::NetworkError),
                record.timestamp,
            ),
        }
    }
}
