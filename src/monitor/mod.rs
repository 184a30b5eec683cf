pub mod prober;
pub mod runner;

pub use prober::{HttpProber, Prober};
pub use runner::{Monitor, ProbeMode, ProbeSettings};

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One monitored CDN, keyed by its base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Probe target: base URL with the probe path appended verbatim.
    pub fn target(&self, probe_path: &str) -> String {
        format!("{}{}", self.0, probe_path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a probe produced no usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    NetworkError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A response arrived in time. Any status code lands here.
    Success { status_code: u16, latency_ms: u64 },
    /// No response: the latency is meaningless and is not kept.
    Failure { reason: FailureReason },
}

/// The result of probing one endpoint once.
///
/// `observed_at` is kept at millisecond precision, the same precision
/// the results file stores, so a reloaded round compares equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub endpoint: Endpoint,
    pub outcome: ProbeOutcome,
    pub observed_at: DateTime<Utc>,
}

impl Measurement {
    pub fn success(
        endpoint: Endpoint,
        status_code: u16,
        latency_ms: u64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            endpoint,
            outcome: ProbeOutcome::Success {
                status_code,
                latency_ms,
            },
            observed_at: observed_at.trunc_subsecs(3),
        }
    }

    pub fn failure(
        endpoint: Endpoint,
        reason: FailureReason,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            endpoint,
            outcome: ProbeOutcome::Failure { reason },
            observed_at: observed_at.trunc_subsecs(3),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.outcome {
            ProbeOutcome::Success { status_code, .. } => Some(status_code),
            ProbeOutcome::Failure { .. } => None,
        }
    }

    pub fn latency_ms(&self) -> Option<u64> {
        match self.outcome {
            ProbeOutcome::Success { latency_ms, .. } => Some(latency_ms),
            ProbeOutcome::Failure { .. } => None,
        }
    }
}

/// Every measurement of one round, in configuration order.
///
/// A committed snapshot is shared behind an `Arc` and never mutated;
/// the next round replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Round sequence number. `0` means no round has been committed.
    pub round: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub measurements: Vec<Measurement>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            round: 0,
            started_at: None,
            measurements: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
