use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use tracing::debug;

use super::{Endpoint, FailureReason, Measurement};

/// Performs one reachability check against one endpoint.
///
/// Implementations never fail: transport problems come back as a
/// `Failure` measurement.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(
        &self,
        endpoint: &Endpoint,
        probe_path: &str,
        timeout: Duration,
    ) -> Measurement;
}

/// `HEAD`-request prober over a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cdn-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(
        &self,
        endpoint: &Endpoint,
        probe_path: &str,
        timeout: Duration,
    ) -> Measurement {
        let target = endpoint.target(probe_path);

        // ── Timed section: send → response headers ──────────────
        let start = Instant::now();
        let result =
            tokio::time::timeout(timeout, self.client.head(&target).send())
                .await;
        let latency_ms = start.elapsed().as_millis() as u64;
        // ────────────────────────────────────────────────────────

        let observed_at = Utc::now().trunc_subsecs(3);

        match result {
            Ok(Ok(response)) => Measurement::success(
                endpoint.clone(),
                response.status().as_u16(),
                latency_ms,
                observed_at,
            ),
            Ok(Err(err)) => {
                let reason = if err.is_timeout() {
                    FailureReason::Timeout
                } else {
                    FailureReason::NetworkError
                };
                debug!(%target, %reason, error = %err, "probe failed");
                Measurement::failure(endpoint.clone(), reason, observed_at)
            }
            Err(_) => {
                debug!(%target, timeout_ms = timeout.as_millis() as u64, "probe timed out");
                Measurement::failure(
                    endpoint.clone(),
                    FailureReason::Timeout,
                    observed_at,
                )
            }
        }
    }
}
