use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, SubsecRound, Utc};
use futures::future::join_all;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::{Endpoint, Measurement, ProbeOutcome, Prober, Snapshot};
use crate::ranking;
use crate::store::ResultStore;

// ─── Settings ────────────────────────────────────────────────────

/// How probes within one round are dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// One after another, in configuration order.
    Sequential,
    /// All at once; the round ends when the last probe returns.
    #[default]
    Concurrent,
}

/// Everything a round needs to know about what to probe.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub endpoints: Vec<Endpoint>,
    pub probe_path: String,
    pub timeout: Duration,
    pub interval: Duration,
    pub mode: ProbeMode,
}

// ─── One round ───────────────────────────────────────────────────

/// Probes every endpoint once. The result has exactly one measurement
/// per endpoint, in configuration order, whichever mode is used.
pub async fn run_round<P: Prober + ?Sized>(
    prober: &P,
    settings: &ProbeSettings,
    round: u64,
) -> Snapshot {
    let started_at = Utc::now().trunc_subsecs(3);

    let measurements = match settings.mode {
        ProbeMode::Sequential => {
            let mut out = Vec::with_capacity(settings.endpoints.len());
            for endpoint in &settings.endpoints {
                out.push(probe_and_log(prober, endpoint, settings, round).await);
            }
            out
        }
        ProbeMode::Concurrent => {
            join_all(
                settings
                    .endpoints
                    .iter()
                    .map(|endpoint| probe_and_log(prober, endpoint, settings, round)),
            )
            .await
        }
    };

    Snapshot {
        round,
        started_at: Some(started_at),
        measurements,
    }
}

async fn probe_and_log<P: Prober + ?Sized>(
    prober: &P,
    endpoint: &Endpoint,
    settings: &ProbeSettings,
    round: u64,
) -> Measurement {
    let m = prober
        .probe(endpoint, &settings.probe_path, settings.timeout)
        .await;
    let at = m.observed_at.to_rfc3339_opts(SecondsFormat::Millis, true);

    match m.outcome {
        ProbeOutcome::Success {
            status_code,
            latency_ms,
        } => info!(round, cdn = %m.endpoint, status = status_code, latency_ms, %at, "probe"),
        ProbeOutcome::Failure { reason } => {
            warn!(round, cdn = %m.endpoint, status = "FAIL", %reason, %at, "probe")
        }
    }
    m
}

// ─── Monitor ─────────────────────────────────────────────────────

/// Owns the probe schedule and is the single writer of the store.
pub struct Monitor<P> {
    prober: P,
    settings: ProbeSettings,
    store: Arc<ResultStore>,
    rounds: u64,
}

impl<P: Prober> Monitor<P> {
    pub fn new(prober: P, settings: ProbeSettings, store: Arc<ResultStore>) -> Self {
        Self {
            prober,
            settings,
            store,
            rounds: 0,
        }
    }

    /// Run exactly one round: probe, commit, persist.
    pub async fn tick(&mut self) -> Arc<Snapshot> {
        self.rounds += 1;
        let t0 = Instant::now();

        let snapshot = run_round(&self.prober, &self.settings, self.rounds).await;
        let healthy = ranking::ranked(&snapshot).len();
        let best = ranking::best_endpoint(&snapshot).ok();
        let committed = self.store.commit(snapshot);

        info!(
            round = committed.round,
            healthy,
            best = best.as_ref().map(Endpoint::as_str).unwrap_or("none"),
            total = committed.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "round committed"
        );

        // Persistence is best-effort; the in-memory snapshot stays authoritative.
        let store = Arc::clone(&self.store);
        let to_save = Arc::clone(&committed);
        match tokio::task::spawn_blocking(move || store.persist(&to_save)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(round = committed.round, error = %e, "failed to persist snapshot"),
            Err(e) => warn!(round = committed.round, error = %e, "persist task aborted"),
        }

        committed
    }

    /// Tick immediately, then every `interval`, until `shutdown` flips
    /// to `true` or its sender is dropped. A round in flight always
    /// finishes before shutdown is observed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            endpoints = self.settings.endpoints.len(),
            interval_ms = self.settings.interval.as_millis() as u64,
            timeout_ms = self.settings.timeout.as_millis() as u64,
            mode = ?self.settings.mode,
            "monitor started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        info!(rounds = self.rounds, "monitor stopped");
    }
}
