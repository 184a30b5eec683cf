//! Picks the fastest healthy CDN(s) out of a snapshot.

use crate::monitor::{Endpoint, Measurement, Snapshot};

/// Only this status code counts as healthy.
pub const HEALTHY_STATUS: u16 = 200;

/// No measurement in the snapshot qualified as healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("No healthy CDN found.")]
pub struct NoHealthyEndpoint;

pub fn is_healthy(m: &Measurement) -> bool {
    m.status_code() == Some(HEALTHY_STATUS)
}

/// Healthy measurements, fastest first. Equal latencies keep
/// configuration order.
pub fn ranked(snapshot: &Snapshot) -> Vec<&Measurement> {
    let mut healthy: Vec<(u64, &Measurement)> = snapshot
        .measurements
        .iter()
        .filter(|m| is_healthy(m))
        .filter_map(|m| m.latency_ms().map(|l| (l, m)))
        .collect();

    // sort_by_key is stable
    healthy.sort_by_key(|(latency, _)| *latency);
    healthy.into_iter().map(|(_, m)| m).collect()
}

pub fn best_measurement(snapshot: &Snapshot) -> Result<&Measurement, NoHealthyEndpoint> {
    ranked(snapshot).into_iter().next().ok_or(NoHealthyEndpoint)
}

pub fn best_endpoint(snapshot: &Snapshot) -> Result<Endpoint, NoHealthyEndpoint> {
    best_measurement(snapshot).map(|m| m.endpoint.clone())
}

/// Every healthy endpoint, fastest first, for clients that want a fallback order.
pub fn best_endpoints(snapshot: &Snapshot) -> Result<Vec<Endpoint>, NoHealthyEndpoint> {
    let ordered: Vec<Endpoint> = ranked(snapshot)
        .into_iter()
        .map(|m| m.endpoint.clone())
        .collect();

    if ordered.is_empty() {
        return Err(NoHealthyEndpoint);
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::FailureReason;
    use chrono::Utc;

    const A: &str = "https://a.example/";
    const B: &str = "https://b.example/";
    const C: &str = "https://c.example/";

    fn ok(url: &str, status: u16, latency: u64) -> Measurement {
        Measurement::success(Endpoint::new(url), status, latency, Utc::now())
    }

    fn fail(url: &str, reason: FailureReason) -> Measurement {
        Measurement::failure(Endpoint::new(url), reason, Utc::now())
    }

    fn snapshot(measurements: Vec<Measurement>) -> Snapshot {
        Snapshot {
            round: 1,
            started_at: Some(Utc::now()),
            measurements,
        }
    }

    #[test]
    fn success_beats_timeout() {
        let snap = snapshot(vec![ok(A, 200, 50), fail(B, FailureReason::Timeout)]);

        assert_eq!(best_endpoint(&snap), Ok(Endpoint::new(A)));
        assert_eq!(best_endpoints(&snap), Ok(vec![Endpoint::new(A)]));
    }

    #[test]
    fn lower_latency_ranks_first() {
        let snap = snapshot(vec![ok(A, 200, 80), ok(B, 200, 40)]);

        assert_eq!(
            best_endpoints(&snap),
            Ok(vec![Endpoint::new(B), Endpoint::new(A)])
        );
    }

    #[test]
    fn ties_keep_configuration_order() {
        let snap = snapshot(vec![ok(C, 200, 30), ok(A, 200, 30), ok(B, 200, 10)]);

        assert_eq!(
            best_endpoints(&snap),
            Ok(vec![Endpoint::new(B), Endpoint::new(C), Endpoint::new(A)])
        );
    }

    #[test]
    fn failures_and_non_200_are_filtered_out() {
        let snap = snapshot(vec![
            ok(A, 404, 5),
            fail(B, FailureReason::NetworkError),
            ok(C, 200, 90),
            ok("https://d.example/", 204, 1),
        ]);

        assert_eq!(best_endpoints(&snap), Ok(vec![Endpoint::new(C)]));
    }

    #[test]
    fn all_failures_signal_no_healthy_endpoint() {
        let snap = snapshot(vec![
            fail(A, FailureReason::Timeout),
            fail(B, FailureReason::NetworkError),
        ]);

        assert_eq!(best_endpoint(&snap), Err(NoHealthyEndpoint));
        assert_eq!(best_endpoints(&snap), Err(NoHealthyEndpoint));
        assert!(ranked(&snap).is_empty());
    }

    #[test]
    fn never_committed_store_has_no_healthy_endpoint() {
        assert_eq!(best_endpoints(&Snapshot::empty()), Err(NoHealthyEndpoint));
    }

    #[test]
    fn ranking_is_idempotent_and_monotonic() {
        let snap = snapshot(vec![
            ok(A, 200, 120),
            ok(B, 200, 15),
            fail(C, FailureReason::Timeout),
            ok("https://d.example/", 200, 60),
            ok("https://e.example/", 200, 15),
        ]);

        let first = best_endpoints(&snap).unwrap();
        let second = best_endpoints(&snap).unwrap();
        assert_eq!(first, second);

        let latencies: Vec<u64> = ranked(&snap)
            .iter()
            .filter_map(|m| m.latency_ms())
            .collect();
        assert!(latencies.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(latencies.len(), 4);
    }
}
