use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::metrics::labelled;
use crate::AppState;

/// How often the stream checks the store for a new round.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

// ─── GET /metrics/stream ─────────────────────────────────────────
/// Server-Sent Events endpoint.
/// Sends the current snapshot on connect, then again after every new round.
/// The stream ends when shutdown is requested so the server can drain.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(POLL_INTERVAL);
    let shutdown = state.shutdown_requested();
    let mut last_round: Option<u64> = None;

    let stream = IntervalStream::new(interval).filter_map(move |_| {
        let snapshot = state.store.current();
        if last_round == Some(snapshot.round) {
            return None;
        }
        last_round = Some(snapshot.round);

        let json = serde_json::to_string(&labelled(&snapshot)).unwrap_or_default();
        Some(Ok(Event::default().event("snapshot").data(json)))
    });
    let stream = futures::StreamExt::take_until(stream, shutdown);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
