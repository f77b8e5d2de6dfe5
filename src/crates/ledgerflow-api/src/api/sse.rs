//! `GET /events/workflow/{thread_id}`: the real-time event stream (spec §6.1, §6.4).
//!
//! Each [`ledgerflow_bus::Event`] becomes one `data: <json>\n\n` frame. The teacher's `api::ws`
//! module drives the same "one stream per workflow, replay-then-live" shape over a WebSocket;
//! here it's SSE, so there's no inbound message handling to wire up — [`EventBus::subscribe`]
//! already does replay, heartbeats, and terminate-on-`workflow_complete`, so this handler is a
//! thin adapter from that `Stream<Item = Event>` to axum's SSE response type.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::{Stream, StreamExt};

use ledgerflow_bus::SubscribeOptions;

use crate::app::AppState;

/// Stream `thread_id`'s events as SSE frames. Never errors — an unknown `thread_id` simply opens
/// a stream with an empty history and no subsequent events (the bus creates threads lazily, and
/// the spec treats "no such workflow" as an empty, not a failed, subscription here since a client
/// may legitimately subscribe before the first `stage_update` is published).
pub async fn stream_workflow_events(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let events = state.bus.subscribe(&thread_id, SubscribeOptions::default());
    let frames = events.map(|event| {
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(SseEvent::default().data(json))
    });

    Sse::new(frames).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}

#[cfg(test)]
mod tests {
    use crate::config::ServerConfig;
    use futures::StreamExt as _;
    use ledgerflow_bus::{Event, StageUpdateStatus, SubscribeOptions};

    use crate::app::AppState;

    /// Exercises the same `EventBus::subscribe` call the handler wraps, without going through
    /// axum's `Sse` response type (which has no public way to re-extract its inner stream).
    #[tokio::test]
    async fn published_events_serialize_as_json() {
        let state = AppState::build(ServerConfig::default());
        state
            .bus
            .publish(Event::stage_update("t1", "INTAKE", StageUpdateStatus::Started, serde_json::json!({})));

        let mut stream = state.bus.subscribe("t1", SubscribeOptions::default());
        let first = stream.next().await.unwrap();
        let json = serde_json::to_string(&first).unwrap();
        assert!(json.contains("\"type\":\"stage_update\""));
    }
}
