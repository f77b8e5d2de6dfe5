//! The Event Bus: per-`thread_id` pub/sub with history replay and heartbeats.
//!
//! [`EventBus`] is a process-wide singleton created once at startup and shared
//! (via `Arc`) by the Workflow Engine's observer (the publisher) and the HTTP
//! layer's SSE handler (the subscriber). For each thread it holds:
//!
//! - A **history buffer**: every event ever published for that thread, in
//!   emission order. Cleared only by an explicit [`EventBus::clear_history`]
//!   call — never automatically.
//! - A **subscriber set**: a [`tokio::sync::broadcast`] channel. Broadcast's
//!   bounded ring buffer gives the drop-oldest-per-slow-subscriber policy the
//!   spec calls for without any bespoke queue management: a receiver that falls
//!   more than `capacity` events behind skips the ones it missed (reported as
//!   `RecvError::Lagged`) rather than blocking the publisher. The history
//!   buffer is authoritative, so a late or lagging subscriber that re-subscribes
//!   with `include_history` recovers a consistent view regardless.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use dashmap::DashMap;
use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::event::Event;

/// Per-subscriber channel capacity. A subscriber lagging this far behind live
/// publication starts missing events (recoverable via history replay on
/// resubscribe); the publisher never blocks.
const CHANNEL_CAPACITY: usize = 256;

/// Default heartbeat interval: a synthetic [`Event::Heartbeat`] is emitted to a
/// subscriber if nothing else arrives within this window, purely to keep
/// transports (SSE, long-poll) alive.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

struct ThreadChannel {
    history: Mutex<Vec<Event>>,
    sender: broadcast::Sender<Event>,
}

impl ThreadChannel {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            history: Mutex::new(Vec::new()),
            sender,
        }
    }
}

/// Options controlling a [`EventBus::subscribe`] call.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeOptions {
    /// Replay the full current history before switching to live events.
    pub include_history: bool,
    /// How long to wait for a real event before emitting a synthetic heartbeat.
    pub heartbeat_interval: Duration,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            include_history: true,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// A lazy, possibly-infinite sequence of events for one thread.
///
/// Terminates when a [`Event::is_workflow_complete`] event is seen (whether
/// during history replay or live) or when the consumer drops the stream.
pub type EventStream = std::pin::Pin<Box<dyn Stream<Item = Event> + Send>>;

/// The process-wide Event Bus singleton.
///
/// Cheap to clone (internally `Arc`-backed); construct one with [`EventBus::new`]
/// at startup and share it between the engine's observer and the HTTP layer.
#[derive(Clone)]
pub struct EventBus {
    threads: Arc<DashMap<String, Arc<ThreadChannel>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            threads: Arc::new(DashMap::new()),
        }
    }

    fn channel_for(&self, thread_id: &str) -> Arc<ThreadChannel> {
        self.threads
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(ThreadChannel::new()))
            .clone()
    }

    /// Publish `event` for its thread (panics if called with a heartbeat, which
    /// has no thread and is never published — heartbeats are synthesized
    /// per-subscriber in [`subscribe`](Self::subscribe)).
    ///
    /// Appends to history, then fans out to every live subscriber. Never
    /// blocks: a full subscriber queue drops its oldest unread entries rather
    /// than stalling the publisher, per the bus's no-back-pressure contract.
    pub fn publish(&self, event: Event) {
        let Some(thread_id) = event.thread_id().map(str::to_string) else {
            trace!("dropping heartbeat-shaped event with no thread_id from publish");
            return;
        };

        let channel = self.channel_for(&thread_id);
        channel.history.lock().push(event.clone());

        // `send` only errors when there are zero receivers; that's expected
        // for threads with no subscriber currently attached, and the history
        // buffer still holds the event for a later subscriber.
        let _ = channel.sender.send(event);
    }

    /// Subscribe to `thread_id`'s events.
    ///
    /// The returned stream replays the current history (if
    /// `opts.include_history`), then a synthetic [`Event::connected`], then
    /// every subsequent live event in emission order, interleaved with
    /// synthetic [`Event::heartbeat`] events whenever nothing real arrives
    /// within `opts.heartbeat_interval`. If `workflow_complete` is encountered
    /// at any point — during replay or live — it is yielded and the stream
    /// ends immediately after.
    pub fn subscribe(&self, thread_id: &str, opts: SubscribeOptions) -> EventStream {
        let channel = self.channel_for(thread_id);
        let thread_id = thread_id.to_string();

        let history = if opts.include_history {
            channel.history.lock().clone()
        } else {
            Vec::new()
        };
        let mut receiver = channel.sender.subscribe();
        let heartbeat_interval = opts.heartbeat_interval;

        Box::pin(stream! {
            for event in history {
                let is_terminal = event.is_workflow_complete();
                yield event;
                if is_terminal {
                    debug!(%thread_id, "subscriber closed during history replay: workflow already complete");
                    return;
                }
            }

            yield Event::connected(thread_id.clone());

            loop {
                match tokio::time::timeout(heartbeat_interval, receiver.recv()).await {
                    Ok(Ok(event)) => {
                        let is_terminal = event.is_workflow_complete();
                        yield event;
                        if is_terminal {
                            debug!(%thread_id, "subscriber closed: workflow_complete observed live");
                            return;
                        }
                    }
                    Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        debug!(%thread_id, skipped, "subscriber lagged; history remains authoritative");
                        continue;
                    }
                    Ok(Err(broadcast::error::RecvError::Closed)) => {
                        debug!(%thread_id, "publisher side closed; ending subscription");
                        return;
                    }
                    Err(_elapsed) => {
                        yield Event::heartbeat();
                    }
                }
            }
        })
    }

    /// Number of events recorded so far for `thread_id` (0 if the thread has
    /// never been published to).
    pub fn history_len(&self, thread_id: &str) -> usize {
        self.threads
            .get(thread_id)
            .map(|c| c.history.lock().len())
            .unwrap_or(0)
    }

    /// Explicitly discard `thread_id`'s history and subscriber channel. The
    /// bus never does this on its own — workflow completion does not imply
    /// the operator is done inspecting the stream.
    pub fn clear_history(&self, thread_id: &str) {
        self.threads.remove(thread_id);
    }

    /// Snapshot of every thread_id the bus currently holds state for.
    pub fn known_threads(&self) -> Vec<String> {
        self.threads.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience for building per-thread heartbeat interval overrides in tests
/// and config wiring, keyed by nothing more than the duration itself.
pub fn subscribe_options(include_history: bool, heartbeat_interval: Duration) -> SubscribeOptions {
    SubscribeOptions {
        include_history,
        heartbeat_interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StageUpdateStatus;
    use futures::StreamExt;

    fn stage_event(thread: &str, stage: &str, status: StageUpdateStatus) -> Event {
        Event::stage_update(thread, stage, status, serde_json::json!({}))
    }

    #[tokio::test]
    async fn late_subscriber_replays_full_history_then_connected() {
        let bus = EventBus::new();
        bus.publish(stage_event("t1", "INTAKE", StageUpdateStatus::Started));
        bus.publish(stage_event("t1", "INTAKE", StageUpdateStatus::Completed));

        let mut stream = bus.subscribe(
            "t1",
            SubscribeOptions {
                include_history: true,
                heartbeat_interval: Duration::from_secs(30),
            },
        );

        let first = stream.next().await.unwrap();
        assert!(matches!(first, Event::StageUpdate { status: StageUpdateStatus::Started, .. }));
        let second = stream.next().await.unwrap();
        assert!(matches!(second, Event::StageUpdate { status: StageUpdateStatus::Completed, .. }));
        let third = stream.next().await.unwrap();
        assert!(matches!(third, Event::Connected { .. }));
    }

    #[tokio::test]
    async fn subscriber_stream_ends_after_workflow_complete_in_history() {
        let bus = EventBus::new();
        bus.publish(stage_event("t1", "INTAKE", StageUpdateStatus::Started));
        bus.publish(stage_event("t1", "NOTIFY", StageUpdateStatus::WorkflowComplete));

        let mut stream = bus.subscribe("t1", SubscribeOptions::default());
        let _ = stream.next().await.unwrap();
        let terminal = stream.next().await.unwrap();
        assert!(terminal.is_workflow_complete());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn live_events_arrive_in_emission_order() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe(
            "t1",
            SubscribeOptions {
                include_history: true,
                heartbeat_interval: Duration::from_secs(30),
            },
        );
        let connected = stream.next().await.unwrap();
        assert!(matches!(connected, Event::Connected { .. }));

        bus.publish(stage_event("t1", "INTAKE", StageUpdateStatus::Started));
        bus.publish(stage_event("t1", "INTAKE", StageUpdateStatus::Completed));

        let first = stream.next().await.unwrap();
        assert!(matches!(first, Event::StageUpdate { status: StageUpdateStatus::Started, .. }));
        let second = stream.next().await.unwrap();
        assert!(matches!(second, Event::StageUpdate { status: StageUpdateStatus::Completed, .. }));
    }

    #[tokio::test]
    async fn heartbeat_emitted_when_no_event_arrives_in_time() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe(
            "t1",
            SubscribeOptions {
                include_history: false,
                heartbeat_interval: Duration::from_millis(10),
            },
        );
        let connected = stream.next().await.unwrap();
        assert!(matches!(connected, Event::Connected { .. }));
        let heartbeat = stream.next().await.unwrap();
        assert!(matches!(heartbeat, Event::Heartbeat { .. }));
        assert_eq!(bus.history_len("t1"), 0);
    }

    #[tokio::test]
    async fn completed_workflow_replay_has_no_live_tail() {
        let bus = EventBus::new();
        bus.publish(stage_event("t1", "COMPLETE", StageUpdateStatus::WorkflowComplete));

        let mut stream = bus.subscribe("t1", SubscribeOptions::default());
        let terminal = stream.next().await.unwrap();
        assert!(terminal.is_workflow_complete());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn clear_history_drops_recorded_events() {
        let bus = EventBus::new();
        bus.publish(stage_event("t1", "INTAKE", StageUpdateStatus::Started));
        assert_eq!(bus.history_len("t1"), 1);
        bus.clear_history("t1");
        assert_eq!(bus.history_len("t1"), 0);
    }
}
