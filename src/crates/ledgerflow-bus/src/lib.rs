//! ledgerflow-bus — per-thread event pub/sub with history replay and heartbeats
//!
//! The Event Bus is a process-wide singleton the Workflow Engine's observer
//! publishes onto and the HTTP layer subscribes from. For each `thread_id` it
//! holds an append-only history buffer and a set of bounded subscriber queues.
//!
//! # Core Types
//!
//! - [`event::Event`] — the wire shape published and replayed.
//! - [`bus::EventBus`] — the singleton: `publish`, `subscribe`, `heartbeat_interval`.
//!
//! # Ordering
//!
//! Within a `thread_id`, a subscriber sees the full current history (in
//! emission order), then a synthetic [`event::Event::Connected`], then every
//! subsequent live event in emission order. Across `thread_id`s there is no
//! ordering guarantee. See [`bus::EventBus::subscribe`].

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventStream, SubscribeOptions};
pub use event::{Event, LogLevel, StageUpdateStatus, ToolCallStatus, ToolServer};
