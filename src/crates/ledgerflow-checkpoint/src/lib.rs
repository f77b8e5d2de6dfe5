//! Checkpoint storage for the Workflow Engine.
//!
//! A checkpoint is `(thread_id, version, serialized_state, position_node, pending_interrupt?)`:
//! an opaque snapshot written after every stage completes, keyed by `thread_id`, forming a
//! per-thread version chain. It is the single durability primitive that lets a workflow crash,
//! be deliberately suspended for human review, or be resumed days later, and pick up exactly
//! where it left off.
//!
//! # Core Types
//!
//! - [`Checkpoint`] / [`CheckpointConfig`] / [`CheckpointTuple`] - the checkpoint record and the
//!   ways to address it (latest for a thread, or a specific id).
//! - [`PendingInterrupt`] - the marker recorded when a node suspends mid-execution.
//! - [`CheckpointSaver`] - the storage trait the Workflow Engine depends on.
//! - [`InMemoryCheckpointSaver`] - reference in-memory implementation, suitable for tests and
//!   single-process deployments.

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod review;
pub mod traits;

pub use checkpoint::{Checkpoint, CheckpointConfig, CheckpointId, CheckpointTuple, PendingInterrupt};
pub use error::{CheckpointError, Result};
pub use memory::InMemoryCheckpointSaver;
pub use review::{InMemoryReviewQueue, PendingReviewRecord, ReviewDecision, ReviewQueue, ReviewStatus};
pub use traits::{CheckpointSaver, CheckpointStream};
