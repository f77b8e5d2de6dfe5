//! Checkpoint storage trait for custom backend implementations.
//!
//! [`CheckpointSaver`] is the sole abstraction the Workflow Engine uses to persist and recover
//! workflow state. Implementations back it with whatever storage is appropriate — in-process
//! memory for tests ([`crate::InMemoryCheckpointSaver`]), SQLite/Postgres for a real deployment.
//! Swapping the backend never changes engine semantics: every node completion writes exactly one
//! checkpoint, and resume always starts from the latest one for a thread.
//!
//! # Concurrency
//!
//! Per the durability contract, writes for the same `thread_id` must never interleave: a correct
//! implementation serializes `put` calls per thread (a per-key lock, or an equivalent transaction
//! boundary) while still allowing unrelated threads to proceed concurrently.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::checkpoint::{Checkpoint, CheckpointConfig, CheckpointTuple, PendingInterrupt};
use crate::error::Result;

/// A stream of checkpoint query results, oldest or newest first depending on the call.
pub type CheckpointStream =
    Pin<Box<dyn Stream<Item = Result<CheckpointTuple>> + Send>>;

/// Storage backend for workflow checkpoints.
///
/// All methods are keyed by `thread_id`; there is no cross-thread querying. Implementations must
/// be `Send + Sync` since the engine holds a shared handle across concurrently running workflows.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Fetch the latest checkpoint for `thread_id`, or a specific one if `config.checkpoint_id`
    /// is set. Returns `Ok(None)` if the thread has never been checkpointed (or the specific id
    /// does not exist).
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>>;

    /// List all checkpoints for `thread_id`, most recent first. Used for diagnostics and
    /// debugging; the engine itself only ever needs [`get_tuple`](Self::get_tuple).
    async fn list(&self, thread_id: &str) -> Result<CheckpointStream>;

    /// Append the next checkpoint in `thread_id`'s version chain.
    ///
    /// `version` is assigned by the implementation (one greater than the previous checkpoint for
    /// this thread, or `1` for the first). Returns the checkpoint as written, including its
    /// assigned id and version.
    async fn put(
        &self,
        thread_id: &str,
        serialized_state: serde_json::Value,
        position_node: String,
        pending_interrupt: Option<PendingInterrupt>,
    ) -> Result<Checkpoint>;

    /// Delete every checkpoint associated with `thread_id`.
    ///
    /// The default implementation is a no-op; backends that support cleanup should override it.
    /// Workflow completion does not call this automatically — checkpoints are retained for audit
    /// and time-travel purposes per thread until an operator explicitly prunes them.
    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let _ = thread_id;
        Ok(())
    }
}
