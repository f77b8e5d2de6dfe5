//! Checkpoint record: the unit of durability for a running workflow.
//!
//! A checkpoint is `(thread_id, version, serialized_state, position_node, pending_interrupt?)` —
//! an opaque snapshot of the workflow state plus enough scheduling metadata to resume execution
//! at exactly the right node. One is written after every stage completes, so a crash or a
//! deliberate interrupt never loses more than the in-flight node's work.
//!
//! Checkpoints are keyed by `thread_id` and form a per-thread version chain: `version` increases
//! by one with every `put`, and `list`/`latest` walk that chain without reaching across threads.
//!
//! # Example
//!
//! ```rust
//! use ledgerflow_checkpoint::Checkpoint;
//! use serde_json::json;
//!
//! let checkpoint = Checkpoint::new(
//!     "thread-123".to_string(),
//!     1,
//!     json!({"status": "RUNNING"}),
//!     "INTAKE".to_string(),
//! );
//! assert_eq!(checkpoint.version, 1);
//! assert!(checkpoint.pending_interrupt.is_none());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single checkpoint row.
pub type CheckpointId = String;

/// Marker left on a checkpoint when the engine suspends mid-node waiting for an external value.
///
/// Only ever present on the checkpoint written immediately before a suspension; cleared once the
/// workflow resumes past the node that raised it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingInterrupt {
    /// The node that called the interrupt primitive and is awaiting a value.
    pub node: String,
    /// Diagnostic payload describing what the interrupt is waiting on (never secrets).
    pub payload: serde_json::Value,
}

impl PendingInterrupt {
    /// Create a pending interrupt marker for `node`.
    pub fn new(node: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            node: node.into(),
            payload,
        }
    }
}

/// A single durable snapshot of a workflow's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique id of this checkpoint row.
    pub id: CheckpointId,
    /// The workflow thread this checkpoint belongs to.
    pub thread_id: String,
    /// 1-based position of this checkpoint in the thread's version chain.
    pub version: u64,
    /// When this checkpoint was written.
    pub ts: DateTime<Utc>,
    /// Opaque serialized workflow state at the time of writing.
    pub serialized_state: serde_json::Value,
    /// The node the engine should resume at if this is the latest checkpoint.
    pub position_node: String,
    /// Set when `position_node` is suspended awaiting an externally delivered value.
    pub pending_interrupt: Option<PendingInterrupt>,
}

impl Checkpoint {
    /// Build a new checkpoint. `id` is freshly generated.
    pub fn new(
        thread_id: String,
        version: u64,
        serialized_state: serde_json::Value,
        position_node: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id,
            version,
            ts: Utc::now(),
            serialized_state,
            position_node,
            pending_interrupt: None,
        }
    }

    /// Attach a pending-interrupt marker to this checkpoint.
    pub fn with_pending_interrupt(mut self, interrupt: PendingInterrupt) -> Self {
        self.pending_interrupt = Some(interrupt);
        self
    }

    /// True if resuming this checkpoint means re-entering a suspended node with a value.
    pub fn is_interrupted(&self) -> bool {
        self.pending_interrupt.is_some()
    }
}

/// Identifies which checkpoint a caller wants: the latest one for a thread, or a specific id.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckpointConfig {
    /// Thread whose checkpoints are being addressed.
    pub thread_id: Option<String>,
    /// Specific checkpoint id, or `None` for "latest".
    pub checkpoint_id: Option<CheckpointId>,
}

impl CheckpointConfig {
    /// Address the latest checkpoint of `thread_id`.
    pub fn latest(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            checkpoint_id: None,
        }
    }

    /// Address a specific checkpoint by id within `thread_id`.
    pub fn at(thread_id: impl Into<String>, checkpoint_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            checkpoint_id: Some(checkpoint_id.into()),
        }
    }
}

/// A checkpoint together with the config that located it.
#[derive(Debug, Clone)]
pub struct CheckpointTuple {
    /// The config used to retrieve this checkpoint.
    pub config: CheckpointConfig,
    /// The checkpoint itself.
    pub checkpoint: Checkpoint,
}

impl CheckpointTuple {
    /// Pair a checkpoint with the config that produced it.
    pub fn new(config: CheckpointConfig, checkpoint: Checkpoint) -> Self {
        Self { config, checkpoint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checkpoint_has_no_pending_interrupt() {
        let cp = Checkpoint::new(
            "t1".to_string(),
            1,
            serde_json::json!({}),
            "INTAKE".to_string(),
        );
        assert!(!cp.is_interrupted());
        assert_eq!(cp.version, 1);
    }

    #[test]
    fn pending_interrupt_round_trips() {
        let cp = Checkpoint::new(
            "t1".to_string(),
            3,
            serde_json::json!({}),
            "HITL_DECISION".to_string(),
        )
        .with_pending_interrupt(PendingInterrupt::new(
            "HITL_DECISION",
            serde_json::json!({"reason": "low match score"}),
        ));
        assert!(cp.is_interrupted());
        assert_eq!(cp.pending_interrupt.unwrap().node, "HITL_DECISION");
    }

    #[test]
    fn config_latest_vs_at() {
        let latest = CheckpointConfig::latest("t1");
        assert!(latest.checkpoint_id.is_none());

        let at = CheckpointConfig::at("t1", "cp-1");
        assert_eq!(at.checkpoint_id, Some("cp-1".to_string()));
    }
}
