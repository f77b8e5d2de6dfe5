//! The engine's notification seam.
//!
//! The Workflow Engine itself knows nothing about Server-Sent Events, subscriber queues, or HTTP
//! — it only knows that every node transition must be *announced*. [`EngineObserver`] is that
//! seam: `ledgerflow-api` wires a concrete implementation backed by the Event Bus at startup, and
//! the engine calls it exactly per the execution contract (started, then completed-or-failed;
//! `workflow_complete` exactly once, last, for any thread that doesn't end by suspending).

use async_trait::async_trait;

use crate::state::WorkflowStatus;

/// Receives the engine's lifecycle notifications for a single stage transition.
#[async_trait]
pub trait EngineObserver: Send + Sync {
    /// A stage has begun executing.
    async fn stage_started(&self, thread_id: &str, stage: &str);

    /// A stage completed successfully. `data` is a small diagnostic payload, never the full
    /// state.
    async fn stage_completed(&self, thread_id: &str, stage: &str, data: serde_json::Value);

    /// A stage raised an uncaught error. Always followed by `workflow_complete` with
    /// `WorkflowStatus::Failed`.
    async fn stage_failed(&self, thread_id: &str, stage: &str, error: &str);

    /// The workflow has reached a terminal state (`COMPLETED`, `FAILED`, or
    /// `REQUIRES_MANUAL_HANDLING`). Never emitted for a thread that merely suspended at
    /// `HITL_DECISION` — that thread is still `PAUSED`, not terminal.
    async fn workflow_complete(&self, thread_id: &str, status: WorkflowStatus);
}

/// An observer that discards every notification. Useful for tests that only care about the
/// resulting [`crate::state::WorkflowState`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl EngineObserver for NoopObserver {
    async fn stage_started(&self, _thread_id: &str, _stage: &str) {}
    async fn stage_completed(&self, _thread_id: &str, _stage: &str, _data: serde_json::Value) {}
    async fn stage_failed(&self, _thread_id: &str, _stage: &str, _error: &str) {}
    async fn workflow_complete(&self, _thread_id: &str, _status: WorkflowStatus) {}
}
