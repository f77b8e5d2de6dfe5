//! Error types for workflow graph construction and execution.
//!
//! All errors that the engine, the stage-execution contract, or the interrupt/resume machinery
//! can raise live on [`EngineError`]. It uses `thiserror` for `std::error::Error` and composes
//! errors from [`ledgerflow_checkpoint`] via `#[from]`.
//!
//! # Error Categories
//!
//! - **Construction**: [`EngineError::Validation`] - the fixed topology was misconfigured.
//! - **Execution**: [`EngineError::StageFailed`] - a stage's executor returned an error; this is
//!   terminal for the workflow per the failure-semantics contract (no automatic retries).
//! - **State**: [`EngineError::State`] - a state delta could not be merged.
//! - **Persistence**: [`EngineError::Checkpoint`] - wraps [`ledgerflow_checkpoint::CheckpointError`].
//! - **Serialization**: [`EngineError::Serialization`].
//!
//! # Example
//!
//! ```rust
//! use ledgerflow_core::error::EngineError;
//!
//! let err = EngineError::stage_failed("MATCH_TWO_WAY", "erp_connector unreachable");
//! match err {
//!     EngineError::StageFailed { stage, error } => {
//!         assert_eq!(stage, "MATCH_TWO_WAY");
//!         assert!(error.contains("unreachable"));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use thiserror::Error;

/// Convenience result type using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// All errors the workflow engine can raise.
///
/// A [`EngineError::StageFailed`] is always terminal for the affected workflow: the engine
/// routes to `END`, sets `status = FAILED`, and emits a `workflow_complete` event. It is never
/// retried automatically; the calling integrator owns retry policy, if any.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The fixed topology was misconfigured (unknown node referenced by an edge or a routing
    /// predicate, missing entry point, or a cycle in what must be a loop-free graph).
    #[error("graph validation failed: {0}")]
    Validation(String),

    /// A stage executor returned an error during its own execution (not a soft/tool failure,
    /// which stages absorb locally and continue past). Terminal for the workflow.
    #[error("stage '{stage}' failed: {error}")]
    StageFailed {
        /// Name of the stage that failed.
        stage: String,
        /// Error message from the stage executor.
        error: String,
    },

    /// A state delta could not be merged into the current [`crate::state::WorkflowState`].
    #[error("state merge error: {0}")]
    State(String),

    /// Checkpoint persistence failed. Wraps [`ledgerflow_checkpoint::CheckpointError`].
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] ledgerflow_checkpoint::CheckpointError),

    /// The engine was asked to resume a thread that is not currently `PAUSED`.
    #[error("thread '{0}' is not paused; resume is only valid from PAUSED")]
    NotPaused(String),

    /// Resume was requested for a thread with no recorded pending interrupt.
    #[error("thread '{0}' has no pending interrupt to resume")]
    NoPendingInterrupt(String),

    /// JSON (de)serialization of workflow state failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Application-defined error not covered by the variants above.
    #[error("{0}")]
    Custom(String),
}

impl EngineError {
    /// Build a [`EngineError::StageFailed`].
    pub fn stage_failed(stage: impl Into<String>, error: impl Into<String>) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            error: error.into(),
        }
    }
}
