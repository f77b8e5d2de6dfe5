//! # ledgerflow-core — the invoice workflow engine
//!
//! `ledgerflow-core` drives one fixed, loop-free twelve-stage pipeline from `INTAKE` through
//! `COMPLETE` (or `MANUAL_HANDOFF`), with a single human-in-the-loop suspension point at
//! `HITL_DECISION`.
//!
//! ## Core Concepts
//!
//! ### 1. `WorkflowState` and `StateDelta`
//!
//! [`state::WorkflowState`] is the single heterogeneous record every stage reads and writes.
//! Stages never mutate it directly — they return a [`state::StateDelta`], and the engine folds
//! it in with a merge rule fixed per field: append-only for `audit_log`/`error_log`,
//! last-writer-wins for everything else.
//!
//! ### 2. The fixed topology
//!
//! [`graph::next_stage`] encodes the entire routing logic of the pipeline: an unconditional
//! linear prefix, one branch on the match score at `MATCH_TWO_WAY`, and one branch on the
//! reviewer's decision at `HITL_DECISION`. There is no generic graph-building API — the topology
//! is the same for every workflow thread.
//!
//! ### 3. Checkpointing
//!
//! The engine calls out to a [`ledgerflow_checkpoint::CheckpointSaver`] after every stage
//! completes, so a crash or a deliberate interrupt never loses more than the in-flight node's
//! work. See [`ledgerflow_checkpoint`] for the storage-side contract.
//!
//! ### 4. Interrupt / resume
//!
//! `HITL_DECISION` is the pipeline's one suspension point. A stage that returns
//! [`stage::NodeOutcome::Suspend`] causes the engine to persist a pending-interrupt marker and
//! return with `status = PAUSED`, without emitting `workflow_complete`. [`engine::Engine::resume`]
//! restores that checkpoint, merges the reviewer's decision, and re-enters the same node.
//!
//! ### 5. Observability
//!
//! The engine emits lifecycle notifications through [`observer::EngineObserver`] — a seam with
//! zero knowledge of HTTP, SSE, or subscriber queues. The concrete implementation backed by the
//! Event Bus lives in the API crate, which depends on both this crate and the bus.

pub mod engine;
pub mod error;
pub mod graph;
pub mod observer;
pub mod stage;
pub mod state;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use graph::next_stage;
pub use observer::{EngineObserver, NoopObserver};
pub use stage::{NodeOutcome, StageExecutor, StageId};
pub use state::{
    AccountingEntry, AuditEntry, EntrySide, HumanDecision, MatchEvidence, MatchResult,
    ParsedInvoice, StateDelta, VendorProfile, WorkflowState, WorkflowStatus,
};
