//! Stage executors for the invoice processing workflow.
//!
//! Each module implements `ledgerflow_core::stage::StageExecutor` for one node of
//! the fixed twelve-stage DAG plus its `MANUAL_HANDOFF` terminal. Stages that call
//! out to Bigtool hold their own `Arc<BigtoolOrchestrator>` and an optional
//! `Arc<EventBus>` for `tool_call` telemetry; where the workflow specifies an exact
//! algorithm (matching, policy, accounting) the stage computes it locally and uses
//! the tool call only for audit purposes.

pub mod approve;
pub mod checkpoint_hitl;
pub mod complete;
pub mod config;
pub mod hitl_decision;
pub mod intake;
pub mod manual_handoff;
pub mod match_two_way;
pub mod notify;
pub mod posting;
pub mod prepare;
pub mod reconcile;
pub mod retrieve;
pub mod support;
pub mod understand;

pub use approve::{evaluate_policy, ApproveStage};
pub use checkpoint_hitl::CheckpointHitlStage;
pub use complete::CompleteStage;
pub use config::StageConfig;
pub use hitl_decision::HitlDecisionStage;
pub use intake::IntakeStage;
pub use manual_handoff::ManualHandoffStage;
pub use match_two_way::{compute_match, MatchTwoWayStage};
pub use notify::NotifyStage;
pub use posting::PostingStage;
pub use prepare::PrepareStage;
pub use reconcile::ReconcileStage;
pub use retrieve::RetrieveStage;
pub use understand::UnderstandStage;
