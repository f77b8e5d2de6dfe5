//! Stage identity and the `(state) -> state_delta` execution contract.
//!
//! The workflow graph has exactly twelve named stages plus the `MANUAL_HANDOFF` terminal sink.
//! [`StageId`] is the closed set of valid positions a checkpoint's `position_node` can name;
//! [`StageExecutor`] is the trait every stage implementation (in `ledgerflow-stages`) satisfies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::WorkflowState;

/// One of the twelve pipeline stages, or the manual-handoff sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageId {
    Intake,
    Understand,
    Prepare,
    Retrieve,
    MatchTwoWay,
    CheckpointHitl,
    HitlDecision,
    Reconcile,
    Approve,
    Posting,
    Notify,
    Complete,
    ManualHandoff,
}

impl StageId {
    /// Every stage, in canonical declaration order. Useful for registration checks and for the
    /// `GET /workflow/stages` endpoint.
    pub const ALL: [StageId; 13] = [
        StageId::Intake,
        StageId::Understand,
        StageId::Prepare,
        StageId::Retrieve,
        StageId::MatchTwoWay,
        StageId::CheckpointHitl,
        StageId::HitlDecision,
        StageId::Reconcile,
        StageId::Approve,
        StageId::Posting,
        StageId::Notify,
        StageId::Complete,
        StageId::ManualHandoff,
    ];

    /// The twelve pipeline stages in execution order, excluding the `MANUAL_HANDOFF` terminal
    /// sink — what `GET /workflow/stages` (spec §6.1) advertises as the pipeline's shape.
    pub const PIPELINE: [StageId; 12] = [
        StageId::Intake,
        StageId::Understand,
        StageId::Prepare,
        StageId::Retrieve,
        StageId::MatchTwoWay,
        StageId::CheckpointHitl,
        StageId::HitlDecision,
        StageId::Reconcile,
        StageId::Approve,
        StageId::Posting,
        StageId::Notify,
        StageId::Complete,
    ];

    /// The upper-snake-case name used in checkpoints, events, and the HTTP API.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Intake => "INTAKE",
            StageId::Understand => "UNDERSTAND",
            StageId::Prepare => "PREPARE",
            StageId::Retrieve => "RETRIEVE",
            StageId::MatchTwoWay => "MATCH_TWO_WAY",
            StageId::CheckpointHitl => "CHECKPOINT_HITL",
            StageId::HitlDecision => "HITL_DECISION",
            StageId::Reconcile => "RECONCILE",
            StageId::Approve => "APPROVE",
            StageId::Posting => "POSTING",
            StageId::Notify => "NOTIFY",
            StageId::Complete => "COMPLETE",
            StageId::ManualHandoff => "MANUAL_HANDOFF",
        }
    }

    /// Parse a stage name as written in a checkpoint's `position_node`.
    pub fn from_str(name: &str) -> Option<StageId> {
        StageId::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// True for the two terminal sinks (`COMPLETE`, `MANUAL_HANDOFF`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageId::Complete | StageId::ManualHandoff)
    }
}

/// What a stage executor produced from one call.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    /// Normal completion: a partial state update to merge.
    Delta(crate::state::StateDelta),
    /// The node is suspending mid-execution, awaiting an externally delivered value.
    ///
    /// Only `HITL_DECISION` ever returns this, and only on its first entry (when
    /// `state.human_decision` is not yet set). `payload` is a small diagnostic value describing
    /// what is being waited on — never the whole state.
    Suspend(serde_json::Value),
}

/// The contract every stage implements: read an immutable state snapshot, produce a delta (or a
/// suspension request).
///
/// Implementations must not mutate external systems in a way that can't tolerate the workflow
/// retrying the *next* node after a resume — see the idempotence-of-re-entry rule on
/// `HITL_DECISION` re-entry. Implementations should treat their own tool-call failures as soft
/// failures (deterministic local fallback, annotate `error_log`) rather than returning `Err`;
/// returning `Err` from [`run`](Self::run) is terminal for the whole workflow.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Execute this stage against `state`, returning a delta or a suspension request.
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_as_str_and_from_str() {
        for stage in StageId::ALL {
            assert_eq!(StageId::from_str(stage.as_str()), Some(stage));
        }
    }

    #[test]
    fn only_complete_and_manual_handoff_are_terminal() {
        for stage in StageId::ALL {
            let expected = matches!(stage, StageId::Complete | StageId::ManualHandoff);
            assert_eq!(stage.is_terminal(), expected);
        }
    }

    #[test]
    fn from_str_rejects_unknown_names() {
        assert!(StageId::from_str("NOT_A_STAGE").is_none());
    }
}
