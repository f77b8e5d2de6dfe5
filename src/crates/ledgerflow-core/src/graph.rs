//! The fixed workflow topology and its two routing predicates.
//!
//! ```text
//! START -> INTAKE -> UNDERSTAND -> PREPARE -> RETRIEVE -> MATCH_TWO_WAY
//!                                                             |
//!                               (match_score >= threshold AND match_result = MATCHED)
//!                                                             |
//!                                                    YES -----+----- NO
//!                                                    |        |
//!                                                    |   CHECKPOINT_HITL
//!                                                    |        |
//!                                                    |   HITL_DECISION  <- interrupt point
//!                                                    |        |
//!                                                    |   (human_decision)
//!                                                    |        |
//!                                                    |   ACCEPT --- REJECT -- MANUAL_HANDOFF -> END
//!                                                    v        |
//!                                                 RECONCILE <-+
//!                                                    |
//!                                                APPROVE -> POSTING -> NOTIFY -> COMPLETE -> END
//! ```
//!
//! The graph has exactly one entry, two terminal sinks, and no cycles. [`next_stage`] is the
//! single function the engine calls to decide where to go after a stage completes
//! successfully; it has no side effects and never looks beyond the current state.

use crate::stage::StageId;
use crate::state::{HumanDecision, MatchResult, WorkflowState};

/// `shouldCheckpoint(s)`: route to `CHECKPOINT_HITL` unless the match cleared threshold.
fn should_checkpoint(state: &WorkflowState, match_threshold: f64) -> bool {
    matches!(state.match_result, Some(MatchResult::Failed))
        || state.match_score.map(|score| score < match_threshold).unwrap_or(true)
}

/// `afterHITL(s)`: route on the reviewer's decision.
fn after_hitl(state: &WorkflowState) -> StageId {
    match state.human_decision {
        Some(HumanDecision::Accept) => StageId::Reconcile,
        _ => StageId::ManualHandoff,
    }
}

/// The stage to execute after `current` completes successfully, or `None` if `current` is a
/// terminal sink. `match_threshold` parameterizes [`should_checkpoint`]; it comes from engine
/// configuration, not from the state record itself.
pub fn next_stage(current: StageId, state: &WorkflowState, match_threshold: f64) -> Option<StageId> {
    match current {
        StageId::Intake => Some(StageId::Understand),
        StageId::Understand => Some(StageId::Prepare),
        StageId::Prepare => Some(StageId::Retrieve),
        StageId::Retrieve => Some(StageId::MatchTwoWay),
        StageId::MatchTwoWay => Some(if should_checkpoint(state, match_threshold) {
            StageId::CheckpointHitl
        } else {
            StageId::Reconcile
        }),
        StageId::CheckpointHitl => Some(StageId::HitlDecision),
        StageId::HitlDecision => Some(after_hitl(state)),
        StageId::Reconcile => Some(StageId::Approve),
        StageId::Approve => Some(StageId::Posting),
        StageId::Posting => Some(StageId::Notify),
        StageId::Notify => Some(StageId::Complete),
        StageId::Complete | StageId::ManualHandoff => None,
    }
}
