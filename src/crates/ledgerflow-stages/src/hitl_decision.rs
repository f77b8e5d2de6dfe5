//! `HITL_DECISION`: the pipeline's one suspension point.
//!
//! Per spec §9's split-entry-point design note, this is modeled as two branches rather than a
//! stack-swapping coroutine: first entry (`human_decision` unset) suspends; a resume re-entry
//! (the engine having already merged the reviewer's decision into state before calling back in)
//! records it and returns a normal delta for `afterHITL` to route on.

use async_trait::async_trait;

use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, StateDelta, WorkflowState};

#[derive(Debug, Default, Clone, Copy)]
pub struct HitlDecisionStage;

#[async_trait]
impl StageExecutor for HitlDecisionStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        match state.human_decision {
            None => Ok(NodeOutcome::Suspend(serde_json::json!({
                "reason": state.paused_reason.clone().unwrap_or_default(),
                "review_url": state.review_url.clone(),
            }))),
            Some(decision) => {
                let delta = StateDelta::new().with_current_stage("HITL_DECISION").with_audit(
                    AuditEntry::new(
                        "HITL_DECISION",
                        format!(
                            "reviewer {} decided {decision:?}",
                            state.reviewer_id.clone().unwrap_or_else(|| "UNKNOWN".to_string())
                        ),
                    ),
                );
                Ok(NodeOutcome::Delta(delta))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerflow_core::state::HumanDecision;

    #[tokio::test]
    async fn first_entry_suspends() {
        let stage = HitlDecisionStage;
        let state = WorkflowState::new("t1".to_string());
        let outcome = stage.run(&state).await.unwrap();
        assert!(matches!(outcome, NodeOutcome::Suspend(_)));
    }

    #[tokio::test]
    async fn re_entry_with_decision_returns_a_delta() {
        let stage = HitlDecisionStage;
        let mut state = WorkflowState::new("t1".to_string());
        state.human_decision = Some(HumanDecision::Accept);
        state.reviewer_id = Some("rev-1".to_string());

        let outcome = stage.run(&state).await.unwrap();
        assert!(matches!(outcome, NodeOutcome::Delta(_)));
    }
}
