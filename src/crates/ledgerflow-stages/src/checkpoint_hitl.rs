//! `CHECKPOINT_HITL`: externalize the paused invoice as a pending review record.
//!
//! The [`ledgerflow_checkpoint::Checkpoint`] row this node's transition produces doesn't exist
//! yet when this stage runs — the engine writes it only after the node returns (and the one
//! immediately before suspension is written by `HITL_DECISION`, one node later). So the id this
//! stage mints and stores as `hitl_checkpoint_id` is a correlation token for this HITL episode,
//! not a foreign key into the checkpoint store; it doubles as the review record's primary key so
//! `GET /human-review/{checkpoint_id}` can look it up directly.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use ledgerflow_checkpoint::{PendingReviewRecord, ReviewQueue};
use ledgerflow_core::error::{EngineError, Result};
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, StateDelta, WorkflowState};

pub struct CheckpointHitlStage {
    review_queue: Arc<dyn ReviewQueue>,
    /// Base URL operators use to open a review, e.g. `https://review.example.com`.
    review_base_url: String,
}

impl CheckpointHitlStage {
    pub fn new(review_queue: Arc<dyn ReviewQueue>, review_base_url: impl Into<String>) -> Self {
        Self {
            review_queue,
            review_base_url: review_base_url.into(),
        }
    }
}

fn reason_for_hold(state: &WorkflowState) -> String {
    match state.match_result {
        Some(ledgerflow_core::state::MatchResult::Failed) => "two-way match failed outright".to_string(),
        _ => format!(
            "match score {:.3} below threshold",
            state.match_score.unwrap_or(0.0)
        ),
    }
}

#[async_trait]
impl StageExecutor for CheckpointHitlStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let checkpoint_id = Uuid::new_v4().to_string();
        let invoice_id = state
            .invoice_payload
            .get("invoice_id")
            .and_then(|v| v.as_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        let vendor_name = state
            .vendor_profile
            .as_ref()
            .map(|p| p.normalized_name.clone())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let amount = state.invoice_payload.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let currency = state
            .invoice_payload
            .get("currency")
            .and_then(|v| v.as_str())
            .unwrap_or("USD")
            .to_string();
        let match_score = state.match_score.unwrap_or(0.0);
        let match_evidence = state
            .match_evidence
            .as_ref()
            .map(|e| serde_json::to_value(e).unwrap_or(serde_json::Value::Null))
            .unwrap_or(serde_json::Value::Null);
        let reason = reason_for_hold(state);
        let review_url = format!("{}/human-review/{checkpoint_id}", self.review_base_url);

        let mut record = PendingReviewRecord::new(
            state.thread_id.clone(),
            checkpoint_id.clone(),
            invoice_id,
            vendor_name,
            amount,
            currency,
            match_score,
            match_evidence,
            reason.clone(),
            review_url.clone(),
        );
        record.review_id = checkpoint_id.clone();

        self.review_queue
            .create(record)
            .await
            .map_err(|err| EngineError::stage_failed("CHECKPOINT_HITL", err.to_string()))?;

        let delta = StateDelta::new()
            .with_current_stage("CHECKPOINT_HITL")
            .with_audit(AuditEntry::new("CHECKPOINT_HITL", format!("paused for review: {reason}")));
        let mut delta = delta;
        delta.hitl_checkpoint_id = Some(Some(checkpoint_id));
        delta.review_url = Some(Some(review_url));
        delta.paused_reason = Some(Some(reason));

        Ok(NodeOutcome::Delta(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerflow_checkpoint::InMemoryReviewQueue;
    use ledgerflow_core::state::MatchResult;

    #[tokio::test]
    async fn writes_a_pending_review_record_and_sets_checkpoint_fields() {
        let queue: Arc<dyn ReviewQueue> = Arc::new(InMemoryReviewQueue::new());
        let stage = CheckpointHitlStage::new(queue.clone(), "https://review.example.com");

        let mut state = WorkflowState::new("t1".to_string());
        state.invoice_payload = serde_json::json!({"invoice_id": "INV-C", "amount": 25_000.0, "currency": "USD"});
        state.match_score = Some(0.6);
        state.match_result = Some(MatchResult::Failed);

        let NodeOutcome::Delta(delta) = stage.run(&state).await.unwrap() else {
            panic!("expected a delta");
        };
        let checkpoint_id = delta.hitl_checkpoint_id.unwrap().unwrap();

        let record = queue.get(&checkpoint_id).await.unwrap().unwrap();
        assert_eq!(record.thread_id, "t1");
        assert_eq!(record.invoice_id, "INV-C");
        assert_eq!(record.status, ledgerflow_checkpoint::ReviewStatus::Pending);
    }
}
