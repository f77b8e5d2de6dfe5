//! `COMPLETE`: assemble the terminal payload for a successfully processed invoice.

use async_trait::async_trait;

use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, StateDelta, WorkflowState, WorkflowStatus};

#[derive(Debug, Default, Clone, Copy)]
pub struct CompleteStage;

#[async_trait]
impl StageExecutor for CompleteStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let invoice_id = state.invoice_payload.get("invoice_id").and_then(|v| v.as_str()).unwrap_or("UNKNOWN");
        let required_hitl = state.hitl_checkpoint_id.is_some();

        let final_payload = serde_json::json!({
            "invoice_id": invoice_id,
            "approval": {
                "status": state.approval_status,
                "approver_id": state.approver_id,
            },
            "erp": {
                "posted": state.posted,
                "transaction_id": state.erp_txn_id,
                "scheduled_payment_id": state.scheduled_payment_id,
            },
            "processing": {
                "required_hitl": required_hitl,
                "match_score": state.match_score,
            },
            "hitl_decision": state.human_decision.map(|d| format!("{d:?}").to_uppercase()),
            "notify": {
                "status": state.notify_status,
                "parties": state.notified_parties,
            },
        });

        let mut delta = StateDelta::new()
            .with_current_stage("COMPLETE")
            .with_status(WorkflowStatus::Completed)
            .with_audit(AuditEntry::new("COMPLETE", format!("invoice {invoice_id} fully processed")));
        delta.final_payload = Some(Some(final_payload));

        Ok(NodeOutcome::Delta(delta))
    }
}
