//! `MANUAL_HANDOFF`: assemble the rejection payload for an invoice a reviewer declined to accept.

use async_trait::async_trait;

use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, StateDelta, WorkflowState, WorkflowStatus};

#[derive(Debug, Default, Clone, Copy)]
pub struct ManualHandoffStage;

#[async_trait]
impl StageExecutor for ManualHandoffStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let invoice_id = state.invoice_payload.get("invoice_id").and_then(|v| v.as_str()).unwrap_or("UNKNOWN");

        let final_payload = serde_json::json!({
            "invoice_id": invoice_id,
            "status": "REQUIRES_MANUAL_HANDLING",
            "reviewer_id": state.reviewer_id,
            "reviewer_notes": state.reviewer_notes,
            "decision": "REJECT",
            "reason": state.paused_reason,
        });

        let delta = StateDelta::new()
            .with_current_stage("MANUAL_HANDOFF")
            .with_status(WorkflowStatus::RequiresManualHandling)
            .with_audit(AuditEntry::new(
                "MANUAL_HANDOFF",
                format!("invoice {invoice_id} routed to manual handling"),
            ));
        let mut delta = delta;
        delta.final_payload = Some(Some(final_payload));

        Ok(NodeOutcome::Delta(delta))
    }
}
