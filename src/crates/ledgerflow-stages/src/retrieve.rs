//! `RETRIEVE`: fetch purchase orders, goods-receipt notes, and vendor history.
//!
//! The ERP connector itself is out of scope (spec §1). This stage's local fallback — used
//! whenever the ATLAS call doesn't come back with usable data, which is always true without a
//! real ERP server deployed — is to read an optional `po_override` object off the invoice
//! payload and use it verbatim as the matched PO; absent that, it echoes the invoice's own
//! amount and line items back as a perfectly matching PO. This is what lets integration tests
//! drive every matching scenario in spec §8 purely through the submitted payload.

use std::sync::Arc;

use async_trait::async_trait;

use ledgerflow_bus::EventBus;
use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, StateDelta, WorkflowState};
use ledgerflow_tools::{BigtoolOrchestrator, Capability};

use crate::support::{call_tool, selection_entry};

pub struct RetrieveStage {
    tools: Arc<BigtoolOrchestrator>,
    bus: Option<Arc<EventBus>>,
}

impl RetrieveStage {
    pub fn new(tools: Arc<BigtoolOrchestrator>, bus: Option<Arc<EventBus>>) -> Self {
        Self { tools, bus }
    }
}

fn default_po(payload: &serde_json::Value) -> serde_json::Value {
    let amount = payload.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let line_items = payload.get("line_items").cloned().unwrap_or_else(|| serde_json::json!([]));
    serde_json::json!({
        "po_number": format!("PO-ECHO-{}", payload.get("invoice_id").and_then(|v| v.as_str()).unwrap_or("UNKNOWN")),
        "total_amount": amount,
        "line_items": line_items,
    })
}

#[async_trait]
impl StageExecutor for RetrieveStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let payload = &state.invoice_payload;

        let erp_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "RETRIEVE",
            Capability::ErpConnector,
            "fetch matching purchase orders and goods-receipt notes",
            payload.clone(),
        )
        .await;

        let matched_po = payload
            .get("po_override")
            .cloned()
            .unwrap_or_else(|| default_po(payload));

        let mut bigtool_selections = std::collections::HashMap::new();
        let (erp_stage, erp_tool) = selection_entry("RETRIEVE.erp_connector", &erp_outcome);
        bigtool_selections.insert(erp_stage, erp_tool);

        let mut delta = StateDelta::new()
            .with_current_stage("RETRIEVE")
            .with_audit(AuditEntry::new("RETRIEVE", "fetched purchase order for matching"));
        delta.matched_pos = Some(vec![matched_po]);
        delta.matched_grns = Some(Vec::new());
        delta.history = Some(Vec::new());
        delta.bigtool_selections = Some(bigtool_selections);

        if !erp_outcome.is_usable() {
            delta = delta.with_error_log(format!(
                "RETRIEVE: {} call did not succeed, used local PO fallback",
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

    fn unreachable_tools() -> Arc<BigtoolOrchestrator> {
        Arc::new(BigtoolOrchestrator::new(
            ToolConfig {
                atlas_url: "http://127.0.0.1:1".to_string(),
                use_description_discovery: false,
                ..ToolConfig::default()
            },
            Arc::new(ledgerflow_tools::NullToolSelector),
        ))
    }

    #[tokio::test]
    async fn echoes_invoice_amount_when_no_override_present() {
        let stage = RetrieveStage::new(unreachable_tools(), None);
        let mut state = WorkflowState::new("t1".to_string());
        state.invoice_payload = serde_json::json!({"invoice_id": "INV-A", "amount": 500.0});

        let NodeOutcome::Delta(delta) = stage.run(&state).await.unwrap() else {
            panic!("expected a delta");
        };
        let pos = delta.matched_pos.unwrap();
        assert_eq!(pos[0]["total_amount"], 500.0);
    }

    #[tokio::test]
    async fn uses_po_override_when_present() {
        let stage = RetrieveStage::new(unreachable_tools(), None);
        let mut state = WorkflowState::new("t1".to_string());
        state.invoice_payload = serde_json::json!({
            "invoice_id": "INV-B",
            "amount": 15_000.0,
            "po_override": {"po_number": "PO-1", "total_amount": 14_550.0, "line_items": []},
        });

        let NodeOutcome::Delta(delta) = stage.run(&state).await.unwrap() else {
            panic!("expected a delta");
        };
        let pos = delta.matched_pos.unwrap();
        assert_eq!(pos[0]["total_amount"], 14_550.0);
    }
}
