//! `NOTIFY`: email the vendor and finance team that the invoice was processed.

use std::sync::Arc;

use async_trait::async_trait;

use ledgerflow_bus::EventBus;
use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, StateDelta, WorkflowState};
use ledgerflow_tools::{BigtoolOrchestrator, Capability};

use crate::support::{call_tool, selection_entry};

pub struct NotifyStage {
    tools: Arc<BigtoolOrchestrator>,
    bus: Option<Arc<EventBus>>,
}

impl NotifyStage {
    pub fn new(tools: Arc<BigtoolOrchestrator>, bus: Option<Arc<EventBus>>) -> Self {
        Self { tools, bus }
    }
}

#[async_trait]
impl StageExecutor for NotifyStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let vendor_name = state
            .vendor_profile
            .as_ref()
            .map(|p| p.normalized_name.clone())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let parties = vec![vendor_name.clone(), "finance-team".to_string()];

        let email_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "NOTIFY",
            Capability::Email,
            "notify the vendor and finance team of the processed invoice",
            serde_json::json!({"parties": parties}),
        )
        .await;

        let notify_status = if email_outcome.is_usable() { "SENT" } else { "FAILED" };

        let mut bigtool_selections = std::collections::HashMap::new();
        let (selection_stage, selection_tool) = selection_entry("NOTIFY", &email_outcome);
        bigtool_selections.insert(selection_stage, selection_tool);

        let mut delta = StateDelta::new()
            .with_current_stage("NOTIFY")
            .with_audit(AuditEntry::new("NOTIFY", format!("notified {parties:?}")));
        delta.notify_status = Some(Some(notify_status.to_string()));
        delta.notified_parties = Some(parties);
        delta.bigtool_selections = Some(bigtool_selections);

        if !email_outcome.is_usable() {
            delta = delta.with_error_log(format!("NOTIFY: {} call did not succeed", email_outcome.tool_name()));
        }

        Ok(NodeOutcome::Delta(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerflow_tools::ToolConfig;

    #[tokio::test]
    async fn notifies_vendor_and_finance_team() {
        let tools = Arc::new(BigtoolOrchestrator::new(
            ToolConfig {
                atlas_url: "http://127.0.0.1:1".to_string(),
                mock_fallback: true,
                use_description_discovery: false,
                ..ToolConfig::default()
            },
            Arc::new(ledgerflow_tools::NullToolSelector),
        ));
        let stage = NotifyStage::new(tools, None);
        let mut state = WorkflowState::new("t1".to_string());
        state.vendor_profile = Some(ledgerflow_core::state::VendorProfile {
            normalized_name: "Acme".to_string(),
            ..Default::default()
        });

        let NodeOutcome::Delta(delta) = stage.run(&state).await.unwrap() else {
            panic!("expected a delta");
        };
        let parties = delta.notified_parties.unwrap();
        assert!(parties.contains(&"Acme".to_string()));
        assert!(parties.contains(&"finance-team".to_string()));
    }
}
