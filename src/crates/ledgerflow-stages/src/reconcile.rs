//! `RECONCILE`: build the double-entry accounting pair for the invoice.
//!
//! Exactly two legs, DEBIT `6000-Expenses` / CREDIT `2100-Accounts Payable`, both for the full
//! invoice amount — invariant I5 (Σ DEBIT = Σ CREDIT) holds by construction.

use std::sync::Arc;

use async_trait::async_trait;

use ledgerflow_bus::EventBus;
use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AccountingEntry, AuditEntry, EntrySide, StateDelta, WorkflowState};
use ledgerflow_tools::{BigtoolOrchestrator, Capability};

use crate::support::{call_tool, selection_entry};

const EXPENSE_ACCOUNT: &str = "6000-Expenses";
const PAYABLE_ACCOUNT: &str = "2100-Accounts Payable";

pub struct ReconcileStage {
    tools: Arc<BigtoolOrchestrator>,
    bus: Option<Arc<EventBus>>,
}

impl ReconcileStage {
    pub fn new(tools: Arc<BigtoolOrchestrator>, bus: Option<Arc<EventBus>>) -> Self {
        Self { tools, bus }
    }
}

#[async_trait]
impl StageExecutor for ReconcileStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let amount = state.invoice_payload.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let invoice_id = state.invoice_payload.get("invoice_id").and_then(|v| v.as_str()).unwrap_or("UNKNOWN");

        let entries = vec![
            AccountingEntry {
                account: EXPENSE_ACCOUNT.to_string(),
                side: EntrySide::Debit,
                amount,
                description: Some(format!("invoice {invoice_id}")),
            },
            AccountingEntry {
                account: PAYABLE_ACCOUNT.to_string(),
                side: EntrySide::Credit,
                amount,
                description: Some(format!("invoice {invoice_id}")),
            },
        ];

        let accounting_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "RECONCILE",
            Capability::Accounting,
            "post debit/credit accounting entries",
            serde_json::json!({"entries": entries}),
        )
        .await;

        let reconciliation_report = serde_json::json!({
            "invoice_id": invoice_id,
            "amount": amount,
            "debit_account": EXPENSE_ACCOUNT,
            "credit_account": PAYABLE_ACCOUNT,
            "balanced": true,
        });

        let mut bigtool_selections = std::collections::HashMap::new();
        let (selection_stage, selection_tool) = selection_entry("RECONCILE", &accounting_outcome);
        bigtool_selections.insert(selection_stage, selection_tool);

        let mut delta = StateDelta::new()
            .with_current_stage("RECONCILE")
            .with_audit(AuditEntry::new("RECONCILE", format!("posted {invoice_id} for {amount}")));
        delta.accounting_entries = Some(entries);
        delta.reconciliation_report = Some(Some(reconciliation_report));
        delta.bigtool_selections = Some(bigtool_selections);

        if !accounting_outcome.is_usable() {
            delta = delta.with_error_log(format!(
                "RECONCILE: {} call did not succeed, used local posting",
                accounting_outcome.tool_name()
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
                common_url: "http://127.0.0.1:1".to_string(),
                use_description_discovery: false,
                ..ToolConfig::default()
            },
            Arc::new(ledgerflow_tools::NullToolSelector),
        ))
    }

    #[tokio::test]
    async fn produces_balanced_double_entry_pair() {
        let stage = ReconcileStage::new(unreachable_tools(), None);
        let mut state = WorkflowState::new("t1".to_string());
        state.invoice_payload = serde_json::json!({"invoice_id": "INV-A", "amount": 500.0});

        let NodeOutcome::Delta(delta) = stage.run(&state).await.unwrap() else {
            panic!("expected a delta");
        };
        let entries = delta.accounting_entries.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].account, EXPENSE_ACCOUNT);
        assert_eq!(entries[0].side, EntrySide::Debit);
        assert_eq!(entries[1].account, PAYABLE_ACCOUNT);
        assert_eq!(entries[1].side, EntrySide::Credit);
        assert_eq!(entries[0].amount, entries[1].amount);
    }
}
