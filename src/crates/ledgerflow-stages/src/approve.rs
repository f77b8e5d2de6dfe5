//! `APPROVE`: apply the policy algorithm based on amount and vendor risk.
//!
//! Thresholds `AUTO ≤ 10,000`, `MGR ≤ 50,000`; a `risk_score` strictly above
//! [`StageConfig::risk_escalation_threshold`] always escalates regardless of amount.

use std::sync::Arc;

use async_trait::async_trait;

use ledgerflow_bus::EventBus;
use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, StateDelta, WorkflowState};
use ledgerflow_tools::{BigtoolOrchestrator, Capability};

use crate::config::StageConfig;
use crate::support::{call_tool, selection_entry};

pub struct ApproveStage {
    tools: Arc<BigtoolOrchestrator>,
    bus: Option<Arc<EventBus>>,
    config: StageConfig,
}

impl ApproveStage {
    pub fn new(tools: Arc<BigtoolOrchestrator>, bus: Option<Arc<EventBus>>, config: StageConfig) -> Self {
        Self { tools, bus, config }
    }
}

/// Decide `(approval_status, approver_id)` per spec §4.2's policy algorithm.
pub fn evaluate_policy(amount: f64, risk_score: f64, config: &StageConfig) -> (&'static str, &'static str) {
    if risk_score > config.risk_escalation_threshold {
        ("APPROVED_WITH_REVIEW", "MANAGER-REVIEW")
    } else if amount <= config.auto_approve_limit {
        ("AUTO_APPROVED", "SYSTEM")
    } else if amount <= config.manager_approve_limit {
        ("APPROVED", "MGR-001")
    } else {
        ("APPROVED", "EXEC-001")
    }
}

#[async_trait]
impl StageExecutor for ApproveStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let amount = state.invoice_payload.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let risk_score = state.vendor_profile.as_ref().map(|p| p.risk_score).unwrap_or(0.0);
        let (approval_status, approver_id) = evaluate_policy(amount, risk_score, &self.config);

        let policy_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "APPROVE",
            Capability::Policy,
            "evaluate approval policy for invoice amount and vendor risk",
            serde_json::json!({"amount": amount, "risk_score": risk_score}),
        )
        .await;

        let mut bigtool_selections = std::collections::HashMap::new();
        let (selection_stage, selection_tool) = selection_entry("APPROVE", &policy_outcome);
        bigtool_selections.insert(selection_stage, selection_tool);

        let mut delta = StateDelta::new().with_current_stage("APPROVE").with_audit(AuditEntry::new(
            "APPROVE",
            format!("{approval_status} by {approver_id} (amount {amount}, risk {risk_score})"),
        ));
        delta.approval_status = Some(Some(approval_status.to_string()));
        delta.approver_id = Some(Some(approver_id.to_string()));
        delta.bigtool_selections = Some(bigtool_selections);

        if !policy_outcome.is_usable() {
            delta = delta.with_error_log(format!(
                "APPROVE: {} call did not succeed, used local policy evaluation",
                policy_outcome.tool_name()
            ));
        }

        Ok(NodeOutcome::Delta(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_exactly_at_auto_limit_is_auto_approved() {
        let config = StageConfig::default();
        assert_eq!(evaluate_policy(10_000.0, 0.0, &config), ("AUTO_APPROVED", "SYSTEM"));
    }

    #[test]
    fn amount_just_over_auto_limit_is_manager_approved() {
        let config = StageConfig::default();
        assert_eq!(evaluate_policy(10_000.01, 0.0, &config), ("APPROVED", "MGR-001"));
    }

    #[test]
    fn amount_over_manager_limit_is_exec_approved() {
        let config = StageConfig::default();
        assert_eq!(evaluate_policy(50_000.01, 0.0, &config), ("APPROVED", "EXEC-001"));
    }

    #[test]
    fn risk_score_exactly_at_threshold_is_not_escalated() {
        let config = StageConfig::default();
        assert_eq!(evaluate_policy(500.0, 0.5, &config), ("AUTO_APPROVED", "SYSTEM"));
    }

    #[test]
    fn risk_score_just_over_threshold_escalates_regardless_of_amount() {
        let config = StageConfig::default();
        assert_eq!(evaluate_policy(500.0, 0.5001, &config), ("APPROVED_WITH_REVIEW", "MANAGER-REVIEW"));
    }
}
