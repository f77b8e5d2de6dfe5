//! `PREPARE`: normalize the vendor identity, enrich it, and compute flags.
//!
//! `risk_score` is read straight off the invoice payload's optional `risk_score` field when
//! present, falling back to the enrichment tool's result, then to `0.0` — this is what lets the
//! APPROVE boundary tests (`risk_score = 0.5` vs `0.5001`) drive a specific score end-to-end
//! without a real enrichment backend.

use std::sync::Arc;

use async_trait::async_trait;

use ledgerflow_bus::EventBus;
use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, StateDelta, VendorProfile, WorkflowState};
use ledgerflow_tools::{BigtoolOrchestrator, Capability};

use crate::support::{call_tool, selection_entry};

pub struct PrepareStage {
    tools: Arc<BigtoolOrchestrator>,
    bus: Option<Arc<EventBus>>,
}

impl PrepareStage {
    pub fn new(tools: Arc<BigtoolOrchestrator>, bus: Option<Arc<EventBus>>) -> Self {
        Self { tools, bus }
    }
}

#[async_trait]
impl StageExecutor for PrepareStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let payload = &state.invoice_payload;
        let vendor_name = payload.get("vendor_name").and_then(|v| v.as_str()).unwrap_or("UNKNOWN");
        let tax_id = payload.get("vendor_tax_id").and_then(|v| v.as_str()).map(str::to_string);

        let normalize_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "PREPARE",
            Capability::Normalize,
            "normalize invoice and vendor fields",
            payload.clone(),
        )
        .await;
        let enrichment_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "PREPARE",
            Capability::Enrichment,
            "look up vendor risk signal",
            serde_json::json!({"vendor_name": vendor_name}),
        )
        .await;

        let risk_score = payload
            .get("risk_score")
            .and_then(|v| v.as_f64())
            .or_else(|| enrichment_outcome.body().and_then(|b| b.get("risk_score")).and_then(|v| v.as_f64()))
            .unwrap_or(0.0);

        let mut flags = Vec::new();
        if risk_score > 0.8 {
            flags.push("high_risk_vendor".to_string());
        }

        let vendor_profile = VendorProfile {
            normalized_name: vendor_name.trim().to_string(),
            tax_id,
            enrichment_meta: enrichment_outcome.body().cloned().unwrap_or(serde_json::Value::Null),
            risk_score,
        };

        let mut bigtool_selections = std::collections::HashMap::new();
        let (normalize_stage, normalize_tool) = selection_entry("PREPARE.normalize", &normalize_outcome);
        let (enrichment_stage, enrichment_tool) = selection_entry("PREPARE.enrichment", &enrichment_outcome);
        bigtool_selections.insert(normalize_stage, normalize_tool);
        bigtool_selections.insert(enrichment_stage, enrichment_tool);

        let mut delta = StateDelta::new()
            .with_current_stage("PREPARE")
            .with_audit(AuditEntry::new("PREPARE", format!("normalized vendor '{vendor_name}'")));
        delta.vendor_profile = Some(Some(vendor_profile));
        delta.normalized_invoice = Some(Some(payload.clone()));
        delta.flags = Some(flags);
        delta.bigtool_selections = Some(bigtool_selections);

        for outcome in [&normalize_outcome, &enrichment_outcome] {
            if !outcome.is_usable() {
                delta = delta.with_error_log(format!(
                    "PREPARE: {} call did not succeed, used local fallback",
                    outcome.tool_name()
                ));
            }
        }

        Ok(NodeOutcome::Delta(delta))
    }
}
