//! `INTAKE`: validate the submitted schema, assign `raw_id`, record `ingest_ts`.
//!
//! Schema validation is the one stage-logic path spec §7 treats as terminal-but-not-a-bug: a
//! malformed payload returns `Err`, which the engine folds into a `FAILED` workflow exactly like
//! any other stage-logic error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use ledgerflow_bus::EventBus;
use ledgerflow_core::error::{EngineError, Result};
use ledgerflow_core::state::{AuditEntry, StateDelta};
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::WorkflowState;
use ledgerflow_tools::{BigtoolOrchestrator, Capability};

use crate::support::{call_tool, selection_entry};

pub struct IntakeStage {
    tools: Arc<BigtoolOrchestrator>,
    bus: Option<Arc<EventBus>>,
}

impl IntakeStage {
    pub fn new(tools: Arc<BigtoolOrchestrator>, bus: Option<Arc<EventBus>>) -> Self {
        Self { tools, bus }
    }
}

/// The minimal schema check this system owns: the individual field validators are out of scope
/// (spec §1), but a structurally wrong payload must still fail `INTAKE` rather than crash later.
fn validate(payload: &serde_json::Value) -> std::result::Result<(), String> {
    let object = payload.as_object().ok_or("invoice_payload must be a JSON object")?;

    let invoice_id = object.get("invoice_id").and_then(|v| v.as_str());
    if invoice_id.map(str::is_empty).unwrap_or(true) {
        return Err("invoice_id is required and must be non-empty".to_string());
    }

    let amount = object.get("amount").and_then(|v| v.as_f64());
    match amount {
        Some(amount) if amount > 0.0 => {}
        _ => return Err("amount is required and must be > 0".to_string()),
    }

    let currency = object.get("currency").and_then(|v| v.as_str());
    if currency.map(|c| c.len() != 3).unwrap_or(true) {
        return Err("currency is required and must be a 3-character code".to_string());
    }

    let line_items_empty = object
        .get("line_items")
        .and_then(|v| v.as_array())
        .map(|items| items.is_empty())
        .unwrap_or(true);
    if line_items_empty {
        return Err("line_items is required and must contain at least one entry".to_string());
    }

    Ok(())
}

#[async_trait]
impl StageExecutor for IntakeStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        if let Err(reason) = validate(&state.invoice_payload) {
            return Err(EngineError::stage_failed("INTAKE", reason));
        }

        let invoice_id = state.invoice_payload["invoice_id"].as_str().unwrap_or_default();
        let raw_id = format!("raw-{invoice_id}");

        let outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "INTAKE",
            Capability::Storage,
            "persist the accepted invoice payload",
            state.invoice_payload.clone(),
        )
        .await;

        let mut bigtool_selections = std::collections::HashMap::new();
        let (selection_stage, selection_tool) = selection_entry("INTAKE", &outcome);
        bigtool_selections.insert(selection_stage, selection_tool);

        let mut delta = StateDelta::new()
            .with_current_stage("INTAKE")
            .with_audit(AuditEntry::new("INTAKE", format!("accepted invoice {invoice_id}")));
        delta.raw_id = Some(Some(raw_id));
        delta.ingest_ts = Some(Some(Utc::now()));
        delta.bigtool_selections = Some(bigtool_selections);

        if !outcome.is_usable() {
            delta = delta.with_error_log(format!("INTAKE: storage tool call did not succeed ({})", outcome.tool_name()));
        }

        Ok(NodeOutcome::Delta(delta))
    }
}
