//! `UNDERSTAND`: OCR and line-item extraction.
//!
//! The canonical invoice payload already arrives as structured JSON rather than an image, so
//! "OCR" here means deterministically projecting that payload into a [`ParsedInvoice`] — the
//! OCR/parsing capability servers are out of scope; this stage only needs to honor their I/O
//! contract.

use std::sync::Arc;

use async_trait::async_trait;

use ledgerflow_bus::EventBus;
use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, ParsedInvoice, StateDelta, WorkflowState};
use ledgerflow_tools::{BigtoolOrchestrator, Capability};

use crate::support::{call_tool, selection_entry};

pub struct UnderstandStage {
    tools: Arc<BigtoolOrchestrator>,
    bus: Option<Arc<EventBus>>,
}

impl UnderstandStage {
    pub fn new(tools: Arc<BigtoolOrchestrator>, bus: Option<Arc<EventBus>>) -> Self {
        Self { tools, bus }
    }
}

#[async_trait]
impl StageExecutor for UnderstandStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let payload = &state.invoice_payload;

        let ocr_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "UNDERSTAND",
            Capability::Ocr,
            "extract text from the invoice document",
            payload.clone(),
        )
        .await;
        let parsing_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "UNDERSTAND",
            Capability::Parsing,
            "extract structured line items",
            payload.clone(),
        )
        .await;

        let line_items = payload
            .get("line_items")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let detected_pos = payload
            .get("po_override")
            .and_then(|po| po.get("po_number"))
            .and_then(|n| n.as_str())
            .map(|n| vec![n.to_string()])
            .unwrap_or_default();
        let currency = payload.get("currency").and_then(|v| v.as_str()).map(str::to_string);
        let parsed_dates = [payload.get("invoice_date"), payload.get("due_date")]
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect();

        let parsed_invoice = ParsedInvoice {
            text: payload.to_string(),
            line_items,
            detected_pos,
            currency,
            parsed_dates,
        };

        let mut bigtool_selections = std::collections::HashMap::new();
        let (ocr_stage, ocr_tool) = selection_entry("UNDERSTAND.ocr", &ocr_outcome);
        let (parsing_stage, parsing_tool) = selection_entry("UNDERSTAND.parsing", &parsing_outcome);
        bigtool_selections.insert(ocr_stage, ocr_tool);
        bigtool_selections.insert(parsing_stage, parsing_tool);

        let mut delta = StateDelta::new()
            .with_current_stage("UNDERSTAND")
            .with_audit(AuditEntry::new("UNDERSTAND", "parsed invoice document"));
        delta.parsed_invoice = Some(Some(parsed_invoice));
        delta.bigtool_selections = Some(bigtool_selections);

        for outcome in [&ocr_outcome, &parsing_outcome] {
            if !outcome.is_usable() {
                delta = delta.with_error_log(format!(
                    "UNDERSTAND: {} call did not succeed, used local extraction",
                    outcome.tool_name()
                ));
            }
        }

        Ok(NodeOutcome::Delta(delta))
    }
}
