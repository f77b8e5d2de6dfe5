//! `MATCH_TWO_WAY`: the weighted two-way match between an invoice and its purchase order.
//!
//! [`compute_match`] is the exact, deterministic algorithm spec §4.2 specifies component by
//! component; it is the stage's authoritative result regardless of what the `matching` capability
//! call returns, since that capability has no real backend in this deployment — the call is made
//! (and its outcome logged) purely to exercise the Bigtool audit trail spec §3.4 requires.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use ledgerflow_bus::EventBus;
use ledgerflow_core::error::Result;
use ledgerflow_core::stage::{NodeOutcome, StageExecutor};
use ledgerflow_core::state::{AuditEntry, MatchEvidence, MatchResult, StateDelta, WorkflowState};
use ledgerflow_tools::{BigtoolOrchestrator, Capability};

use crate::config::StageConfig;
use crate::support::{call_tool, selection_entry};

pub struct MatchTwoWayStage {
    tools: Arc<BigtoolOrchestrator>,
    bus: Option<Arc<EventBus>>,
    config: StageConfig,
}

impl MatchTwoWayStage {
    pub fn new(tools: Arc<BigtoolOrchestrator>, bus: Option<Arc<EventBus>>, config: StageConfig) -> Self {
        Self { tools, bus, config }
    }
}

fn num(item: &Value, key: &str) -> f64 {
    item.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

/// Amount score: 1.0 within tolerance `t`, 0.5 within `2t`, else 0.0. Zero if the PO total is
/// non-positive.
fn amount_score(invoice_amount: f64, po_total: f64, tolerance_pct: f64) -> f64 {
    if po_total <= 0.0 {
        return 0.0;
    }
    let d = (invoice_amount - po_total).abs() / po_total * 100.0;
    if d <= tolerance_pct {
        1.0
    } else if d <= tolerance_pct * 2.0 {
        0.5
    } else {
        0.0
    }
}

/// Per-line-item score shared by the quantity and price components: counts lines within
/// tolerance over `n = max(|invoice|, |po|)`, treating a missing or non-positive PO value as a
/// guaranteed mismatch (`100%` delta).
fn line_item_score(invoice_items: &[Value], po_items: &[Value], key: &str, tolerance_pct: f64) -> f64 {
    let n = invoice_items.len().max(po_items.len());
    if n == 0 {
        return 0.0;
    }
    let matches = invoice_items
        .iter()
        .enumerate()
        .filter(|(i, invoice_item)| {
            let po_value = po_items.get(*i).map(|po_item| num(po_item, key)).unwrap_or(0.0);
            let delta = if po_value <= 0.0 {
                100.0
            } else {
                (num(invoice_item, key) - po_value).abs() / po_value * 100.0
            };
            delta <= tolerance_pct
        })
        .count();
    matches as f64 / n as f64
}

fn quantity_score(invoice_items: &[Value], po_items: &[Value], tolerance_pct: f64) -> f64 {
    if invoice_items.is_empty() || po_items.is_empty() {
        return if invoice_items.len() == po_items.len() { 0.8 } else { 0.0 };
    }
    line_item_score(invoice_items, po_items, "qty", tolerance_pct)
}

fn price_score(invoice_items: &[Value], po_items: &[Value], tolerance_pct: f64) -> f64 {
    if invoice_items.is_empty() || po_items.is_empty() {
        return 0.5;
    }
    line_item_score(invoice_items, po_items, "unit_price", tolerance_pct)
}

/// Compute the weighted match, returning `(final_score, evidence)`.
pub fn compute_match(
    invoice_amount: f64,
    invoice_items: &[Value],
    po: Option<&Value>,
    tolerance_pct: f64,
) -> (f64, MatchEvidence) {
    let po_total = po.map(|p| num(p, "total_amount")).unwrap_or(0.0);
    let po_items: Vec<Value> = po
        .and_then(|p| p.get("line_items"))
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let amount = amount_score(invoice_amount, po_total, tolerance_pct);
    let qty = quantity_score(invoice_items, &po_items, tolerance_pct);
    let price = price_score(invoice_items, &po_items, tolerance_pct);

    let final_score = ((amount * 0.40 + qty * 0.35 + price * 0.25) * 1000.0).round() / 1000.0;

    let mut matched_fields = Vec::new();
    let mut mismatched_fields = Vec::new();
    for (name, score) in [("amount", amount), ("quantity", qty), ("price", price)] {
        if score >= 1.0 {
            matched_fields.push(name.to_string());
        } else {
            mismatched_fields.push(name.to_string());
        }
    }

    let mut component_scores = HashMap::new();
    component_scores.insert("amount".to_string(), amount);
    component_scores.insert("quantity".to_string(), qty);
    component_scores.insert("price".to_string(), price);

    let evidence = MatchEvidence {
        matched_fields,
        mismatched_fields,
        line_item_details: invoice_items.to_vec(),
        component_scores,
    };

    (final_score, evidence)
}

#[async_trait]
impl StageExecutor for MatchTwoWayStage {
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let invoice_amount = state.invoice_payload.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let invoice_items: Vec<Value> = state
            .invoice_payload
            .get("line_items")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let po = state.matched_pos.first();

        let (score, evidence) = compute_match(invoice_amount, &invoice_items, po, self.config.tolerance_pct);
        let result = if score >= self.config.match_threshold {
            MatchResult::Matched
        } else {
            MatchResult::Failed
        };

        let matching_outcome = call_tool(
            self.bus.as_ref(),
            &self.tools,
            &state.thread_id,
            "MATCH_TWO_WAY",
            Capability::Matching,
            "compute two-way match between invoice and purchase order",
            serde_json::json!({"invoice_amount": invoice_amount, "po": po}),
        )
        .await;

        let mut bigtool_selections = HashMap::new();
        let (selection_stage, selection_tool) = selection_entry("MATCH_TWO_WAY", &matching_outcome);
        bigtool_selections.insert(selection_stage, selection_tool);

        let mut delta = StateDelta::new()
            .with_current_stage("MATCH_TWO_WAY")
            .with_audit(AuditEntry::new(
                "MATCH_TWO_WAY",
                format!("match score {score:.3} -> {result:?}"),
            ));
        delta.match_score = Some(Some(score));
        delta.match_result = Some(Some(result));
        delta.tolerance_pct = Some(Some(self.config.tolerance_pct));
        delta.match_evidence = Some(Some(evidence));
        delta.bigtool_selections = Some(bigtool_selections);

        if !matching_outcome.is_usable() {
            delta = delta.with_error_log(format!(
                "MATCH_TWO_WAY: {} call did not succeed, used local algorithm",
                matching_outcome.tool_name()
            ));
        }

        Ok(NodeOutcome::Delta(delta))
    }
}

#[cfg(test)]
fn po(total_amount: f64, items: Vec<Value>) -> Value {
    serde_json::json!({"total_amount": total_amount, "line_items": items})
}

#[cfg(test)]
fn item(qty: f64, unit_price: f64) -> Value {
    serde_json::json!({"qty": qty, "unit_price": unit_price})
}
