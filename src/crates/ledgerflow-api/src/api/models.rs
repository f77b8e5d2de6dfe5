//! Request/response DTOs for the Intake/Resume API (spec §6.1, §6.3).
//!
//! These sit between axum's `Json` extractor and `ledgerflow_core::state::WorkflowState` — the
//! engine never sees an HTTP type, and the wire format never leaks an internal enum's Rust name
//! verbatim (decisions and statuses serialize with their own fixed wire spellings).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledgerflow_checkpoint::{PendingReviewRecord, ReviewDecision};
use ledgerflow_core::state::{HumanDecision, MatchResult, StateDelta, WorkflowState, WorkflowStatus};

use crate::api::error::ApiError;

/// `POST /invoice/submit` body — the canonical invoice payload (spec §6.3). Kept as a bag of
/// the fields `INTAKE`'s own validator checks, plus passthrough fields it doesn't, rather than
/// duplicating that validation here: the stage is the single source of truth for what a valid
/// invoice looks like, this DTO only needs to parse as JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSubmitRequest {
    pub invoice_id: Option<String>,
    pub vendor_name: Option<String>,
    pub vendor_tax_id: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub line_items: Vec<serde_json::Value>,
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Not part of spec §6.3's canonical payload; an optional known purchase order `RETRIEVE`
    /// uses verbatim instead of its own echo fallback (see `ledgerflow_stages::retrieve`'s doc
    /// comment). Passed through opaquely so callers — and integration tests — can drive every
    /// matching scenario in spec §8 through the public submission endpoint, not just by
    /// constructing `WorkflowState` directly.
    pub po_override: Option<serde_json::Value>,
}

impl InvoiceSubmitRequest {
    /// Re-serialize as the opaque JSON object `WorkflowState::invoice_payload` holds. Absent
    /// optional fields are simply omitted rather than written as `null`, so `INTAKE`'s
    /// `.get("field").and_then(...)` sees a missing key exactly as it would for a field the
    /// client never sent.
    pub fn into_payload(self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        if let Some(v) = self.invoice_id {
            object.insert("invoice_id".to_string(), serde_json::Value::String(v));
        }
        if let Some(v) = self.vendor_name {
            object.insert("vendor_name".to_string(), serde_json::Value::String(v));
        }
        if let Some(v) = self.vendor_tax_id {
            object.insert("vendor_tax_id".to_string(), serde_json::Value::String(v));
        }
        if let Some(v) = self.invoice_date {
            object.insert("invoice_date".to_string(), serde_json::Value::String(v));
        }
        if let Some(v) = self.due_date {
            object.insert("due_date".to_string(), serde_json::Value::String(v));
        }
        if let Some(v) = self.amount {
            if let Some(n) = serde_json::Number::from_f64(v) {
                object.insert("amount".to_string(), serde_json::Value::Number(n));
            }
        }
        if let Some(v) = self.currency {
            object.insert("currency".to_string(), serde_json::Value::String(v));
        }
        object.insert("line_items".to_string(), serde_json::Value::Array(self.line_items));
        object.insert(
            "attachments".to_string(),
            serde_json::Value::Array(self.attachments.into_iter().map(serde_json::Value::String).collect()),
        );
        if let Some(v) = self.po_override {
            object.insert("po_override".to_string(), v);
        }
        serde_json::Value::Object(object)
    }
}

/// Response to `POST /invoice/submit`. The workflow continues in the background; this is the
/// immediate acknowledgement, not a terminal status.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub thread_id: String,
    pub status: WorkflowStatus,
    pub current_stage: String,
    pub message: String,
}

/// Response to `GET /invoice/status/{thread_id}` and `GET /workflow/status/{thread_id}` — the
/// spec treats these as the same "workflow status snapshot" shape at two URLs (terse poll vs.
/// detailed digest), so one DTO serves both.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatusResponse {
    pub thread_id: String,
    pub status: WorkflowStatus,
    pub current_stage: String,
    pub match_score: Option<f64>,
    pub match_result: Option<MatchResult>,
    pub approval_status: Option<String>,
    pub posted: bool,
    pub erp_txn_id: Option<String>,
    pub error: Option<String>,
    pub paused_reason: Option<String>,
    pub hitl_checkpoint_id: Option<String>,
    pub review_url: Option<String>,
    pub final_payload: Option<serde_json::Value>,
    pub audit_log_len: usize,
}

impl From<&WorkflowState> for WorkflowStatusResponse {
    fn from(state: &WorkflowState) -> Self {
        Self {
            thread_id: state.thread_id.clone(),
            status: state.status,
            current_stage: state.current_stage.clone(),
            match_score: state.match_score,
            match_result: state.match_result,
            approval_status: state.approval_status.clone(),
            posted: state.posted,
            erp_txn_id: state.erp_txn_id.clone(),
            error: state.error.clone(),
            paused_reason: state.paused_reason.clone(),
            hitl_checkpoint_id: state.hitl_checkpoint_id.clone(),
            review_url: state.review_url.clone(),
            final_payload: state.final_payload.clone(),
            audit_log_len: state.audit_log.len(),
        }
    }
}

/// One row of `GET /workflow/all`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub thread_id: String,
    pub status: WorkflowStatus,
    pub current_stage: String,
}

impl From<&WorkflowState> for WorkflowSummary {
    fn from(state: &WorkflowState) -> Self {
        Self {
            thread_id: state.thread_id.clone(),
            status: state.status,
            current_stage: state.current_stage.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowAllResponse {
    pub workflows: Vec<WorkflowSummary>,
    pub total: usize,
}

/// One row of `GET /workflow/stages` — the static twelve-stage pipeline catalog (spec §6.1).
/// `MANUAL_HANDOFF` is a terminal sink, not a pipeline stage, and is excluded.
#[derive(Debug, Clone, Serialize)]
pub struct StageCatalogEntry {
    pub name: &'static str,
    pub mode: &'static str,
}

/// `deterministic` for every stage except `HITL_DECISION`, the pipeline's one suspension point.
fn stage_mode(stage: ledgerflow_core::stage::StageId) -> &'static str {
    if matches!(stage, ledgerflow_core::stage::StageId::HitlDecision) {
        "human_in_the_loop"
    } else {
        "deterministic"
    }
}

pub fn stage_catalog() -> Vec<StageCatalogEntry> {
    ledgerflow_core::stage::StageId::PIPELINE
        .into_iter()
        .map(|stage| StageCatalogEntry {
            name: stage.as_str(),
            mode: stage_mode(stage),
        })
        .collect()
}

/// Serializable view of a [`PendingReviewRecord`] — re-exported as a DTO rather than serializing
/// the checkpoint crate's type directly, so the wire shape can diverge from storage later without
/// touching `ledgerflow-checkpoint`.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReviewResponse {
    pub review_id: String,
    pub thread_id: String,
    pub checkpoint_id: String,
    pub invoice_id: String,
    pub vendor_name: String,
    pub amount: f64,
    pub currency: String,
    pub match_score: f64,
    pub match_evidence: serde_json::Value,
    pub reason_for_hold: String,
    pub review_url: String,
    pub status: ledgerflow_checkpoint::ReviewStatus,
    pub decision: Option<ReviewDecision>,
    pub reviewer_id: Option<String>,
    pub reviewer_notes: Option<String>,
}

impl From<PendingReviewRecord> for PendingReviewResponse {
    fn from(record: PendingReviewRecord) -> Self {
        Self {
            review_id: record.review_id,
            thread_id: record.thread_id,
            checkpoint_id: record.checkpoint_id,
            invoice_id: record.invoice_id,
            vendor_name: record.vendor_name,
            amount: record.amount,
            currency: record.currency,
            match_score: record.match_score,
            match_evidence: record.match_evidence,
            reason_for_hold: record.reason_for_hold,
            review_url: record.review_url,
            status: record.status,
            decision: record.decision,
            reviewer_id: record.reviewer_id,
            reviewer_notes: record.reviewer_notes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingReviewListResponse {
    pub items: Vec<PendingReviewResponse>,
    pub total: usize,
}

/// `GET /human-review/{checkpoint_id}` — the review record plus the paused workflow's snapshot,
/// so a reviewer UI doesn't need a second round trip to show context alongside the decision form.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReviewDetailResponse {
    #[serde(flatten)]
    pub review: PendingReviewResponse,
    pub workflow: Option<WorkflowStatusResponse>,
}

/// `POST /human-review/decision` body.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub thread_id: String,
    pub checkpoint_id: String,
    pub decision: ApiReviewDecision,
    pub reviewer_id: String,
    pub notes: Option<String>,
}

/// Wire spelling of [`ReviewDecision`]/[`HumanDecision`] (`ACCEPT`/`REJECT`) — kept distinct from
/// both so a rename of either internal enum doesn't change the HTTP contract.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiReviewDecision {
    Accept,
    Reject,
}

impl From<ApiReviewDecision> for ReviewDecision {
    fn from(decision: ApiReviewDecision) -> Self {
        match decision {
            ApiReviewDecision::Accept => ReviewDecision::Accept,
            ApiReviewDecision::Reject => ReviewDecision::Reject,
        }
    }
}

impl From<ApiReviewDecision> for HumanDecision {
    fn from(decision: ApiReviewDecision) -> Self {
        match decision {
            ApiReviewDecision::Accept => HumanDecision::Accept,
            ApiReviewDecision::Reject => HumanDecision::Reject,
        }
    }
}

impl DecisionRequest {
    /// Build the [`StateDelta`] the engine merges into the paused state before re-entering
    /// `HITL_DECISION` (spec §4.1's resume contract: the decision lands exactly where the
    /// suspension occurred).
    pub fn into_delta(self) -> StateDelta {
        let mut delta = StateDelta::new();
        delta.human_decision = Some(Some(self.decision.into()));
        delta.reviewer_id = Some(Some(self.reviewer_id));
        delta.reviewer_notes = Some(self.notes);
        delta
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionResponse {
    pub success: bool,
    pub thread_id: String,
    pub checkpoint_id: String,
    pub decision: ApiReviewDecision,
    pub next_stage: String,
    pub status: WorkflowStatus,
    pub message: String,
}

/// Validate the one thing no stage checks for us: that `/invoice/submit` was given a well-formed
/// JSON object at all (`INTAKE` still performs the authoritative field-level checks once the
/// workflow starts — spec §7 category 1's synchronous branch only needs to catch the submission
/// being unusable as a payload in the first place, e.g. a negative amount makes it exactly as
/// far as `INTAKE`, which fails it into the workflow's own FAILED state, not a 400).
pub fn validate_submit_request(request: &InvoiceSubmitRequest) -> Result<(), ApiError> {
    if request.invoice_id.as_deref().unwrap_or_default().trim().is_empty() {
        return Err(ApiError::BadRequest("invoice_id is required".to_string()));
    }
    Ok(())
}

pub fn new_thread_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_payload_omits_absent_fields() {
        let request = InvoiceSubmitRequest {
            invoice_id: Some("INV-1".to_string()),
            vendor_name: None,
            vendor_tax_id: None,
            invoice_date: None,
            due_date: None,
            amount: Some(100.0),
            currency: Some("USD".to_string()),
            line_items: vec![serde_json::json!({"desc": "x", "qty": 1, "unit_price": 100.0, "total": 100.0})],
            attachments: vec![],
            po_override: None,
        };
        let payload = request.into_payload();
        assert_eq!(payload["invoice_id"], "INV-1");
        assert!(payload.get("vendor_name").is_none());
        assert_eq!(payload["line_items"].as_array().unwrap().len(), 1);
        assert!(payload.get("po_override").is_none());
    }

    #[test]
    fn into_payload_passes_through_po_override() {
        let request = InvoiceSubmitRequest {
            invoice_id: Some("INV-2".to_string()),
            vendor_name: None,
            vendor_tax_id: None,
            invoice_date: None,
            due_date: None,
            amount: Some(100.0),
            currency: Some("USD".to_string()),
            line_items: vec![],
            attachments: vec![],
            po_override: Some(serde_json::json!({"po_number": "PO-9", "total_amount": 95.0, "line_items": []})),
        };
        let payload = request.into_payload();
        assert_eq!(payload["po_override"]["po_number"], "PO-9");
    }

    #[test]
    fn validate_rejects_missing_invoice_id() {
        let request = InvoiceSubmitRequest {
            invoice_id: None,
            vendor_name: None,
            vendor_tax_id: None,
            invoice_date: None,
            due_date: None,
            amount: Some(1.0),
            currency: Some("USD".to_string()),
            line_items: vec![],
            attachments: vec![],
            po_override: None,
        };
        assert!(validate_submit_request(&request).is_err());
    }

    #[test]
    fn decision_request_builds_a_delta_carrying_the_decision() {
        let request = DecisionRequest {
            thread_id: "t1".to_string(),
            checkpoint_id: "cp1".to_string(),
            decision: ApiReviewDecision::Accept,
            reviewer_id: "rev-1".to_string(),
            notes: Some("looks fine".to_string()),
        };
        let delta = request.into_delta();
        assert_eq!(delta.human_decision, Some(Some(HumanDecision::Accept)));
        assert_eq!(delta.reviewer_id, Some(Some("rev-1".to_string())));
    }

    #[test]
    fn stage_catalog_has_twelve_entries_with_one_hitl_mode() {
        let catalog = stage_catalog();
        assert_eq!(catalog.len(), 12);
        assert!(catalog.iter().all(|e| e.name != "MANUAL_HANDOFF"));
        assert_eq!(catalog.iter().filter(|e| e.mode == "human_in_the_loop").count(), 1);
    }
}
