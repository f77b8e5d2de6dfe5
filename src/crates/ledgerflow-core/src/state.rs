//! Workflow state: the single heterogeneous record every stage reads and writes.
//!
//! [`WorkflowState`] carries every field any of the twelve stages may touch. The engine is the
//! sole writer and execution inside one workflow is strictly sequential, so no field-level locks
//! are needed — only a merge rule for combining a stage's [`StateDelta`] into the running state.
//!
//! Two reducers apply, selected per field rather than per call:
//! - `audit_log` and `error_log` are **append-only**: a delta's entries are concatenated onto
//!   the existing ones, never replacing them.
//! - Every other field is **last-writer-wins**: a `None` delta value never overwrites an
//!   existing one.
//!
//! # Example
//!
//! ```rust
//! use ledgerflow_core::state::{StateDelta, WorkflowState, WorkflowStatus};
//!
//! let mut state = WorkflowState::new("thread-1".to_string());
//! let delta = StateDelta::new().with_current_stage("INTAKE").with_status(WorkflowStatus::Running);
//! state.apply(delta);
//! assert_eq!(state.current_stage, "INTAKE");
//! assert_eq!(state.status, WorkflowStatus::Running);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of the two-way match performed by `MATCH_TWO_WAY`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchResult {
    /// Score cleared `match_threshold` and no blocking mismatch was found.
    Matched,
    /// Score fell below threshold, or a mismatch forced a hold.
    Failed,
}

/// The reviewer's decision delivered to the suspended `HITL_DECISION` node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HumanDecision {
    /// Reviewer accepted the invoice despite the match failure; routes to `RECONCILE`.
    Accept,
    /// Reviewer rejected the invoice; routes to `MANUAL_HANDOFF`.
    Reject,
}

/// Overall lifecycle status of a workflow thread.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Actively executing stages.
    #[default]
    Running,
    /// Suspended at `HITL_DECISION`, awaiting a reviewer decision.
    Paused,
    /// Reached `COMPLETE`; `posted` is true and `final_payload` is set.
    Completed,
    /// A stage raised an uncaught error; the workflow is terminal and unsuccessful.
    Failed,
    /// Routed to `MANUAL_HANDOFF`; requires an operator outside the automated pipeline.
    RequiresManualHandling,
}

/// Text and line items extracted from OCR/line-item parsing at `UNDERSTAND`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ParsedInvoice {
    /// Raw OCR text.
    pub text: String,
    /// Extracted line items, kept as opaque JSON since schemas vary by vendor.
    pub line_items: Vec<serde_json::Value>,
    /// PO numbers detected in the document body.
    pub detected_pos: Vec<String>,
    /// Detected currency code, if any.
    pub currency: Option<String>,
    /// Dates found in the document (invoice date, due date, ...), as RFC 3339 strings.
    pub parsed_dates: Vec<String>,
}

/// Vendor enrichment produced at `PREPARE`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VendorProfile {
    /// Canonicalized vendor name.
    pub normalized_name: String,
    /// Tax identifier, if resolved.
    pub tax_id: Option<String>,
    /// Opaque enrichment metadata from the enrichment capability.
    pub enrichment_meta: serde_json::Value,
    /// Risk score in `[0, 1]`; higher is riskier.
    pub risk_score: f64,
}

/// Component-level detail behind a `match_score`, for audit and the human reviewer's benefit.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MatchEvidence {
    /// Fields that matched within tolerance.
    pub matched_fields: Vec<String>,
    /// Fields that did not match within tolerance.
    pub mismatched_fields: Vec<String>,
    /// Per-line-item match detail.
    pub line_item_details: Vec<serde_json::Value>,
    /// The weighted component scores (amount, quantity, price) that produced `match_score`.
    pub component_scores: HashMap<String, f64>,
}

/// One side of a double-entry accounting posting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntrySide {
    /// Debit leg.
    Debit,
    /// Credit leg.
    Credit,
}

/// A single leg of an accounting entry produced at `RECONCILE`.
///
/// Invariant I5 requires that, across the full `accounting_entries` set, the sum of `DEBIT`
/// amounts equals the sum of `CREDIT` amounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountingEntry {
    /// Ledger account this leg posts to.
    pub account: String,
    /// Debit or credit.
    pub side: EntrySide,
    /// Amount in the invoice's currency.
    pub amount: f64,
    /// Free-text description, for the audit trail.
    pub description: Option<String>,
}

/// One entry in the append-only audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    /// When the entry was recorded.
    pub ts: DateTime<Utc>,
    /// Stage that produced the entry.
    pub stage: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    pub data: Option<serde_json::Value>,
}

impl AuditEntry {
    /// Record an audit entry for `stage`, stamped with the current time.
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            stage: stage.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured data to this entry.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The single heterogeneous record carrying every field any stage may read or write.
///
/// See module docs for the merge rule applied when a stage's [`StateDelta`] is folded in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    // --- Identity ---
    /// Set exactly once, at creation (invariant I1).
    pub thread_id: String,
    /// Assigned at `INTAKE`.
    pub raw_id: Option<String>,
    /// When the invoice was accepted for processing.
    pub ingest_ts: Option<DateTime<Utc>>,

    // --- Input ---
    /// The opaque payload the caller submitted.
    pub invoice_payload: serde_json::Value,
    /// Names of any attached files.
    pub attachments: Vec<String>,

    // --- Parsing ---
    /// OCR/line-item extraction result.
    pub parsed_invoice: Option<ParsedInvoice>,

    // --- Enrichment ---
    /// Normalized vendor identity and risk signal.
    pub vendor_profile: Option<VendorProfile>,
    /// Invoice after normalization.
    pub normalized_invoice: Option<serde_json::Value>,
    /// Flags raised during enrichment (e.g. `"duplicate_suspected"`).
    pub flags: Vec<String>,

    // --- ERP ---
    /// Purchase orders retrieved for matching.
    pub matched_pos: Vec<serde_json::Value>,
    /// Goods-receipt notes retrieved for matching.
    pub matched_grns: Vec<serde_json::Value>,
    /// Vendor transaction history retrieved for context.
    pub history: Vec<serde_json::Value>,

    // --- Match ---
    /// Weighted two-way match score in `[0, 1]`.
    pub match_score: Option<f64>,
    /// Whether the match cleared threshold (invariant I4: `Matched` implies
    /// `match_score >= match_threshold`).
    pub match_result: Option<MatchResult>,
    /// Tolerance percentage used for this match.
    pub tolerance_pct: Option<f64>,
    /// Evidence backing `match_score`.
    pub match_evidence: Option<MatchEvidence>,

    // --- HITL ---
    /// Id of the pending-review record created at `CHECKPOINT_HITL`.
    pub hitl_checkpoint_id: Option<String>,
    /// URL a reviewer can open to inspect and decide.
    pub review_url: Option<String>,
    /// Why the workflow was routed to human review.
    pub paused_reason: Option<String>,
    /// The decision delivered on resume.
    pub human_decision: Option<HumanDecision>,
    /// Id of the reviewer who decided.
    pub reviewer_id: Option<String>,
    /// Free-text notes from the reviewer.
    pub reviewer_notes: Option<String>,

    // --- Accounting ---
    /// Double-entry postings produced at `RECONCILE` (invariant I5).
    pub accounting_entries: Vec<AccountingEntry>,
    /// Reconciliation summary.
    pub reconciliation_report: Option<serde_json::Value>,

    // --- Outcome ---
    /// Result of the `APPROVE` policy check.
    pub approval_status: Option<String>,
    /// Id of the approver (automatic or human).
    pub approver_id: Option<String>,
    /// Whether the invoice has been posted to the ERP (invariant I2).
    pub posted: bool,
    /// ERP transaction id assigned at `POSTING`.
    pub erp_txn_id: Option<String>,
    /// Scheduled payment id, if a payment was scheduled.
    pub scheduled_payment_id: Option<String>,
    /// Status of the `NOTIFY` stage.
    pub notify_status: Option<String>,
    /// Parties notified at `NOTIFY`.
    pub notified_parties: Vec<String>,
    /// The final, externally-visible payload (invariant I2).
    pub final_payload: Option<serde_json::Value>,

    // --- Meta ---
    /// Name of the stage that produced the current state.
    pub current_stage: String,
    /// Lifecycle status (invariant I3: `Paused` implies `hitl_checkpoint_id` is set).
    pub status: WorkflowStatus,
    /// Terminal error message, set only when `status = Failed`.
    pub error: Option<String>,
    /// Append-only audit trail (invariant I6: monotonically growing).
    pub audit_log: Vec<AuditEntry>,
    /// Which tool the Bigtool orchestrator selected for each stage that called it.
    pub bigtool_selections: HashMap<String, String>,
    /// Append-only log of soft (tool-call) failures that did not halt the workflow.
    pub error_log: Vec<String>,
}

impl WorkflowState {
    /// Construct the initial state for a freshly accepted invoice.
    pub fn new(thread_id: String) -> Self {
        Self {
            thread_id,
            raw_id: None,
            ingest_ts: None,
            invoice_payload: serde_json::Value::Null,
            attachments: Vec::new(),
            parsed_invoice: None,
            vendor_profile: None,
            normalized_invoice: None,
            flags: Vec::new(),
            matched_pos: Vec::new(),
            matched_grns: Vec::new(),
            history: Vec::new(),
            match_score: None,
            match_result: None,
            tolerance_pct: None,
            match_evidence: None,
            hitl_checkpoint_id: None,
            review_url: None,
            paused_reason: None,
            human_decision: None,
            reviewer_id: None,
            reviewer_notes: None,
            accounting_entries: Vec::new(),
            reconciliation_report: None,
            approval_status: None,
            approver_id: None,
            posted: false,
            erp_txn_id: None,
            scheduled_payment_id: None,
            notify_status: None,
            notified_parties: Vec::new(),
            final_payload: None,
            current_stage: "START".to_string(),
            status: WorkflowStatus::Running,
            error: None,
            audit_log: Vec::new(),
            bigtool_selections: HashMap::new(),
            error_log: Vec::new(),
        }
    }

    /// Fold a stage's delta into this state per the module's merge rule.
    pub fn apply(&mut self, delta: StateDelta) {
        macro_rules! overwrite {
            ($field:ident) => {
                if let Some(value) = delta.$field {
                    self.$field = value;
                }
            };
        }

        overwrite!(raw_id);
        overwrite!(ingest_ts);
        overwrite!(invoice_payload);
        overwrite!(attachments);
        overwrite!(parsed_invoice);
        overwrite!(vendor_profile);
        overwrite!(normalized_invoice);
        overwrite!(flags);
        overwrite!(matched_pos);
        overwrite!(matched_grns);
        overwrite!(history);
        overwrite!(match_score);
        overwrite!(match_result);
        overwrite!(tolerance_pct);
        overwrite!(match_evidence);
        overwrite!(hitl_checkpoint_id);
        overwrite!(review_url);
        overwrite!(paused_reason);
        overwrite!(human_decision);
        overwrite!(reviewer_id);
        overwrite!(reviewer_notes);
        overwrite!(accounting_entries);
        overwrite!(reconciliation_report);
        overwrite!(approval_status);
        overwrite!(approver_id);
        overwrite!(posted);
        overwrite!(erp_txn_id);
        overwrite!(scheduled_payment_id);
        overwrite!(notify_status);
        overwrite!(notified_parties);
        overwrite!(final_payload);
        overwrite!(current_stage);
        overwrite!(status);
        overwrite!(error);
        overwrite!(bigtool_selections);

        self.audit_log.extend(delta.audit_log);
        self.error_log.extend(delta.error_log);
    }

    /// Invariant I5: every accounting-entry set must balance.
    pub fn accounting_balances(&self) -> bool {
        let debit: f64 = self
            .accounting_entries
            .iter()
            .filter(|e| e.side == EntrySide::Debit)
            .map(|e| e.amount)
            .sum();
        let credit: f64 = self
            .accounting_entries
            .iter()
            .filter(|e| e.side == EntrySide::Credit)
            .map(|e| e.amount)
            .sum();
        (debit - credit).abs() < 1e-6
    }
}

/// A partial update returned by a stage executor.
///
/// Every field mirrors [`WorkflowState`] but wrapped in `Option`; `None` means "this stage did
/// not touch this field" and never overwrites the running state. `audit_log` and `error_log` use
/// plain `Vec`s (possibly empty) since they always append rather than overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StateDelta {
    pub raw_id: Option<Option<String>>,
    pub ingest_ts: Option<Option<DateTime<Utc>>>,
    pub invoice_payload: Option<serde_json::Value>,
    pub attachments: Option<Vec<String>>,
    pub parsed_invoice: Option<Option<ParsedInvoice>>,
    pub vendor_profile: Option<Option<VendorProfile>>,
    pub normalized_invoice: Option<Option<serde_json::Value>>,
    pub flags: Option<Vec<String>>,
    pub matched_pos: Option<Vec<serde_json::Value>>,
    pub matched_grns: Option<Vec<serde_json::Value>>,
    pub history: Option<Vec<serde_json::Value>>,
    pub match_score: Option<Option<f64>>,
    pub match_result: Option<Option<MatchResult>>,
    pub tolerance_pct: Option<Option<f64>>,
    pub match_evidence: Option<Option<MatchEvidence>>,
    pub hitl_checkpoint_id: Option<Option<String>>,
    pub review_url: Option<Option<String>>,
    pub paused_reason: Option<Option<String>>,
    pub human_decision: Option<Option<HumanDecision>>,
    pub reviewer_id: Option<Option<String>>,
    pub reviewer_notes: Option<Option<String>>,
    pub accounting_entries: Option<Vec<AccountingEntry>>,
    pub reconciliation_report: Option<Option<serde_json::Value>>,
    pub approval_status: Option<Option<String>>,
    pub approver_id: Option<Option<String>>,
    pub posted: Option<bool>,
    pub erp_txn_id: Option<Option<String>>,
    pub scheduled_payment_id: Option<Option<String>>,
    pub notify_status: Option<Option<String>>,
    pub notified_parties: Option<Vec<String>>,
    pub final_payload: Option<Option<serde_json::Value>>,
    pub current_stage: Option<String>,
    pub status: Option<WorkflowStatus>,
    pub error: Option<Option<String>>,
    pub bigtool_selections: Option<HashMap<String, String>>,
    /// Appended verbatim; never replaces existing entries.
    pub audit_log: Vec<AuditEntry>,
    /// Appended verbatim; never replaces existing entries.
    pub error_log: Vec<String>,
}

impl StateDelta {
    /// Start an empty delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `current_stage`.
    pub fn with_current_stage(mut self, stage: impl Into<String>) -> Self {
        self.current_stage = Some(stage.into());
        self
    }

    /// Set `status`.
    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Append one audit entry.
    pub fn with_audit(mut self, entry: AuditEntry) -> Self {
        self.audit_log.push(entry);
        self
    }

    /// Append one error-log entry.
    pub fn with_error_log(mut self, message: impl Into<String>) -> Self {
        self.error_log.push(message.into());
        self
    }

    /// Set the terminal `error` field.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(Some(error.into()));
        self
    }

    /// Build a terminal failure delta: `status = Failed`, `error` set, and an error-log entry
    /// appended, per the engine's failure-semantics contract.
    pub fn failure(stage: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new()
            .with_status(WorkflowStatus::Failed)
            .with_error_log(format!("{stage}: {message}"))
            .with_error(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_overwrites_last_writer_wins_fields() {
        let mut state = WorkflowState::new("t1".to_string());
        state.apply(StateDelta::new().with_current_stage("INTAKE"));
        assert_eq!(state.current_stage, "INTAKE");

        state.apply(StateDelta::new().with_current_stage("UNDERSTAND"));
        assert_eq!(state.current_stage, "UNDERSTAND");
    }

    #[test]
    fn apply_leaves_untouched_fields_alone() {
        let mut state = WorkflowState::new("t1".to_string());
        state.match_score = Some(0.9);

        state.apply(StateDelta::new().with_current_stage("RETRIEVE"));
        assert_eq!(state.match_score, Some(0.9));
    }

    #[test]
    fn audit_log_and_error_log_are_append_only() {
        let mut state = WorkflowState::new("t1".to_string());
        state.apply(StateDelta::new().with_audit(AuditEntry::new("INTAKE", "accepted")));
        state.apply(StateDelta::new().with_audit(AuditEntry::new("UNDERSTAND", "parsed")));

        assert_eq!(state.audit_log.len(), 2);
        assert_eq!(state.audit_log[0].stage, "INTAKE");
        assert_eq!(state.audit_log[1].stage, "UNDERSTAND");
    }

    #[test]
    fn accounting_balances_detects_imbalance() {
        let mut state = WorkflowState::new("t1".to_string());
        state.accounting_entries.push(AccountingEntry {
            account: "AP".to_string(),
            side: EntrySide::Debit,
            amount: 100.0,
            description: None,
        });
        assert!(!state.accounting_balances());

        state.accounting_entries.push(AccountingEntry {
            account: "Cash".to_string(),
            side: EntrySide::Credit,
            amount: 100.0,
            description: None,
        });
        assert!(state.accounting_balances());
    }

    #[test]
    fn failure_delta_sets_status_error_and_log() {
        let delta = StateDelta::failure("MATCH_TWO_WAY", "erp timeout");
        assert_eq!(delta.status, Some(WorkflowStatus::Failed));
        assert_eq!(delta.error_log.len(), 1);
        assert_eq!(delta.error, Some(Some("erp timeout".to_string())));
    }
}
