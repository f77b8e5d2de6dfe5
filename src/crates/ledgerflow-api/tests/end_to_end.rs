//! End-to-end scenarios from spec §8, driven directly against `AppState`'s real `Engine` and
//! stage registrations (no HTTP transport) — the same stack `ledgerflow-server` wires up, minus
//! axum.

use futures::StreamExt;

use ledgerflow_api::{AppState, ServerConfig};
use ledgerflow_bus::SubscribeOptions;
use ledgerflow_checkpoint::ReviewDecision;
use ledgerflow_core::state::{HumanDecision, StateDelta, WorkflowState, WorkflowStatus};

fn invoice_payload(invoice_id: &str, amount: f64, line_items: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "invoice_id": invoice_id,
        "vendor_name": "Acme",
        "amount": amount,
        "currency": "USD",
        "line_items": line_items,
        "attachments": [],
    })
}

fn po_override(total_amount: f64, line_items: serde_json::Value) -> serde_json::Value {
    serde_json::json!({"po_number": "PO-TEST", "total_amount": total_amount, "line_items": line_items})
}

/// Scenario 1: small matched invoice, ends AUTO_APPROVED and posted.
#[tokio::test]
async fn small_matched_invoice_auto_approves_and_completes() {
    let state = AppState::build(ServerConfig::default());
    let mut initial = WorkflowState::new("thread-1".to_string());
    initial.invoice_payload = invoice_payload(
        "INV-A",
        500.0,
        serde_json::json!([{"desc": "Pen", "qty": 10, "unit_price": 50.0, "total": 500.0}]),
    );

    let result = state.engine.start("thread-1", initial).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert!(result.posted);
    let payload = result.final_payload.unwrap();
    assert_eq!(payload["approval"]["status"], "AUTO_APPROVED");
    assert_eq!(payload["erp"]["posted"], true);
    assert!(payload["erp"]["transaction_id"].is_string());
}

/// Scenario 2: medium invoice within tolerance goes straight to RECONCILE/APPROVE as MGR-001.
#[tokio::test]
async fn medium_invoice_within_tolerance_skips_hitl_and_is_manager_approved() {
    let state = AppState::build(ServerConfig::default());
    let mut initial = WorkflowState::new("thread-2".to_string());
    let items = serde_json::json!([{"desc": "Widget", "qty": 1, "unit_price": 15_000.0, "total": 15_000.0}]);
    let mut payload = invoice_payload("INV-B", 15_000.0, items.clone());
    payload["po_override"] = po_override(14_550.0, items);
    initial.invoice_payload = payload;

    let result = state.engine.start("thread-2", initial).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.approval_status.as_deref(), Some("APPROVED"));
    assert_eq!(result.approver_id.as_deref(), Some("MGR-001"));
    assert!(result.hitl_checkpoint_id.is_none());
}

/// Scenario 3: large discrepancy pauses at CHECKPOINT_HITL; ACCEPT resumes through to COMPLETE.
#[tokio::test]
async fn large_discrepancy_pauses_then_accept_resumes_to_complete() {
    let state = AppState::build(ServerConfig::default());
    let mut initial = WorkflowState::new("thread-3".to_string());
    let items = serde_json::json!([{"desc": "Widget", "qty": 1, "unit_price": 25_000.0, "total": 25_000.0}]);
    let mut payload = invoice_payload("INV-C", 25_000.0, items.clone());
    payload["po_override"] = po_override(18_750.0, items);
    initial.invoice_payload = payload;

    let paused = state.engine.start("thread-3", initial).await.unwrap();
    assert_eq!(paused.status, WorkflowStatus::Paused);
    assert!(paused.hitl_checkpoint_id.is_some());

    let pending = state.review_queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    let checkpoint_id = pending[0].checkpoint_id.clone();

    state
        .review_queue
        .decide(&checkpoint_id, ReviewDecision::Accept, "rev-1", None)
        .await
        .unwrap();

    let mut decision = StateDelta::new();
    decision.human_decision = Some(Some(HumanDecision::Accept));
    decision.reviewer_id = Some(Some("rev-1".to_string()));

    let resumed = state.engine.resume("thread-3", decision).await.unwrap();

    assert_eq!(resumed.status, WorkflowStatus::Completed);
    let payload = resumed.final_payload.unwrap();
    assert_eq!(payload["processing"]["required_hitl"], true);
    assert_eq!(payload["hitl_decision"], "ACCEPT");
    assert!(payload["erp"]["transaction_id"].is_string());
}

/// Scenario 4: same discrepancy, reviewer rejects -> MANUAL_HANDOFF, no ERP posting.
#[tokio::test]
async fn large_discrepancy_reject_routes_to_manual_handoff() {
    let state = AppState::build(ServerConfig::default());
    let mut initial = WorkflowState::new("thread-4".to_string());
    let items = serde_json::json!([{"desc": "Widget", "qty": 1, "unit_price": 25_000.0, "total": 25_000.0}]);
    let mut payload = invoice_payload("INV-D", 25_000.0, items.clone());
    payload["po_override"] = po_override(18_750.0, items);
    initial.invoice_payload = payload;

    let paused = state.engine.start("thread-4", initial).await.unwrap();
    assert_eq!(paused.status, WorkflowStatus::Paused);

    let pending = state.review_queue.list_pending().await.unwrap();
    let checkpoint_id = pending[0].checkpoint_id.clone();
    state
        .review_queue
        .decide(&checkpoint_id, ReviewDecision::Reject, "rev-1", None)
        .await
        .unwrap();

    let mut decision = StateDelta::new();
    decision.human_decision = Some(Some(HumanDecision::Reject));
    decision.reviewer_id = Some(Some("rev-1".to_string()));

    let resumed = state.engine.resume("thread-4", decision).await.unwrap();

    assert_eq!(resumed.status, WorkflowStatus::RequiresManualHandling);
    let payload = resumed.final_payload.unwrap();
    assert_eq!(payload["reviewer_id"], "rev-1");
    assert!(payload.get("erp_txn_id").is_none());
}

/// Scenario 5: ATLAS unreachable at startup still lets a small matched invoice complete, with
/// every ATLAS-routed tool call falling back locally.
#[tokio::test]
async fn atlas_transport_failure_still_completes_via_local_fallback() {
    let mut config = ServerConfig::default();
    config.tool_config.atlas_url = "http://127.0.0.1:1".to_string();
    config.tool_config.mock_fallback = false;
    let state = AppState::build(config);

    let mut initial = WorkflowState::new("thread-5".to_string());
    initial.invoice_payload = invoice_payload(
        "INV-E",
        500.0,
        serde_json::json!([{"desc": "Pen", "qty": 10, "unit_price": 50.0, "total": 500.0}]),
    );

    let result = state.engine.start("thread-5", initial).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert!(result.posted);
    assert!(!result.error_log.is_empty(), "ATLAS fallback should be noted in the error_log");
}

/// Scenario 6: a subscriber that attaches after `workflow_complete` still sees the full history
/// and then the stream closes.
#[tokio::test]
async fn late_subscriber_replays_full_history_then_closes() {
    let state = AppState::build(ServerConfig::default());
    let mut initial = WorkflowState::new("thread-6".to_string());
    initial.invoice_payload = invoice_payload(
        "INV-F",
        500.0,
        serde_json::json!([{"desc": "Pen", "qty": 10, "unit_price": 50.0, "total": 500.0}]),
    );

    let result = state.engine.start("thread-6", initial).await.unwrap();
    assert_eq!(result.status, WorkflowStatus::Completed);

    let mut stream = state.bus.subscribe("thread-6", SubscribeOptions::default());
    let mut saw_terminal = false;
    while let Some(event) = stream.next().await {
        if event.is_workflow_complete() {
            saw_terminal = true;
            break;
        }
    }
    assert!(saw_terminal, "late subscriber must observe workflow_complete in replayed history");
    assert!(stream.next().await.is_none(), "stream must close right after the terminal event");
}

/// A duplicate decision POST against an already-REVIEWED checkpoint must not re-run the engine;
/// status stays whatever the first resume left it at.
#[tokio::test]
async fn duplicate_decision_after_resume_is_idempotent() {
    let state = AppState::build(ServerConfig::default());
    let mut initial = WorkflowState::new("thread-7".to_string());
    let items = serde_json::json!([{"desc": "Widget", "qty": 1, "unit_price": 25_000.0, "total": 25_000.0}]);
    let mut payload = invoice_payload("INV-G", 25_000.0, items.clone());
    payload["po_override"] = po_override(18_750.0, items);
    initial.invoice_payload = payload;

    state.engine.start("thread-7", initial).await.unwrap();
    let pending = state.review_queue.list_pending().await.unwrap();
    let checkpoint_id = pending[0].checkpoint_id.clone();

    state
        .review_queue
        .decide(&checkpoint_id, ReviewDecision::Accept, "rev-1", None)
        .await
        .unwrap();
    let mut decision = StateDelta::new();
    decision.human_decision = Some(Some(HumanDecision::Accept));
    decision.reviewer_id = Some(Some("rev-1".to_string()));
    let resumed = state.engine.resume("thread-7", decision).await.unwrap();
    assert_eq!(resumed.status, WorkflowStatus::Completed);

    // A second identical decide() against the now-REVIEWED record is a no-op.
    state
        .review_queue
        .decide(&checkpoint_id, ReviewDecision::Accept, "rev-1", None)
        .await
        .unwrap();
    let record = state.review_queue.get(&checkpoint_id).await.unwrap().unwrap();
    assert_eq!(record.status, ledgerflow_checkpoint::ReviewStatus::Reviewed);

    // Resuming an already-completed thread a second time is rejected, not re-run.
    let mut decision_again = StateDelta::new();
    decision_again.human_decision = Some(Some(HumanDecision::Accept));
    let err = state.engine.resume("thread-7", decision_again).await;
    assert!(err.is_err(), "thread is no longer PAUSED; a second resume must not re-run RECONCILE");
}
