//! HTTP handlers for the Intake/Resume API (spec §6.1).
//!
//! Submission and resume both run the engine in a detached `tokio::spawn` task — the handler
//! returns as soon as the state is durably recorded as `RUNNING`/`PAUSED`-about-to-resume, per
//! §6.1's "returns immediately; workflow runs in background" contract. The spawned task's only
//! job afterward is to call back into `AppState::remember` so `/workflow/all` and the status
//! endpoints see the final snapshot without polling the checkpoint store.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use ledgerflow_checkpoint::{CheckpointConfig, ReviewStatus};
use ledgerflow_core::state::WorkflowState;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{
    stage_catalog, new_thread_id, validate_submit_request, ApiReviewDecision, DecisionRequest, DecisionResponse,
    InvoiceSubmitRequest, PendingReviewDetailResponse, PendingReviewListResponse, PendingReviewResponse,
    StageCatalogEntry, SubmitResponse, WorkflowAllResponse, WorkflowStatusResponse, WorkflowSummary,
};
use crate::app::AppState;

/// `POST /invoice/submit`
pub async fn submit_invoice(
    State(state): State<AppState>,
    Json(request): Json<InvoiceSubmitRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    validate_submit_request(&request)?;

    let thread_id = new_thread_id();
    let mut initial = WorkflowState::new(thread_id.clone());
    initial.invoice_payload = request.into_payload();
    state.remember(initial.clone());

    let engine = state.engine.clone();
    let app_state = state.clone();
    let spawned_thread_id = thread_id.clone();
    tokio::spawn(async move {
        match engine.start(&spawned_thread_id, initial).await {
            Ok(final_state) => app_state.remember(final_state),
            Err(err) => tracing::error!(thread_id = %spawned_thread_id, %err, "workflow run ended in error"),
        }
    });

    Ok(Json(SubmitResponse {
        thread_id,
        status: ledgerflow_core::state::WorkflowStatus::Running,
        current_stage: "INTAKE".to_string(),
        message: "invoice accepted; processing started".to_string(),
    }))
}

/// `GET /invoice/status/{thread_id}` and `GET /workflow/status/{thread_id}`.
pub async fn workflow_status(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<WorkflowStatusResponse>> {
    let snapshot = state
        .snapshot(&thread_id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown thread_id '{thread_id}'")))?;
    Ok(Json(WorkflowStatusResponse::from(&snapshot)))
}

/// `GET /workflow/all`
pub async fn list_workflows(State(state): State<AppState>) -> Json<WorkflowAllResponse> {
    let workflows: Vec<WorkflowSummary> = state.all_threads().iter().map(WorkflowSummary::from).collect();
    let total = workflows.len();
    Json(WorkflowAllResponse { workflows, total })
}

/// `GET /workflow/stages`
pub async fn workflow_stages() -> Json<Vec<StageCatalogEntry>> {
    Json(stage_catalog())
}

/// `GET /human-review/pending`
pub async fn list_pending_reviews(State(state): State<AppState>) -> ApiResult<Json<PendingReviewListResponse>> {
    let records = state.review_queue.list_pending().await.map_err(ApiError::from)?;
    let items: Vec<PendingReviewResponse> = records.into_iter().map(PendingReviewResponse::from).collect();
    let total = items.len();
    Ok(Json(PendingReviewListResponse { items, total }))
}

/// `GET /human-review/{checkpoint_id}`
pub async fn get_pending_review(
    State(state): State<AppState>,
    Path(checkpoint_id): Path<String>,
) -> ApiResult<Json<PendingReviewDetailResponse>> {
    let record = state
        .review_queue
        .get(&checkpoint_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("unknown checkpoint_id '{checkpoint_id}'")))?;

    let workflow = state.snapshot(&record.thread_id).as_ref().map(WorkflowStatusResponse::from);

    Ok(Json(PendingReviewDetailResponse {
        review: PendingReviewResponse::from(record),
        workflow,
    }))
}

/// `POST /human-review/decision`
pub async fn submit_decision(
    State(state): State<AppState>,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<DecisionResponse>> {
    let record = state
        .review_queue
        .get(&request.checkpoint_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("unknown checkpoint_id '{}'", request.checkpoint_id)))?;

    if record.thread_id != request.thread_id {
        return Err(ApiError::BadRequest(
            "thread_id does not match the review record's thread_id".to_string(),
        ));
    }

    let already_reviewed = record.status == ReviewStatus::Reviewed;
    let decision = request.decision;

    state
        .review_queue
        .decide(
            &request.checkpoint_id,
            decision.into(),
            &request.reviewer_id,
            request.notes.clone(),
        )
        .await
        .map_err(ApiError::from)?;

    // A duplicate decision POST against an already-REVIEWED record is an idempotent success
    // (spec §9's resolved Open Question): the review queue already no-op'd the mutation above,
    // and since the workflow has already resumed and moved on, resuming it again would either
    // error (no longer PAUSED) or, worse, re-run RECONCILE — so we report success without
    // touching the engine a second time.
    if already_reviewed {
        let snapshot = state.snapshot(&request.thread_id);
        return Ok(Json(DecisionResponse {
            success: true,
            thread_id: request.thread_id,
            checkpoint_id: request.checkpoint_id,
            decision,
            next_stage: snapshot.as_ref().map(|s| s.current_stage.clone()).unwrap_or_default(),
            status: snapshot.map(|s| s.status).unwrap_or(ledgerflow_core::state::WorkflowStatus::Completed),
            message: "decision already recorded; no action taken".to_string(),
        }));
    }

    let thread_id = request.thread_id.clone();
    let checkpoint_id = request.checkpoint_id.clone();
    let delta = DecisionRequest {
        thread_id: thread_id.clone(),
        checkpoint_id: checkpoint_id.clone(),
        decision,
        reviewer_id: request.reviewer_id.clone(),
        notes: request.notes.clone(),
    }
    .into_delta();

    let next_stage = match decision {
        ApiReviewDecision::Accept => "RECONCILE",
        ApiReviewDecision::Reject => "MANUAL_HANDOFF",
    }
    .to_string();

    let engine = state.engine.clone();
    let app_state = state.clone();
    let resume_thread_id = thread_id.clone();
    tokio::spawn(async move {
        match engine.resume(&resume_thread_id, delta).await {
            Ok(final_state) => app_state.remember(final_state),
            Err(err) => tracing::error!(thread_id = %resume_thread_id, %err, "resume ended in error"),
        }
    });

    Ok(Json(DecisionResponse {
        success: true,
        thread_id,
        checkpoint_id,
        decision,
        next_stage,
        status: ledgerflow_core::state::WorkflowStatus::Running,
        message: "decision recorded; workflow resuming".to_string(),
    }))
}

/// `GET /health`, `GET /events/health`, and `GET /` — trivial liveness checks (spec §6.1).
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Diagnostics-only: confirms a thread's checkpoint chain exists, independent of the in-memory
/// `AppState` registry (useful after a process restart loses the registry but the checkpoint
/// store — if backed by something durable — has not).
pub async fn checkpoint_exists(State(state): State<AppState>, Path(thread_id): Path<String>) -> ApiResult<Json<bool>> {
    let tuple = state
        .checkpointer
        .get_tuple(&CheckpointConfig::latest(&thread_id))
        .await
        .map_err(ApiError::from)?;
    Ok(Json(tuple.is_some()))
}
