//! Pending Review Record storage (spec §3.3).
//!
//! A [`PendingReviewRecord`] is created once, by the `CHECKPOINT_HITL` stage,
//! and mutated exactly once: from `PENDING` to `REVIEWED`, by the decision
//! endpoint. It is never deleted. [`ReviewQueue`] is the storage seam both the
//! stage (to create) and the HTTP layer (to list, fetch, and decide) depend
//! on, the same way [`crate::CheckpointSaver`] is the seam the engine depends
//! on for checkpoints — co-located here because both are plain keyed
//! persistence with an identical durability shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CheckpointError, Result};

/// Lifecycle of a pending review record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    /// Created at `CHECKPOINT_HITL`; awaiting a reviewer decision.
    Pending,
    /// A decision has been recorded; terminal.
    Reviewed,
}

/// The reviewer's decision, mirroring [`ledgerflow_core`]'s `HumanDecision`
/// without introducing a dependency cycle (this crate sits below `core`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Accept,
    Reject,
}

/// A single externalized request for human review, created at `CHECKPOINT_HITL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReviewRecord {
    /// Primary key; also the `hitl_checkpoint_id` surfaced in workflow state.
    pub review_id: String,
    pub thread_id: String,
    /// The checkpoint written immediately before suspension.
    pub checkpoint_id: String,
    pub invoice_id: String,
    pub vendor_name: String,
    pub amount: f64,
    pub currency: String,
    pub match_score: f64,
    pub match_evidence: serde_json::Value,
    pub reason_for_hold: String,
    pub review_url: String,
    pub status: ReviewStatus,
    pub decision: Option<ReviewDecision>,
    pub reviewer_id: Option<String>,
    pub reviewer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl PendingReviewRecord {
    /// Construct a fresh `PENDING` record. `review_id` is generated.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        thread_id: impl Into<String>,
        checkpoint_id: impl Into<String>,
        invoice_id: impl Into<String>,
        vendor_name: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        match_score: f64,
        match_evidence: serde_json::Value,
        reason_for_hold: impl Into<String>,
        review_url: impl Into<String>,
    ) -> Self {
        Self {
            review_id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            checkpoint_id: checkpoint_id.into(),
            invoice_id: invoice_id.into(),
            vendor_name: vendor_name.into(),
            amount,
            currency: currency.into(),
            match_score,
            match_evidence,
            reason_for_hold: reason_for_hold.into(),
            review_url: review_url.into(),
            status: ReviewStatus::Pending,
            decision: None,
            reviewer_id: None,
            reviewer_notes: None,
            created_at: Utc::now(),
            reviewed_at: None,
        }
    }
}

/// Storage backend for pending review records.
///
/// Implementations must make [`ReviewQueue::decide`] an idempotent success
/// when called twice with the same review already `REVIEWED`, rather than
/// erroring or re-applying the decision.
#[async_trait]
pub trait ReviewQueue: Send + Sync {
    /// Persist a freshly created `PENDING` record.
    async fn create(&self, record: PendingReviewRecord) -> Result<()>;

    /// Fetch one record by id.
    async fn get(&self, review_id: &str) -> Result<Option<PendingReviewRecord>>;

    /// Every record currently `PENDING`, oldest first.
    async fn list_pending(&self) -> Result<Vec<PendingReviewRecord>>;

    /// Record the reviewer's decision. If `review_id` is already `REVIEWED`,
    /// this is a no-op success returning the existing record unchanged
    /// (idempotent-duplicate-POST semantics); otherwise it transitions
    /// `PENDING -> REVIEWED` and stamps `reviewed_at`.
    async fn decide(
        &self,
        review_id: &str,
        decision: ReviewDecision,
        reviewer_id: &str,
        reviewer_notes: Option<String>,
    ) -> Result<PendingReviewRecord>;
}

/// In-memory [`ReviewQueue`], guarded by a single `RwLock` — reads (listing,
/// lookups) are far more frequent than the one-time create and one-time
/// decide per record.
#[derive(Default)]
pub struct InMemoryReviewQueue {
    records: Arc<RwLock<HashMap<String, PendingReviewRecord>>>,
}

impl InMemoryReviewQueue {
    /// Construct an empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewQueue for InMemoryReviewQueue {
    async fn create(&self, record: PendingReviewRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.review_id.clone(), record);
        Ok(())
    }

    async fn get(&self, review_id: &str) -> Result<Option<PendingReviewRecord>> {
        Ok(self.records.read().await.get(review_id).cloned())
    }

    async fn list_pending(&self) -> Result<Vec<PendingReviewRecord>> {
        let mut pending: Vec<PendingReviewRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.status == ReviewStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    async fn decide(
        &self,
        review_id: &str,
        decision: ReviewDecision,
        reviewer_id: &str,
        reviewer_notes: Option<String>,
    ) -> Result<PendingReviewRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(review_id)
            .ok_or_else(|| CheckpointError::NotFound(review_id.to_string()))?;

        if record.status == ReviewStatus::Reviewed {
            return Ok(record.clone());
        }

        record.status = ReviewStatus::Reviewed;
        record.decision = Some(decision);
        record.reviewer_id = Some(reviewer_id.to_string());
        record.reviewer_notes = reviewer_notes;
        record.reviewed_at = Some(Utc::now());
        Ok(record.clone())
    }
}
