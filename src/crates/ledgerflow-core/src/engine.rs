//! The Workflow Engine: drives one workflow thread through the fixed topology.
//!
//! [`Engine`] owns the stage registry, the checkpoint store, and the observer, and runs the
//! execution contract for a single node call:
//!
//! 1. Receive an immutable state snapshot.
//! 2. Emit `stage_update(stage, started)`.
//! 3. Execute the stage. On any error, emit `stage_update(stage, failed)`, merge a terminal
//!    failure delta, and route to the end — no automatic retries.
//! 4. On success, emit `stage_update(stage, completed)`.
//! 5. Merge the returned delta into state.
//! 6. Write a checkpoint before moving to the next node.
//!
//! `HITL_DECISION` is the only suspension point. When a stage returns
//! [`NodeOutcome::Suspend`](crate::stage::NodeOutcome::Suspend), the engine persists the current
//! state with a pending-interrupt marker, transitions `status` to `PAUSED`, and returns without
//! emitting `workflow_complete` — the caller's background task simply exits. [`Engine::resume`]
//! later restores that checkpoint, merges the reviewer's decision, and re-enters the same node.

use std::collections::HashMap;
use std::sync::Arc;

use ledgerflow_checkpoint::{CheckpointConfig, CheckpointSaver, PendingInterrupt};

use crate::error::{EngineError, Result};
use crate::graph::next_stage;
use crate::observer::EngineObserver;
use crate::stage::{NodeOutcome, StageExecutor, StageId};
use crate::state::{StateDelta, WorkflowState, WorkflowStatus};

/// Runs workflows over the fixed twelve-stage topology.
pub struct Engine {
    checkpointer: Arc<dyn CheckpointSaver>,
    observer: Arc<dyn EngineObserver>,
    stages: HashMap<StageId, Arc<dyn StageExecutor>>,
    /// `match_threshold` used by the `shouldCheckpoint` routing predicate.
    match_threshold: f64,
}

impl Engine {
    /// Build an engine. Stages must be registered with [`Engine::register`] before
    /// [`Engine::start`] is called for any of them; an unregistered stage is a configuration
    /// error, not a runtime one, so it is checked eagerly by [`Engine::ensure_fully_registered`].
    pub fn new(
        checkpointer: Arc<dyn CheckpointSaver>,
        observer: Arc<dyn EngineObserver>,
        match_threshold: f64,
    ) -> Self {
        Self {
            checkpointer,
            observer,
            stages: HashMap::new(),
            match_threshold,
        }
    }

    /// Register the executor for `stage`.
    pub fn register(&mut self, stage: StageId, executor: Arc<dyn StageExecutor>) {
        self.stages.insert(stage, executor);
    }

    /// Validate that every stage has a registered executor.
    pub fn ensure_fully_registered(&self) -> Result<()> {
        for stage in StageId::ALL {
            if !self.stages.contains_key(&stage) {
                return Err(EngineError::Validation(format!(
                    "no executor registered for stage {}",
                    stage.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Start a brand-new workflow at `INTAKE`.
    pub async fn start(&self, thread_id: &str, initial_state: WorkflowState) -> Result<WorkflowState> {
        self.run_from(thread_id, StageId::Intake, initial_state).await
    }

    /// Resume a suspended workflow, delivering `decision` to the node it suspended at.
    ///
    /// Fails with [`EngineError::NotPaused`] unless the thread's current status is
    /// `WorkflowStatus::Paused`, and with [`EngineError::NoPendingInterrupt`] if the latest
    /// checkpoint carries no suspension marker — both reject a resume against a thread that
    /// isn't actually waiting, per the HITL protocol's re-entry guarantee.
    pub async fn resume(&self, thread_id: &str, decision: StateDelta) -> Result<WorkflowState> {
        let tuple = self
            .checkpointer
            .get_tuple(&CheckpointConfig::latest(thread_id))
            .await?
            .ok_or_else(|| EngineError::NoPendingInterrupt(thread_id.to_string()))?;

        let PendingInterrupt { node, .. } = tuple
            .checkpoint
            .pending_interrupt
            .clone()
            .ok_or_else(|| EngineError::NoPendingInterrupt(thread_id.to_string()))?;

        let mut state: WorkflowState = serde_json::from_value(tuple.checkpoint.serialized_state)?;
        if state.status != WorkflowStatus::Paused {
            return Err(EngineError::NotPaused(thread_id.to_string()));
        }

        let position = StageId::from_str(&node)
            .ok_or_else(|| EngineError::Validation(format!("unknown position node '{node}'")))?;

        state.apply(decision);
        state.status = WorkflowStatus::Running;
        self.run_from(thread_id, position, state).await
    }

    async fn run_from(
        &self,
        thread_id: &str,
        mut stage: StageId,
        mut state: WorkflowState,
    ) -> Result<WorkflowState> {
        loop {
            let executor = self
                .stages
                .get(&stage)
                .ok_or_else(|| EngineError::Validation(format!("no executor for {}", stage.as_str())))?
                .clone();

            self.observer.stage_started(thread_id, stage.as_str()).await;

            let outcome = executor.run(&state).await;

            match outcome {
                Ok(NodeOutcome::Suspend(payload)) => {
                    let mut paused = state.clone();
                    paused.current_stage = stage.as_str().to_string();
                    paused.status = WorkflowStatus::Paused;

                    let serialized = serde_json::to_value(&paused)?;
                    self.checkpointer
                        .put(
                            thread_id,
                            serialized,
                            stage.as_str().to_string(),
                            Some(PendingInterrupt::new(stage.as_str(), payload)),
                        )
                        .await?;

                    return Ok(paused);
                }
                Ok(NodeOutcome::Delta(delta)) => {
                    state.apply(delta);
                    state.current_stage = stage.as_str().to_string();

                    self.observer
                        .stage_completed(thread_id, stage.as_str(), serde_json::json!({}))
                        .await;

                    let serialized = serde_json::to_value(&state)?;
                    self.checkpointer
                        .put(thread_id, serialized, stage.as_str().to_string(), None)
                        .await?;

                    if state.status == WorkflowStatus::Failed {
                        self.observer.workflow_complete(thread_id, state.status).await;
                        return Ok(state);
                    }

                    match next_stage(stage, &state, self.match_threshold) {
                        Some(next) => stage = next,
                        None => {
                            self.observer.workflow_complete(thread_id, state.status).await;
                            return Ok(state);
                        }
                    }
                }
                Err(err) => {
                    self.observer
                        .stage_failed(thread_id, stage.as_str(), &err.to_string())
                        .await;

                    state.apply(StateDelta::failure(stage.as_str(), err.to_string()));
                    state.current_stage = stage.as_str().to_string();

                    let serialized = serde_json::to_value(&state)?;
                    self.checkpointer
                        .put(thread_id, serialized, stage.as_str().to_string(), None)
                        .await?;

                    self.observer
                        .workflow_complete(thread_id, WorkflowStatus::Failed)
                        .await;
                    return Ok(state);
                }
            }
        }
    }
}
