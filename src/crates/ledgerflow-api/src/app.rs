//! Shared application state: the built [`Engine`], its [`EventBus`], the review queue, and a
//! thread registry the HTTP layer uses for `/workflow/all` (the engine itself is keyed by
//! `thread_id` alone and keeps no cross-thread index — see `CheckpointSaver`'s docs).

use std::sync::Arc;

use dashmap::DashMap;

use ledgerflow_bus::EventBus;
use ledgerflow_checkpoint::{CheckpointSaver, InMemoryCheckpointSaver, InMemoryReviewQueue, ReviewQueue};
use ledgerflow_core::engine::Engine;
use ledgerflow_core::state::WorkflowState;
use ledgerflow_stages::{
    ApproveStage, CheckpointHitlStage, CompleteStage, HitlDecisionStage, IntakeStage, ManualHandoffStage,
    MatchTwoWayStage, NotifyStage, PostingStage, PrepareStage, ReconcileStage, RetrieveStage, UnderstandStage,
};
use ledgerflow_core::stage::StageId;
use ledgerflow_tools::{BigtoolOrchestrator, NullToolSelector};

use crate::config::ServerConfig;
use crate::observer::BusObserver;

/// Everything a handler needs, cloned cheaply (every field is an `Arc` or already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub bus: EventBus,
    pub review_queue: Arc<dyn ReviewQueue>,
    pub checkpointer: Arc<dyn CheckpointSaver>,
    pub config: Arc<ServerConfig>,
    /// Last known state per thread, updated after every `start`/`resume` call. Exists purely so
    /// `GET /workflow/all` and `GET /invoice/{thread_id}/status` have something to list without
    /// round-tripping through the checkpoint store for every thread on every request.
    threads: Arc<DashMap<String, WorkflowState>>,
}

impl AppState {
    /// Build the full stack from `config`: wires the Bigtool orchestrator, the event bus, the
    /// review queue and checkpoint store, registers all thirteen stage executors against the
    /// engine, and returns the ready-to-serve state.
    pub fn build(config: ServerConfig) -> Self {
        let bus = EventBus::new();
        let review_queue: Arc<dyn ReviewQueue> = Arc::new(InMemoryReviewQueue::new());
        let checkpointer: Arc<dyn CheckpointSaver> = Arc::new(InMemoryCheckpointSaver::new());

        let tools = Arc::new(BigtoolOrchestrator::new(
            config.tool_config.clone(),
            Arc::new(NullToolSelector),
        ));

        let observer = Arc::new(BusObserver::new(bus.clone()));
        let mut engine = Engine::new(checkpointer.clone(), observer, config.stage_config.match_threshold);

        engine.register(StageId::Intake, Arc::new(IntakeStage::new(tools.clone(), Some(Arc::new(bus.clone())))));
        engine.register(
            StageId::Understand,
            Arc::new(UnderstandStage::new(tools.clone(), Some(Arc::new(bus.clone())))),
        );
        engine.register(StageId::Prepare, Arc::new(PrepareStage::new(tools.clone(), Some(Arc::new(bus.clone())))));
        engine.register(
            StageId::Retrieve,
            Arc::new(RetrieveStage::new(tools.clone(), Some(Arc::new(bus.clone())))),
        );
        engine.register(
            StageId::MatchTwoWay,
            Arc::new(MatchTwoWayStage::new(tools.clone(), Some(Arc::new(bus.clone())), config.stage_config)),
        );
        engine.register(
            StageId::CheckpointHitl,
            Arc::new(CheckpointHitlStage::new(review_queue.clone(), config.review_base_url.clone())),
        );
        engine.register(StageId::HitlDecision, Arc::new(HitlDecisionStage));
        engine.register(
            StageId::Reconcile,
            Arc::new(ReconcileStage::new(tools.clone(), Some(Arc::new(bus.clone())))),
        );
        engine.register(
            StageId::Approve,
            Arc::new(ApproveStage::new(tools.clone(), Some(Arc::new(bus.clone())), config.stage_config)),
        );
        engine.register(StageId::Posting, Arc::new(PostingStage::new(tools.clone(), Some(Arc::new(bus.clone())))));
        engine.register(StageId::Notify, Arc::new(NotifyStage::new(tools.clone(), Some(Arc::new(bus.clone())))));
        engine.register(StageId::Complete, Arc::new(CompleteStage));
        engine.register(StageId::ManualHandoff, Arc::new(ManualHandoffStage));

        engine
            .ensure_fully_registered()
            .expect("every StageId variant is registered above");

        Self {
            engine: Arc::new(engine),
            bus,
            review_queue,
            checkpointer,
            config: Arc::new(config),
            threads: Arc::new(DashMap::new()),
        }
    }

    /// Record `state` as the latest known snapshot for its thread.
    pub fn remember(&self, state: WorkflowState) {
        self.threads.insert(state.thread_id.clone(), state);
    }

    /// The latest known snapshot for `thread_id`, if this process has seen it.
    pub fn snapshot(&self, thread_id: &str) -> Option<WorkflowState> {
        self.threads.get(thread_id).map(|entry| entry.clone())
    }

    /// Every thread this process has started or resumed, most recently touched last.
    pub fn all_threads(&self) -> Vec<WorkflowState> {
        self.threads.iter().map(|entry| entry.value().clone()).collect()
    }
}
