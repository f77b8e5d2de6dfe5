//! [`BusObserver`]: the concrete [`EngineObserver`] that publishes the engine's lifecycle
//! notifications onto the [`EventBus`], per spec §3.4's `stage_update` event arm.
//!
//! The engine knows nothing about the bus (see `ledgerflow_core::observer` docs); this is the
//! one piece of wiring that connects them, built once at startup and handed to
//! [`ledgerflow_core::engine::Engine::new`].

use async_trait::async_trait;

use ledgerflow_bus::{Event, EventBus, StageUpdateStatus};
use ledgerflow_core::observer::EngineObserver;
use ledgerflow_core::state::WorkflowStatus;

/// Publishes every engine notification as a `stage_update` event on the bus.
pub struct BusObserver {
    bus: EventBus,
}

impl BusObserver {
    /// Wire an observer backed by `bus`.
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl EngineObserver for BusObserver {
    async fn stage_started(&self, thread_id: &str, stage: &str) {
        self.bus.publish(Event::stage_update(
            thread_id,
            stage,
            StageUpdateStatus::Started,
            serde_json::json!({}),
        ));
    }

    async fn stage_completed(&self, thread_id: &str, stage: &str, data: serde_json::Value) {
        self.bus
            .publish(Event::stage_update(thread_id, stage, StageUpdateStatus::Completed, data));
    }

    async fn stage_failed(&self, thread_id: &str, stage: &str, error: &str) {
        self.bus.publish(Event::stage_update(
            thread_id,
            stage,
            StageUpdateStatus::Failed,
            serde_json::json!({"error": error}),
        ));
        self.bus.publish(Event::log(
            thread_id,
            ledgerflow_bus::LogLevel::Error,
            error.to_string(),
            Some(stage.to_string()),
        ));
    }

    async fn workflow_complete(&self, thread_id: &str, status: WorkflowStatus) {
        self.bus.publish(Event::stage_update(
            thread_id,
            "COMPLETE",
            StageUpdateStatus::WorkflowComplete,
            serde_json::json!({"final_status": status}),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerflow_bus::SubscribeOptions;
    use futures::StreamExt;

    #[tokio::test]
    async fn stage_started_then_completed_then_workflow_complete_are_published_in_order() {
        let bus = EventBus::new();
        let observer = BusObserver::new(bus.clone());

        observer.stage_started("t1", "INTAKE").await;
        observer.stage_completed("t1", "INTAKE", serde_json::json!({})).await;
        observer.workflow_complete("t1", WorkflowStatus::Completed).await;

        let mut stream = bus.subscribe("t1", SubscribeOptions::default());
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Event::StageUpdate { status: StageUpdateStatus::Started, .. }));
        let second = stream.next().await.unwrap();
        assert!(matches!(second, Event::StageUpdate { status: StageUpdateStatus::Completed, .. }));
        let third = stream.next().await.unwrap();
        assert!(third.is_workflow_complete());
    }

    #[tokio::test]
    async fn stage_failed_emits_a_failed_stage_update_and_an_error_log() {
        let bus = EventBus::new();
        let observer = BusObserver::new(bus.clone());

        observer.stage_failed("t1", "RETRIEVE", "erp down").await;

        let mut stream = bus.subscribe("t1", SubscribeOptions::default());
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Event::StageUpdate { status: StageUpdateStatus::Failed, .. }));
        let second = stream.next().await.unwrap();
        assert!(matches!(second, Event::Log { level: ledgerflow_bus::LogLevel::Error, .. }));
    }
}
