//! Helpers shared by every stage that calls through the Bigtool orchestrator.
//!
//! `tool_call` events are created by stage executors directly, not by the engine observer (which
//! only announces stage lifecycle) — so every stage that talks to a capability server holds its
//! own `Arc<EventBus>` and publishes the started/completed-or-failed pair itself.

use std::sync::Arc;

use ledgerflow_bus::{Event, EventBus, ToolCallStatus};
use ledgerflow_tools::{BigtoolOrchestrator, Capability, ToolOutcome};

/// Call `capability` through `tools`, publishing the paired `tool_call` events on `bus` (if
/// wired) and returning the raw outcome for the caller to fold into its delta.
pub async fn call_tool(
    bus: Option<&Arc<EventBus>>,
    tools: &BigtoolOrchestrator,
    thread_id: &str,
    stage: &str,
    capability: Capability,
    task: &str,
    params: serde_json::Value,
) -> ToolOutcome {
    if let Some(bus) = bus {
        let (tool_name, server) = capability.default_tool();
        bus.publish(Event::tool_call(thread_id, stage, tool_name, server, ToolCallStatus::Started));
    }

    let outcome = tools.execute(capability, task, params).await.unwrap_or_else(|err| {
        let (tool_name, server) = capability.default_tool();
        ToolOutcome::TransportError {
            tool_name: tool_name.to_string(),
            server,
            message: err.to_string(),
            mocked: None,
        }
    });

    if let Some(bus) = bus {
        let status = match &outcome {
            ToolOutcome::Success { .. } => ToolCallStatus::Completed,
            ToolOutcome::TransportError { mocked: Some(_), .. } => ToolCallStatus::Completed,
            ToolOutcome::HttpError { .. } | ToolOutcome::TransportError { mocked: None, .. } => {
                ToolCallStatus::Failed
            }
        };
        bus.publish(Event::tool_call(
            thread_id,
            stage,
            outcome.tool_name(),
            outcome.server(),
            status,
        ));
    }

    outcome
}

/// Build the one-entry `bigtool_selections` delta fragment every external-call stage contributes:
/// `stage -> tool_name`.
pub fn selection_entry(stage: &str, outcome: &ToolOutcome) -> (String, String) {
    (stage.to_string(), outcome.tool_name().to_string())
}
