//! Event wire types published on the bus.
//!
//! Every event carries at minimum a `type` tag and a timestamp; all but [`Event::Heartbeat`]
//! carry a `thread_id`. These are the same JSON shapes the HTTP layer serializes verbatim onto
//! an SSE stream, so field names and tag strings are load-bearing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase reported by a `stage_update` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageUpdateStatus {
    Started,
    Completed,
    Failed,
    WorkflowComplete,
}

/// Severity of a `log` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Which capability server a `tool_call` event targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolServer {
    Common,
    Atlas,
}

/// Lifecycle phase reported by a `tool_call` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Started,
    Completed,
    Failed,
}

/// A single event on the bus. Tagged by `type` so it serializes straight onto the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A stage transitioned, or the workflow as a whole reached a terminal state.
    #[serde(rename = "stage_update")]
    StageUpdate {
        thread_id: String,
        stage: String,
        status: StageUpdateStatus,
        data: serde_json::Value,
        ts: DateTime<Utc>,
    },
    /// A free-form log line, optionally attributed to a stage.
    #[serde(rename = "log")]
    Log {
        thread_id: String,
        level: LogLevel,
        message: String,
        stage: Option<String>,
        log_type: Option<String>,
        details: Option<serde_json::Value>,
        ts: DateTime<Utc>,
    },
    /// A Bigtool call was made on behalf of a stage.
    #[serde(rename = "tool_call")]
    ToolCall {
        thread_id: String,
        stage: String,
        tool_name: String,
        server: ToolServer,
        params: Option<serde_json::Value>,
        result: Option<serde_json::Value>,
        status: ToolCallStatus,
        ts: DateTime<Utc>,
    },
    /// Synthetic event marking the end of history replay for a new subscriber.
    #[serde(rename = "connected")]
    Connected { thread_id: String, ts: DateTime<Utc> },
    /// Synthetic keep-alive; never added to history.
    #[serde(rename = "heartbeat")]
    Heartbeat { ts: DateTime<Utc> },
}

impl Event {
    /// Build a `stage_update` event, stamped with the current time.
    pub fn stage_update(
        thread_id: impl Into<String>,
        stage: impl Into<String>,
        status: StageUpdateStatus,
        data: serde_json::Value,
    ) -> Self {
        Self::StageUpdate {
            thread_id: thread_id.into(),
            stage: stage.into(),
            status,
            data,
            ts: Utc::now(),
        }
    }

    /// Build a `log` event, stamped with the current time.
    pub fn log(
        thread_id: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
        stage: Option<String>,
    ) -> Self {
        Self::Log {
            thread_id: thread_id.into(),
            level,
            message: message.into(),
            stage,
            log_type: None,
            details: None,
            ts: Utc::now(),
        }
    }

    /// Build a `tool_call` event, stamped with the current time.
    pub fn tool_call(
        thread_id: impl Into<String>,
        stage: impl Into<String>,
        tool_name: impl Into<String>,
        server: ToolServer,
        status: ToolCallStatus,
    ) -> Self {
        Self::ToolCall {
            thread_id: thread_id.into(),
            stage: stage.into(),
            tool_name: tool_name.into(),
            server,
            params: None,
            result: None,
            status,
            ts: Utc::now(),
        }
    }

    /// Build the synthetic `connected` event sent after history replay.
    pub fn connected(thread_id: impl Into<String>) -> Self {
        Self::Connected {
            thread_id: thread_id.into(),
            ts: Utc::now(),
        }
    }

    /// Build the synthetic `heartbeat` event.
    pub fn heartbeat() -> Self {
        Self::Heartbeat { ts: Utc::now() }
    }

    /// The thread this event belongs to, or `None` for a `heartbeat`.
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Event::StageUpdate { thread_id, .. }
            | Event::Log { thread_id, .. }
            | Event::ToolCall { thread_id, .. }
            | Event::Connected { thread_id, .. } => Some(thread_id),
            Event::Heartbeat { .. } => None,
        }
    }

    /// True for the terminal `stage_update(workflow_complete)` event.
    pub fn is_workflow_complete(&self) -> bool {
        matches!(
            self,
            Event::StageUpdate {
                status: StageUpdateStatus::WorkflowComplete,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_update_carries_thread_id() {
        let e = Event::stage_update("t1", "INTAKE", StageUpdateStatus::Started, serde_json::json!({}));
        assert_eq!(e.thread_id(), Some("t1"));
        assert!(!e.is_workflow_complete());
    }

    #[test]
    fn workflow_complete_is_detected() {
        let e = Event::stage_update("t1", "NOTIFY", StageUpdateStatus::WorkflowComplete, serde_json::json!({}));
        assert!(e.is_workflow_complete());
    }

    #[test]
    fn heartbeat_has_no_thread_id() {
        assert_eq!(Event::heartbeat().thread_id(), None);
    }

    #[test]
    fn serializes_with_type_tag() {
        let e = Event::connected("t1");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["thread_id"], "t1");
    }
}
