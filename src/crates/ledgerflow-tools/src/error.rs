//! Error types for the Bigtool orchestrator.

use thiserror::Error;

/// Result type for Bigtool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors the orchestrator itself can raise.
///
/// A transport or semantic error from a *capability server* is never one of
/// these — it is folded into [`crate::orchestrator::ToolOutcome`] as a soft
/// failure the calling stage absorbs. `ToolError` covers only configuration
/// and discovery-layer problems that mean the call could not even be
/// attempted.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No capability-map entry exists for a requested capability, and
    /// description-based discovery (if attempted) also failed to resolve one.
    #[error("no tool registered for capability '{0}'")]
    UnknownCapability(String),

    /// The capability server's base URL is not configured.
    #[error("no server URL configured for {0:?}")]
    ServerNotConfigured(ledgerflow_bus::ToolServer),

    /// JSON (de)serialization of a tool call failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
