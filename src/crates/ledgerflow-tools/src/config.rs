//! Startup-time configuration for the Bigtool orchestrator.

use std::time::Duration;

use ledgerflow_bus::ToolServer;

/// Recommended connect deadline for outbound tool RPCs.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Recommended total deadline for outbound tool RPCs.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrator-wide configuration, set once at startup.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Base URL of the COMMON capability server.
    pub common_url: String,
    /// Base URL of the ATLAS capability server.
    pub atlas_url: String,
    /// Connect timeout for outbound RPCs.
    pub connect_timeout: Duration,
    /// Total timeout (connect + read) for outbound RPCs.
    pub total_timeout: Duration,
    /// If true, a transport error synthesizes a canonical mock response
    /// instead of surfacing as a failure.
    pub mock_fallback: bool,
    /// If true, attempt description-based (LLM) tool selection before
    /// falling back to the capability map. If false, the capability map is
    /// used directly and no discovery RPC is made.
    pub use_description_discovery: bool,
}

impl ToolConfig {
    /// Base URL for `server`.
    pub fn url_for(&self, server: ToolServer) -> &str {
        match server {
            ToolServer::Common => &self.common_url,
            ToolServer::Atlas => &self.atlas_url,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            common_url: "http://127.0.0.1:8101".to_string(),
            atlas_url: "http://127.0.0.1:8102".to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
            mock_fallback: true,
            use_description_discovery: true,
        }
    }
}
