//! The Bigtool orchestrator: resolves a [`Capability`] to a concrete tool
//! call and executes it over HTTP.
//!
//! Resolution tries description-based discovery first (when enabled),
//! falling back to the static capability map whenever discovery comes back
//! empty or the selector doesn't recognize any candidate. Execution then
//! issues a JSON RPC against the resolved server with a connect deadline and
//! a total deadline pulled from [`ToolConfig`], producing one of three
//! outcomes: success, an HTTP-level error response, or a transport error —
//! optionally softened into a mock success.

use std::sync::Arc;
use std::time::Duration;

use ledgerflow_bus::ToolServer;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::capability::Capability;
use crate::config::ToolConfig;
use crate::discovery::ToolDescriptionCache;
use crate::error::{Result, ToolError};
use crate::mock::mock_response_for;
use crate::selector::ToolSelectorModel;

/// The result of one Bigtool call, in terms the calling stage can branch on
/// without needing to know whether the call actually reached the network.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// The server returned a successful (2xx) response with a JSON body.
    Success { tool_name: String, server: ToolServer, body: Value },
    /// The server returned a non-2xx response.
    HttpError { tool_name: String, server: ToolServer, status: u16, body: Value },
    /// The request never completed (connect/total timeout, DNS failure,
    /// connection refused, ...). `mocked` is `Some` when `mock_fallback` was
    /// enabled and a canonical mock body was substituted.
    TransportError {
        tool_name: String,
        server: ToolServer,
        message: String,
        mocked: Option<Value>,
    },
}

impl ToolOutcome {
    /// The tool name this outcome resolved to, regardless of variant.
    pub fn tool_name(&self) -> &str {
        match self {
            ToolOutcome::Success { tool_name, .. }
            | ToolOutcome::HttpError { tool_name, .. }
            | ToolOutcome::TransportError { tool_name, .. } => tool_name,
        }
    }

    /// The server this outcome resolved to, regardless of variant.
    pub fn server(&self) -> ToolServer {
        match self {
            ToolOutcome::Success { server, .. }
            | ToolOutcome::HttpError { server, .. }
            | ToolOutcome::TransportError { server, .. } => *server,
        }
    }

    /// True if the call should be treated as usable data by the caller —
    /// either a genuine success or a mocked transport failure.
    pub fn is_usable(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
            || matches!(self, ToolOutcome::TransportError { mocked: Some(_), .. })
    }

    /// The response body to act on, if this outcome produced one.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ToolOutcome::Success { body, .. } => Some(body),
            ToolOutcome::TransportError { mocked: Some(body), .. } => Some(body),
            _ => None,
        }
    }
}

/// Shared, cloneable handle to the Bigtool orchestrator. Stages hold one of
/// these (via the engine's shared context) rather than constructing their
/// own HTTP client per call.
#[derive(Clone)]
pub struct BigtoolOrchestrator {
    config: Arc<ToolConfig>,
    client: reqwest::Client,
    discovery: Arc<ToolDescriptionCache>,
    selector: Arc<dyn ToolSelectorModel>,
}

impl BigtoolOrchestrator {
    pub fn new(config: ToolConfig, selector: Arc<dyn ToolSelectorModel>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_default();
        Self {
            config: Arc::new(config),
            client: client.clone(),
            discovery: Arc::new(ToolDescriptionCache::new(client)),
            selector,
        }
    }

    /// Force the discovery cache to drop, and re-fetch on next use, the tool
    /// descriptions for `server` (SPEC_FULL.md §C's forced-refresh seam).
    pub async fn refresh_discovery(&self, server: ToolServer) {
        self.discovery.refresh(&self.config, server).await;
    }

    /// Resolve `capability` to a concrete `(tool_name, server)` pair,
    /// trying description-based selection first when enabled.
    #[instrument(skip(self, task))]
    async fn resolve(&self, capability: Capability, task: &str) -> (String, ToolServer) {
        let (default_name, default_server) = capability.default_tool();

        if !self.config.use_description_discovery {
            return (default_name.to_string(), default_server);
        }

        let candidates = self.discovery.get_or_fetch(&self.config, default_server).await;
        match self.selector.select(capability.as_str(), task, &candidates).await {
            Some(name) if candidates.iter().any(|tool| tool.name == name) => {
                info!(capability = capability.as_str(), tool = %name, "resolved via description-based discovery");
                (name, default_server)
            }
            Some(name) => {
                warn!(
                    capability = capability.as_str(),
                    selected = %name,
                    "selector chose a tool outside the discovered set, falling back to capability map"
                );
                (default_name.to_string(), default_server)
            }
            None => (default_name.to_string(), default_server),
        }
    }

    /// Execute `capability` against its resolved tool with `params`. `task`
    /// is a short natural-language description passed to the selector when
    /// description-based discovery is in play; it otherwise has no effect.
    #[instrument(skip(self, params), fields(capability = capability.as_str()))]
    pub async fn execute(&self, capability: Capability, task: &str, params: Value) -> Result<ToolOutcome> {
        let (tool_name, server) = self.resolve(capability, task).await;
        let url = format!("{}/tools/{}", self.config.url_for(server), tool_name);

        let request = self
            .client
            .post(&url)
            .json(&params)
            .timeout(self.config.total_timeout);

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let body = response.json::<Value>().await.unwrap_or(Value::Null);
                if status.is_success() {
                    Ok(ToolOutcome::Success { tool_name, server, body })
                } else {
                    Ok(ToolOutcome::HttpError {
                        tool_name,
                        server,
                        status: status.as_u16(),
                        body,
                    })
                }
            }
            Err(err) => {
                warn!(tool = %tool_name, ?server, %err, "tool call failed at the transport layer");
                let mocked = if self.config.mock_fallback {
                    Some(mock_response_for(&tool_name))
                } else {
                    None
                };
                Ok(ToolOutcome::TransportError {
                    tool_name,
                    server,
                    message: err.to_string(),
                    mocked,
                })
            }
        }
    }

    /// Look up a server's configured base URL, for tests and diagnostics.
    pub fn server_url(&self, server: ToolServer) -> &str {
        self.config.url_for(server)
    }

    /// The connect/total deadlines this orchestrator enforces on every call.
    pub fn timeouts(&self) -> (Duration, Duration) {
        (self.config.connect_timeout, self.config.total_timeout)
    }
}

/// Helper used by callers that need a concrete "capability not configured"
/// error rather than a soft outcome — currently unused by the orchestrator
/// itself (every capability in [`Capability`] has a default tool), kept for
/// the custom-capability seam a future capability server registration API
/// would need.
pub fn require_server_configured(config: &ToolConfig, server: ToolServer) -> Result<()> {
    if config.url_for(server).is_empty() {
        return Err(ToolError::ServerNotConfigured(server));
    }
    Ok(())
}
