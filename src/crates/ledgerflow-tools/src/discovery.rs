//! Description-based discovery: fetching and caching `GET /tools` from each
//! capability server.

use dashmap::DashMap;
use ledgerflow_bus::ToolServer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ToolConfig;

/// One entry of a capability server's `GET /tools` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ToolsResponse {
    tools: Vec<ToolDescription>,
    #[serde(default)]
    #[allow(dead_code)]
    server: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
}

/// Read-mostly cache of each server's tool descriptions, populated lazily on
/// first use, with an explicit forced-refresh path for operators who change a
/// capability server's tool set without restarting the engine.
pub struct ToolDescriptionCache {
    client: reqwest::Client,
    cache: DashMap<ToolServer, Arc<Vec<ToolDescription>>>,
}

impl ToolDescriptionCache {
    /// Build an empty cache using `client` for discovery requests.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            cache: DashMap::new(),
        }
    }

    /// Return the cached descriptions for `server`, fetching and populating
    /// the cache on first use. A fetch failure is logged and treated as "no
    /// descriptions known" rather than propagated — description-based
    /// discovery degrades to the capability map, it never fails the stage.
    pub async fn get_or_fetch(&self, config: &ToolConfig, server: ToolServer) -> Arc<Vec<ToolDescription>> {
        if let Some(cached) = self.cache.get(&server) {
            return cached.clone();
        }
        self.refresh(config, server).await
    }

    /// Force a re-fetch for `server`, replacing whatever was cached.
    pub async fn refresh(&self, config: &ToolConfig, server: ToolServer) -> Arc<Vec<ToolDescription>> {
        let url = format!("{}/tools", config.url_for(server));
        let descriptions = match self.client.get(&url).send().await {
            Ok(response) => match response.json::<ToolsResponse>().await {
                Ok(parsed) => {
                    debug!(?server, count = parsed.tools.len(), "discovered tool descriptions");
                    parsed.tools
                }
                Err(err) => {
                    warn!(?server, %err, "failed to parse tool descriptions response");
                    Vec::new()
                }
            },
            Err(err) => {
                warn!(?server, %err, "failed to reach capability server for discovery");
                Vec::new()
            }
        };

        let arc = Arc::new(descriptions);
        self.cache.insert(server, arc.clone());
        arc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_server_yields_empty_descriptions_not_an_error() {
        let cache = ToolDescriptionCache::new(reqwest::Client::new());
        let config = ToolConfig {
            common_url: "http://127.0.0.1:1".to_string(),
            ..ToolConfig::default()
        };
        let descriptions = cache.get_or_fetch(&config, ToolServer::Common).await;
        assert!(descriptions.is_empty());
    }

    #[tokio::test]
    async fn second_fetch_uses_cache_not_network() {
        let cache = ToolDescriptionCache::new(reqwest::Client::new());
        let config = ToolConfig {
            atlas_url: "http://127.0.0.1:1".to_string(),
            ..ToolConfig::default()
        };
        let first = cache.get_or_fetch(&config, ToolServer::Atlas).await;
        let second = cache.get_or_fetch(&config, ToolServer::Atlas).await;
        assert!(Arc::ptr_eq(&first, &second));
    }
}
