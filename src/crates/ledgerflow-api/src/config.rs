//! Process-wide server configuration (spec §9 "Global mutable configuration").
//!
//! Loaded once at startup from the environment, following the same `ConfigBuilder` pattern
//! `tooling::config` defines for every other ledgerflow component. Carries the HTTP bind address
//! plus everything [`ledgerflow_stages::StageConfig`] and [`ledgerflow_tools::ToolConfig`] need,
//! so `main` has a single place to build the whole stack from.

use ledgerflow_stages::StageConfig;
use ledgerflow_tools::ToolConfig;
use tooling::config::{get_env_bool, get_env_or, get_env_parse_or, ConfigBuilder};

/// Top-level server configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind the HTTP listener on.
    pub host: String,
    /// Port to bind the HTTP listener on.
    pub port: u16,
    /// Base URL operators use to open a pending review (spec §3.3 `review_url`).
    pub review_base_url: String,
    /// Deterministic pipeline tunables (match threshold, tolerance, approval limits).
    pub stage_config: StageConfig,
    /// Bigtool orchestrator tunables (capability server URLs, timeouts, mock fallback).
    pub tool_config: ToolConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            review_base_url: "http://127.0.0.1:8080".to_string(),
            stage_config: StageConfig::default(),
            tool_config: ToolConfig::default(),
        }
    }
}

impl ConfigBuilder for ServerConfig {
    fn validate(&self) -> tooling::Result<()> {
        if self.port == 0 {
            return Err(tooling::ToolingError::General("port must be non-zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.stage_config.match_threshold) {
            return Err(tooling::ToolingError::General(
                "match_threshold must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    fn from_env(prefix: &str) -> tooling::Result<Self> {
        let key = |name: &str| tooling::config::build_env_key(prefix, name);
        let defaults = ServerConfig::default();

        Ok(Self {
            host: get_env_or(&key("host"), defaults.host)?,
            port: get_env_parse_or(&key("port"), defaults.port)?,
            review_base_url: get_env_or(&key("review_base_url"), defaults.review_base_url)?,
            stage_config: StageConfig {
                match_threshold: get_env_parse_or(&key("match_threshold"), defaults.stage_config.match_threshold)?,
                tolerance_pct: get_env_parse_or(&key("tolerance_pct"), defaults.stage_config.tolerance_pct)?,
                auto_approve_limit: get_env_parse_or(
                    &key("auto_approve_limit"),
                    defaults.stage_config.auto_approve_limit,
                )?,
                manager_approve_limit: get_env_parse_or(
                    &key("manager_approve_limit"),
                    defaults.stage_config.manager_approve_limit,
                )?,
                risk_escalation_threshold: get_env_parse_or(
                    &key("risk_escalation_threshold"),
                    defaults.stage_config.risk_escalation_threshold,
                )?,
            },
            tool_config: ToolConfig {
                common_url: get_env_or(&key("common_url"), defaults.tool_config.common_url)?,
                atlas_url: get_env_or(&key("atlas_url"), defaults.tool_config.atlas_url)?,
                connect_timeout: defaults.tool_config.connect_timeout,
                total_timeout: defaults.tool_config.total_timeout,
                mock_fallback: get_env_bool(&key("mock_fallback"))?.unwrap_or(defaults.tool_config.mock_fallback),
                use_description_discovery: get_env_bool(&key("use_description_discovery"))?
                    .unwrap_or(defaults.tool_config.use_description_discovery),
            },
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        *self = other;
        self
    }
}
