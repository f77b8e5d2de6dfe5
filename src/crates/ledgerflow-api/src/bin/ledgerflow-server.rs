//! ledgerflow server binary
//!
//! Standalone process exposing the Intake/Resume HTTP API (spec §6.1) over the in-memory
//! checkpoint store and review queue. Configuration is loaded from the environment under the
//! `LEDGERFLOW_` prefix; see [`ledgerflow_api::ServerConfig`].

use std::net::SocketAddr;

use tooling::config::ConfigBuilder;

use ledgerflow_api::{api::create_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let config = match ServerConfig::from_env("LEDGERFLOW") {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!(%err, "failed to load configuration from environment; using defaults");
            ServerConfig::default()
        }
    };
    config.validate()?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(%addr, "starting ledgerflow server");

    let state = AppState::build(config);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
