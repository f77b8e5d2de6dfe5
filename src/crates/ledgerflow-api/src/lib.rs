//! The Intake/Resume API: the HTTP surface clients submit invoices through, poll for status on,
//! and drive the Human-in-the-Loop review queue from (spec §6.1).
//!
//! This crate owns nothing about *how* a workflow executes — that's `ledgerflow-core` and
//! `ledgerflow-stages` — it only wires those pieces to axum: [`app::AppState`] holds the shared
//! [`ledgerflow_core::engine::Engine`], [`ledgerflow_bus::EventBus`], and
//! [`ledgerflow_checkpoint::ReviewQueue`], and [`api::routes::create_router`] maps §6.1's
//! endpoints onto handlers that drive them.

pub mod api;
pub mod app;
pub mod config;
pub mod observer;

pub use app::AppState;
pub use config::ServerConfig;
