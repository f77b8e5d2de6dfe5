//! HTTP surface for the invoice workflow engine (spec §6.1).
//!
//! Submission, status polling, the Human-in-the-Loop review queue, the static stage catalog, and
//! the real-time SSE event stream all live here. Nothing in this module knows how a stage
//! executes — it only ever calls through [`crate::app::AppState`]'s `engine`, `bus`, and
//! `review_queue` handles.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod sse;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::cors_layer;
pub use routes::create_router;
