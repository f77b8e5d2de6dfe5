//! API route definitions (spec §6.1's HTTP surface).

use axum::routing::{get, post};
use axum::Router;

use crate::api::{handlers, middleware, sse};
use crate::app::AppState;

/// Build the complete API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/health", get(handlers::health))
        .route("/events/health", get(handlers::health))
        .route("/invoice/submit", post(handlers::submit_invoice))
        .route("/invoice/status/:thread_id", get(handlers::workflow_status))
        .route("/human-review/pending", get(handlers::list_pending_reviews))
        .route("/human-review/:checkpoint_id", get(handlers::get_pending_review))
        .route("/human-review/decision", post(handlers::submit_decision))
        .route("/workflow/stages", get(handlers::workflow_stages))
        .route("/workflow/status/:thread_id", get(handlers::workflow_status))
        .route("/workflow/all", get(handlers::list_workflows))
        .route("/workflow/checkpoint/:thread_id", get(handlers::checkpoint_exists))
        .route("/events/workflow/:thread_id", get(sse::stream_workflow_events))
        .layer(middleware::logging_layer())
        .layer(middleware::cors_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint_responds_ok() {
        let state = AppState::build(ServerConfig::default());
        let router = create_router(state);

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn stage_catalog_endpoint_responds_ok() {
        let state = AppState::build(ServerConfig::default());
        let router = create_router(state);

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/workflow/stages")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
