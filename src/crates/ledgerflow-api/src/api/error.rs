//! API error types and HTTP response conversion (spec §7's error taxonomy, the API-facing slice).
//!
//! Maps engine and checkpoint-store failures onto the status codes §6.1/§7 call for: 400 for
//! schema violations, 404 for an unknown `thread_id`/`checkpoint_id`, 500 for everything else.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Schema violation on a request body (spec §7 category 1, synchronous branch).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Unknown `thread_id` or `checkpoint_id` (spec §7 category 6).
    #[error("not found: {0}")]
    NotFound(String),

    /// A resume or decision was submitted against a thread/review not in the state it requires.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Everything else: unexpected engine or storage failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Internal(_) => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());
        tracing::error!(status = %status, code = self.code(), "api error: {}", self);
        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ledgerflow_core::error::EngineError> for ApiError {
    fn from(err: ledgerflow_core::error::EngineError) -> Self {
        use ledgerflow_core::error::EngineError;
        match err {
            EngineError::NotPaused(thread) => {
                ApiError::Conflict(format!("thread '{thread}' is not paused"))
            }
            EngineError::NoPendingInterrupt(thread) => {
                ApiError::NotFound(format!("thread '{thread}' has no pending interrupt"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ledgerflow_checkpoint::CheckpointError> for ApiError {
    fn from(err: ledgerflow_checkpoint::CheckpointError) -> Self {
        use ledgerflow_checkpoint::CheckpointError;
        match err {
            CheckpointError::NotFound(id) => ApiError::NotFound(id),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::NotFound("thread-1".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn bad_request_maps_to_400() {
        let err = ApiError::BadRequest("missing invoice_id".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_not_paused_maps_to_conflict() {
        let err: ApiError = ledgerflow_core::error::EngineError::NotPaused("t1".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_no_pending_interrupt_maps_to_not_found() {
        let err: ApiError = ledgerflow_core::error::EngineError::NoPendingInterrupt("t1".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn checkpoint_not_found_maps_to_404() {
        let err: ApiError = ledgerflow_checkpoint::CheckpointError::NotFound("cp-1".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
