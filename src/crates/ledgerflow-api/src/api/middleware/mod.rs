//! API middleware layer
//!
//! Provides middleware for request processing: CORS and request logging. Request-body
//! validation lives with the DTOs themselves (`api::models`) rather than as generic middleware,
//! since every endpoint here has a fixed, domain-specific shape to validate.

pub mod cors;
pub mod logging;

pub use cors::cors_layer;
pub use logging::logging_layer;
