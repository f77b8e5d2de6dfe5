//! Async utilities for common async patterns
//!
//! This module provides timeout wrappers for bounding outbound calls. There is
//! deliberately no retry helper here: tool-layer and stage-layer failures in this
//! workspace are recovered or made terminal by the caller, never retried
//! automatically underneath it.
//!
//! # Example
//!
//! ```rust,ignore
//! use tooling::async_utils::timeout::with_timeout;
//! use std::time::Duration;
//!
//! async fn call_with_timeout() -> Result<String, String> {
//!     with_timeout(
//!         Duration::from_secs(30),
//!         async {
//!             // Slow operation
//!             Ok("done".to_string())
//!         }
//!     ).await
//!     .map_err(|e| e.to_string())
//! }
//! ```

pub mod timeout;
