//! Middleware components for request processing.
//!
//! This module contains middleware for logging, request ID tracking,
//! per-request cancellation and error rendering.

mod error_handler;
mod logging;
mod request_context;
mod request_id;

pub use error_handler::{error_response_middleware, error_to_code, error_to_status_code, panic_response};
pub use logging::logging_middleware;
pub use request_context::{RequestContext, request_context_middleware};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
