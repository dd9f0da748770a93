//! Logging middleware for request/response tracing.
//!
//! Every request runs inside an `http_request` span carrying the method, URI
//! and request ID, so log lines emitted by handlers and repositories are
//! correlated with the request that caused them.

use std::time::{Duration, Instant};

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{Instrument, Span, field};

use super::RequestId;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(super) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Middleware that logs request and response information.
///
/// Server errors are logged at `error`, client errors at `warn` and
/// everything else at `info`. The final status is also recorded on the span.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.as_str())
        .unwrap_or("unknown");

    let span = tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
        status = field::Empty,
    );

    async move {
        tracing::debug!("Request received");

        let start = Instant::now();
        let response = next.run(request).await;
        let status = response.status();
        let duration_ms = duration_ms(start.elapsed());

        Span::current().record("status", status.as_u16());
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), duration_ms, "Response sent");
        } else if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), duration_ms, "Response sent");
        } else {
            tracing::info!(status = status.as_u16(), duration_ms, "Response sent");
        }

        response
    }
    .instrument(span)
    .await
}
