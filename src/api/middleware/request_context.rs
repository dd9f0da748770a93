//! Per-request cancellation.
//!
//! Each request gets a [`CancellationToken`] that is cancelled when the
//! request future is dropped (the client went away) or when the configured
//! deadline elapses. Handlers pass it down to the storage layer, which stops
//! waiting on in-flight statements once it fires and asks PostgreSQL to abort
//! them.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;

use super::logging::duration_ms;
use crate::error::AppError;

/// Cancellation scope of the current request.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    token: CancellationToken,
}

impl RequestContext {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Extracts the context installed by [`request_context_middleware`].
///
/// Routes mounted without the middleware get a token that is never cancelled.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Installs a [`RequestContext`] and enforces the request deadline.
///
/// A request still running after `timeout` is abandoned with
/// `408 Request Timeout`.
pub async fn request_context_middleware(
    State(timeout): State<Duration>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = CancellationToken::new();
    // Cancels the token however this future ends, including being dropped
    let _guard = token.clone().drop_guard();

    request
        .extensions_mut()
        .insert(RequestContext::new(token.clone()));

    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            token.cancel();
            tracing::warn!(timeout_ms = duration_ms(timeout), "Request deadline exceeded");
            AppError::Cancelled {
                operation: "request".to_string(),
            }
            .into_response()
        }
    }
}
