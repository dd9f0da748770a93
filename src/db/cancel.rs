//! Cancellation-aware execution of storage calls.
//!
//! Cancelling a call drops its client-side future. For PostgreSQL the
//! statement may already be running on the server, so repositories also hold
//! a [`CancelOnDrop`] while the statement is in flight. It asks the server to
//! abort the statement when the call is abandoned before it finished.
//!
//! The cancel request travels on its own connection. A statement that
//! commits before the request reaches the server stays committed.

use std::future::Future;

use diesel_async::AsyncPgConnection;
use tokio_postgres::{CancelToken, NoTls};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};

/// Runs `future` unless `ctx` is cancelled first.
///
/// On cancellation the in-flight future is dropped and `AppError::Cancelled`
/// is returned. A token that is already cancelled never polls `future`, so no
/// statement is sent.
pub async fn run_cancellable<T, F>(
    ctx: &CancellationToken,
    operation: &str,
    future: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    let cancelled = || {
        tracing::debug!(operation, "Storage call cancelled");
        AppError::Cancelled {
            operation: operation.to_string(),
        }
    };

    if ctx.is_cancelled() {
        return Err(cancelled());
    }

    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(cancelled()),
        result = future => result,
    }
}

/// Sends a server-side cancel for the connection's running statement if
/// dropped before [`CancelOnDrop::disarm`] is called.
#[must_use]
pub struct CancelOnDrop {
    operation: &'static str,
    token: Option<CancelToken>,
}

impl CancelOnDrop {
    pub fn new(operation: &'static str, conn: &AsyncPgConnection) -> Self {
        Self {
            operation,
            token: Some(conn.cancel_token()),
        }
    }

    /// Marks the statement as finished.
    pub fn disarm(mut self) {
        self.token = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        let operation = self.operation;

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(operation, "No runtime left to send statement cancel");
            return;
        };

        tracing::debug!(operation, "Cancelling abandoned statement");
        handle.spawn(async move {
            if let Err(error) = token.cancel_query(NoTls).await {
                tracing::warn!(operation, error = %error, "Failed to cancel statement");
            }
        });
    }
}
