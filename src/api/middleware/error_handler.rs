//! Error handler for converting AppError to HTTP responses.
//!
//! `AppError` renders as a JSON [`ErrorResponse`]. Storage and internal
//! causes are logged here and never echoed to the client.
//! [`error_response_middleware`] stamps the request ID onto those bodies and
//! converts axum's plain-text rejections (unknown route, wrong method) into
//! the same shape.

use std::any::Any;

use axum::{
    Json,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::RequestId;
use crate::api::dto::ErrorResponse;
use crate::error::AppError;

/// Largest non-JSON error body read back when normalizing error responses.
const MAX_FALLBACK_BODY: usize = 64 * 1024;

/// Maps an AppError variant to its corresponding HTTP status code.
pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Duplicate { .. } => StatusCode::CONFLICT,
        AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        AppError::ValidationErrors { .. } => StatusCode::BAD_REQUEST,
        AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
        AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Maps an AppError variant to its error code string.
pub fn error_to_code(error: &AppError) -> &'static str {
    match error {
        AppError::NotFound { .. } => "NOT_FOUND",
        AppError::Duplicate { .. } => "DUPLICATE_ENTRY",
        AppError::Validation { .. } => "VALIDATION_ERROR",
        AppError::ValidationErrors { .. } => "VALIDATION_ERROR",
        AppError::BadRequest { .. } => "BAD_REQUEST",
        AppError::Database { .. } => "DATABASE_ERROR",
        AppError::Cancelled { .. } => "REQUEST_TIMEOUT",
        AppError::Configuration { .. } => "CONFIGURATION_ERROR",
        AppError::ConnectionPool { .. } => "SERVICE_UNAVAILABLE",
        AppError::Internal { .. } => "INTERNAL_ERROR",
    }
}

fn error_body(error: &AppError) -> ErrorResponse {
    let code = error_to_code(error);

    match error {
        AppError::NotFound {
            entity,
            field,
            value,
        } => ErrorResponse::new(code, &format!("{} with {}={} not found", entity, field, value))
            .with_details(json!({ "entity": entity, "field": field, "value": value })),
        AppError::Duplicate {
            entity,
            field,
            value,
        } => ErrorResponse::new(
            code,
            &format!("{}.{} '{}' already exists", entity, field, value),
        )
        .with_details(json!({ "entity": entity, "field": field, "value": value })),
        AppError::Validation { field, reason } => {
            ErrorResponse::new(code, &format!("Validation failed for {}", field))
                .with_details(json!({ "field": field, "reason": reason }))
        }
        AppError::ValidationErrors { errors } => {
            ErrorResponse::new(code, "Request validation failed")
                .with_details(json!({ "errors": errors }))
        }
        AppError::BadRequest { message } => ErrorResponse::new(code, message),
        AppError::Database { operation, source } => {
            tracing::error!(operation = %operation, error = ?source, "Database operation failed");
            ErrorResponse::new(code, &format!("Database operation failed: {}", operation))
        }
        AppError::Cancelled { operation } => {
            ErrorResponse::new(code, "Request was cancelled before it completed")
                .with_details(json!({ "operation": operation }))
        }
        AppError::Configuration { key, source } => {
            tracing::error!(key = %key, error = ?source, "Configuration error");
            ErrorResponse::new(code, "Service is misconfigured")
        }
        AppError::ConnectionPool { source } => {
            tracing::error!(error = ?source, "Connection pool unavailable");
            ErrorResponse::new(code, "Database connection unavailable")
        }
        AppError::Internal { source } => {
            tracing::error!(error = ?source, "Internal error");
            ErrorResponse::new(code, "An internal error occurred")
        }
    }
}

impl IntoResponse for AppError {
    /// Renders the error as `{code, message, details?}` with the mapped status.
    ///
    /// The body is also stored in the response extensions so
    /// [`error_response_middleware`] can add the request ID.
    fn into_response(self) -> Response {
        let status = error_to_status_code(&self);
        let body = error_body(&self);

        let mut response = (status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

/// Builds the JSON 500 response for a panicking handler.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    AppError::Internal {
        source: anyhow::anyhow!("request handler panicked: {}", details),
    }
    .into_response()
}

/// Normalizes every error response into an [`ErrorResponse`] carrying the
/// request ID.
pub async fn error_response_middleware(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().map(|id| id.0.clone());

    let mut response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let stored = response.extensions_mut().remove::<ErrorResponse>();
    let body = match stored {
        Some(body) => body,
        None if is_json(&response) => return response,
        None => {
            let bytes = axum::body::to_bytes(response.into_body(), MAX_FALLBACK_BODY)
                .await
                .unwrap_or_default();
            fallback_body(status, String::from_utf8_lossy(&bytes).trim())
        }
    };

    let body = match request_id {
        Some(id) => body.with_request_id(&id),
        None => body,
    };

    (status, Json(body)).into_response()
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

/// `405 Method Not Allowed` becomes `METHOD_NOT_ALLOWED`.
fn fallback_body(status: StatusCode, original_message: &str) -> ErrorResponse {
    let reason = status.canonical_reason().unwrap_or("Unknown error");
    let code = reason.to_uppercase().replace([' ', '-'], "_");
    let message = if original_message.is_empty() {
        reason
    } else {
        original_message
    };

    ErrorResponse::new(&code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::user_not_found(1), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Duplicate {
                    entity: "users".to_string(),
                    field: "email".to_string(),
                    value: "a@x.com".to_string(),
                },
                StatusCode::CONFLICT,
                "DUPLICATE_ENTRY",
            ),
            (
                AppError::Validation {
                    field: "email".to_string(),
                    reason: "required".to_string(),
                },
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                AppError::Database {
                    operation: "insert user".to_string(),
                    source: anyhow::anyhow!("boom"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
            ),
            (
                AppError::ConnectionPool {
                    source: anyhow::anyhow!("exhausted"),
                },
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
            ),
            (
                AppError::Cancelled {
                    operation: "select user".to_string(),
                },
                StatusCode::REQUEST_TIMEOUT,
                "REQUEST_TIMEOUT",
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error_to_status_code(&error), status);
            assert_eq!(error_to_code(&error), code);
        }
    }

    #[tokio::test]
    async fn test_database_error_hides_cause() {
        let response = AppError::Database {
            operation: "select user".to_string(),
            source: anyhow::anyhow!("password authentication failed for user admin"),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["code"], "DATABASE_ERROR");
        assert!(!json.to_string().contains("password authentication"));
    }

    #[tokio::test]
    async fn test_validation_errors_listed_in_details() {
        let response = AppError::ValidationErrors {
            errors: vec![crate::error::ValidationFieldError {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            }],
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["details"]["errors"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_panic_response_is_internal_error() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["code"], "INTERNAL_ERROR");
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/missing",
                get(|| async { AppError::user_not_found(7) }),
            )
            .layer(middleware::from_fn(error_response_middleware))
            .layer(middleware::from_fn(
                |mut request: Request, next: Next| async move {
                    request
                        .extensions_mut()
                        .insert(RequestId("req-1".to_string()));
                    next.run(request).await
                },
            ))
    }

    #[tokio::test]
    async fn test_middleware_adds_request_id_to_app_errors() {
        let response = app()
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["request_id"], "req-1");
        assert_eq!(json["details"]["value"], "7");
    }

    #[tokio::test]
    async fn test_middleware_normalizes_plain_rejections() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let json = body_json(response).await;
        assert_eq!(json["code"], "METHOD_NOT_ALLOWED");
        assert_eq!(json["request_id"], "req-1");
    }
}
