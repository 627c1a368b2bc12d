//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{services::mailer::MailError, validation::FieldErrors};

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Infrastructure Errors**: database or mail delivery failures
/// - **Authentication Errors**: missing or invalid bearer tokens
/// - **Authorization Errors**: authenticated user lacks the role
/// - **Resource Errors**: requested resources not found
/// - **Validation Errors**: invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Returns HTTP 500 and hides the details from the client.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Confirmation email could not be delivered.
    #[error("Mail delivery error: {0}")]
    Mail(#[from] MailError),

    /// Operation requires a bearer token and none was sent.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Authentication credentials were not provided")]
    NotAuthenticated,

    /// Bearer token is malformed, forged, expired, or its user is gone.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Authenticated user does not have the required role or ownership.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("You do not have permission to perform this action")]
    PermissionDenied,

    /// Requested resource does not exist.
    ///
    /// Returns HTTP 404 Not Found. The string names the resource kind.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// One or more request fields failed validation.
    ///
    /// Returns HTTP 400 Bad Request with per-field messages.
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl AppError {
    /// Shorthand for a validation error on a single field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        AppError::Validation(errors)
    }

    /// Turns a unique-constraint violation into a field error, passing other
    /// database errors through unchanged.
    pub fn unique_violation(err: sqlx::Error, field: &str, message: &str) -> Self {
        if crate::db::is_unique_violation(&err) {
            AppError::field(field, message)
        } else {
            AppError::Database(err)
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Validation errors add a `fields` object mapping each field to its messages.
///
/// # Status Code Mapping
///
/// - `NotAuthenticated`, `InvalidToken` → 401 Unauthorized
/// - `PermissionDenied` → 403 Forbidden
/// - `NotFound` → 404 Not Found
/// - `Validation`, `InvalidRequest` → 400 Bad Request
/// - `Database`, `Mail` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                "not_authenticated",
                self.to_string(),
            ),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", self.to_string()),
            AppError::PermissionDenied => {
                (StatusCode::FORBIDDEN, "permission_denied", self.to_string())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Validation(ref fields) => {
                let body = Json(json!({
                    "error": {
                        "code": "validation_error",
                        "message": self.to_string(),
                        "fields": fields,
                    }
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(ref err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Mail(ref err) => {
                tracing::error!("Mail delivery failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "mail_delivery_failed",
                    "Could not deliver the confirmation email".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_names_resource() {
        let response = AppError::NotFound("Title").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "Title not found");
    }

    #[tokio::test]
    async fn test_validation_lists_fields() {
        let response = AppError::field("slug", "Slug is already taken").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["fields"]["slug"][0], "Slug is already taken");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(
            AppError::NotAuthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::PermissionDenied.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_non_unique_database_error_passes_through() {
        let err = AppError::unique_violation(sqlx::Error::RowNotFound, "slug", "taken");
        assert!(matches!(err, AppError::Database(_)));
    }
}
