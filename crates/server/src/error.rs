//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Responses use the JSON
//! envelope storefront clients already parse:
//!
//! ```json
//! { "success": false, "message": "Email is not registered" }
//! ```
//!
//! Server-side failures are captured to Sentry before responding and never
//! leak driver details to the client.

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::{PasswordError, TokenError};
use crate::services::payment::PaymentError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Payment gateway call failed or was declined.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Password hashing failed.
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    /// Session token missing, invalid or expired.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// The admin check could not load the caller.
    #[error("Admin check failed: {0}")]
    AdminCheck(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to do this.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Uniqueness or reference conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure body shared by every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Password(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Payment(PaymentError::Declined(_)) => StatusCode::PAYMENT_REQUIRED,
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Token(TokenError::Encoding(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Token(_) | Self::AdminCheck(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    fn body(&self) -> ErrorBody {
        let (message, error) = match self {
            Self::Database(RepositoryError::NotFound) => ("Not found".to_string(), None),
            Self::Database(RepositoryError::Conflict(m)) => (m.clone(), None),
            Self::Database(_) | Self::Password(_) | Self::Internal(_) => {
                ("Internal server error".to_string(), None)
            }
            Self::Payment(PaymentError::Declined(m)) => ("Payment declined".to_string(), Some(m.clone())),
            Self::Payment(_) => ("Payment gateway error".to_string(), None),
            Self::Token(TokenError::Encoding(_)) => ("Internal server error".to_string(), None),
            Self::Token(err) => ("Unauthorized".to_string(), Some(err.to_string())),
            Self::AdminCheck(err) => ("Error in admin middleware".to_string(), Some(err.clone())),
            Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::BadRequest(m)
            | Self::Conflict(m) => (m.clone(), None),
        };

        ErrorBody {
            success: false,
            message,
            error,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (self.status(), Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database(RepositoryError::Conflict("x".to_string())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Payment(PaymentError::Declined("x".to_string())).status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::Payment(PaymentError::NotConfigured).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Token(TokenError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Database(RepositoryError::DataCorruption("x".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_client_error_body_uses_message_verbatim() {
        let (status, body) = render(AppError::NotFound("Email is not registered".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Email is not registered");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_token_error_reports_kind() {
        let (status, body) = render(AppError::Token(TokenError::Expired)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "jwt expired");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "invalid email in database".to_string(),
        ));
        let (_, body) = render(err).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(!body.to_string().contains("invalid email"));
    }
}
