//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error body has the shape `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::{OrderError, RepositoryError};
use crate::services::auth::AuthError;
use crate::services::backup::BackupError;

const INTERNAL: &str = "Internal server error";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Order creation or lookup failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Backup operation failed.
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks the role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Order(err) => match err {
                OrderError::UserNotFound(_) | OrderError::ProductNotFound(_) | OrderError::NotFound => {
                    StatusCode::NOT_FOUND
                }
                OrderError::InvalidAddress
                | OrderError::InvalidItem { .. }
                | OrderError::EmptyOrder
                | OrderError::UnknownStatus(_) => StatusCode::BAD_REQUEST,
                OrderError::InsufficientStock(_) => StatusCode::CONFLICT,
                OrderError::DataCorruption(_) | OrderError::Database(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Backup(err) => match err {
                BackupError::NotFound(_) => StatusCode::NOT_FOUND,
                BackupError::InvalidFilename(_) => StatusCode::BAD_REQUEST,
                BackupError::Repository(inner) => repository_status(inner),
                BackupError::ToolFailed { .. } | BackupError::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(inner) => repository_status(inner),
                AuthError::TokenSigning(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client.
    ///
    /// Database and I/O details stay in the logs. Backup tool output is shown
    /// because only admins reach those endpoints.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return match self {
                Self::Backup(err @ BackupError::ToolFailed { .. }) => err.to_string(),
                _ => INTERNAL.to_owned(),
            };
        }

        match self {
            Self::Database(err) | Self::Backup(BackupError::Repository(err)) => {
                repository_message(err)
            }
            Self::Auth(AuthError::Repository(err)) => repository_message(err),
            Self::Order(err) => err.to_string(),
            Self::Backup(err) => err.to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_owned(),
                AuthError::InvalidToken => "Invalid or expired token".to_owned(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_owned()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::UserNotFound => "User not found".to_owned(),
                _ => "Authentication error".to_owned(),
            },
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::RateLimited => "Too many requests".to_owned(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::InvalidReference(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "Not found".to_owned(),
        RepositoryError::Conflict(msg) | RepositoryError::InvalidReference(msg) => msg.clone(),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => INTERNAL.to_owned(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = serde_json::json!({ "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;
    use vitrina_core::{ProductId, UserId};

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
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
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_order_error_status_codes() {
        let status = |e: OrderError| AppError::from(e).status();

        assert_eq!(status(OrderError::UserNotFound(UserId::new(1))), StatusCode::NOT_FOUND);
        assert_eq!(status(OrderError::InvalidAddress), StatusCode::BAD_REQUEST);
        assert_eq!(status(OrderError::EmptyOrder), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(OrderError::InsufficientStock(ProductId::new(2))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(OrderError::Database(sqlx::Error::RowNotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_error_status_codes() {
        let status = |e: RepositoryError| AppError::from(e).status();

        assert_eq!(status(RepositoryError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(RepositoryError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(RepositoryError::InvalidReference("x".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_database_details_are_redacted() {
        let (status, body) =
            body_of(AppError::Database(RepositoryError::DataCorruption("secret".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_tool_failure_message_is_shown() {
        let (status, body) = body_of(AppError::Backup(BackupError::ToolFailed {
            tool: "pg_dump".into(),
            message: "connection refused".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "pg_dump failed: connection refused");
    }

    #[tokio::test]
    async fn test_validation_message_is_shown() {
        let (status, body) = body_of(AppError::Order(OrderError::InvalidAddress)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "address must include a house or an apartment");
    }
}
