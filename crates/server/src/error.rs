//! Unified error handling for the server.
//!
//! Application routes return `AppError`, which maps to an HTTP status and a
//! JSON `{ "error": ... }` body. The ERP proxy endpoint does NOT use this
//! type; it carries its own envelope (see `routes::proxy`).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::bling::BlingError;
use crate::db::RepositoryError;
use crate::openai::OpenAiError;
use crate::services::auth::AuthError;
use crate::services::credentials::CredentialError;
use crate::services::erp::ErpError;
use crate::services::imgbb::ImgbbError;

/// Application-level error type for JSON routes.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Bling ERP operation failed.
    #[error("Bling error: {0}")]
    Bling(#[from] BlingError),

    /// `OpenAI` API operation failed.
    #[error("OpenAI error: {0}")]
    OpenAi(#[from] OpenAiError),

    /// ImgBB upload failed.
    #[error("ImgBB error: {0}")]
    Imgbb(#[from] ImgbbError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflicting state (e.g., duplicate email, account not connected).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A required external service is not configured.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Bling(_) | Self::OpenAi(_) | Self::Imgbb(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Bling(_) | Self::OpenAi(_) | Self::Imgbb(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Bling(_) => "ERP service error".to_string(),
            Self::OpenAi(_) => "AI service error".to_string(),
            Self::Imgbb(_) => "Image host error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("invalid credentials".to_string()),
            AuthError::TrialExpired => Self::Forbidden("trial expired".to_string()),
            AuthError::UserNotFound => Self::NotFound("user".to_string()),
            AuthError::UserAlreadyExists => Self::Conflict("email already registered".to_string()),
            AuthError::InvalidEmail(e) => Self::BadRequest(format!("invalid email: {e}")),
            AuthError::WeakPassword(msg) => Self::BadRequest(msg),
            AuthError::Repository(e) => Self::Database(e),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_string()),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Repository(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ErpError> for AppError {
    fn from(err: ErpError) -> Self {
        match err {
            ErpError::Database(e) => Self::Database(e),
            ErpError::Credentials(e) => Self::from(e),
            ErpError::Bling(e) => Self::Bling(e),
            ErpError::Encode(e) => Self::Internal(e.to_string()),
            ErpError::NotConnected => Self::Conflict("Bling account not connected".to_string()),
            ErpError::ReconnectRequired => {
                Self::Conflict("Bling connection expired, reconnect in settings".to_string())
            }
            ErpError::ProductNotFound => Self::NotFound("product".to_string()),
        }
    }
}

/// Set the Sentry user context after a successful login.
pub fn set_sentry_user(user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::Conflict("email already registered".to_string());
        assert_eq!(err.to_string(), "Conflict: email already registered");
    }

    #[test]
    fn test_app_error_status_codes() {
        // Test that errors map to correct HTTP status codes
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Unavailable("test".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_conversion() {
        let err: AppError = AuthError::InvalidCredentials.into();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err: AppError = AuthError::TrialExpired.into();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err: AppError = AuthError::UserAlreadyExists.into();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_erp_error_conversion() {
        let err: AppError = ErpError::NotConnected.into();
        assert!(matches!(err, AppError::Conflict(_)));

        let err: AppError = ErpError::ReconnectRequired.into();
        assert!(matches!(err, AppError::Conflict(_)));

        let err: AppError = ErpError::ProductNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
