//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client with `{"error": "<message>"}`. All route
//! handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tower_governor::GovernorError;

use crate::services::auth::AuthError;
use crate::services::territories::TerritoryError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Territory operation failed.
    #[error("Territory error: {0}")]
    Territory(#[from] TerritoryError),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

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
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::UserNotFound
                | AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::Token(_)
                | AuthError::WrongTokenPurpose
                | AuthError::InvalidResetToken => StatusCode::BAD_REQUEST,
                AuthError::Repository(_)
                | AuthError::PasswordHash
                | AuthError::Email(_)
                | AuthError::LifetimeOutOfRange => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Territory(err) => match err {
                TerritoryError::InvalidNum(_)
                | TerritoryError::Geometry(_)
                | TerritoryError::InvalidName(_)
                | TerritoryError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
                TerritoryError::NotFound => StatusCode::NOT_FOUND,
                TerritoryError::AlreadyExists => StatusCode::CONFLICT,
                TerritoryError::UnsupportedImage => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                TerritoryError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                TerritoryError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show to clients.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.status().is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Token(_) | AuthError::WrongTokenPurpose => {
                    "Invalid or expired token".to_string()
                }
                AuthError::InvalidResetToken => "Invalid or expired reset link".to_string(),
                AuthError::SessionExpired => "Session expired, please log in again".to_string(),
                _ => "Authentication error".to_string(),
            },
            Self::Territory(err) => err.to_string(),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "Too many requests, please slow down".to_string(),
            _ => self.to_string(),
        }
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

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

impl From<GovernorError> for AppError {
    fn from(err: GovernorError) -> Self {
        match err {
            GovernorError::TooManyRequests { .. } => Self::RateLimited,
            GovernorError::UnableToExtractKey => {
                Self::Internal("unable to determine client address".to_string())
            }
            GovernorError::Other { msg, .. } => {
                Self::Internal(msg.unwrap_or_else(|| "rate limiter failure".to_string()))
            }
        }
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

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use territory_core::GeometryError;

    use super::*;
    use crate::db::RepositoryError;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::Territory(TerritoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Auth(AuthError::UserAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Auth(AuthError::WrongTokenPurpose).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Territory(TerritoryError::ImageTooLarge { max: 10 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Territory(TerritoryError::UnsupportedImage).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            AppError::Auth(AuthError::PasswordHash).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_json_body() {
        let (status, body) = body_of(AppError::BadRequest("missing token".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "missing token" }));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_of(AppError::Auth(AuthError::Repository(
            RepositoryError::DataCorruption("row 42 has a broken polygon".to_string()),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_message_passed_through() {
        let err = AppError::Territory(TerritoryError::Geometry(GeometryError::TooFewPoints {
            min: 3,
            got: 2,
        }));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "polygon needs at least 3 distinct points (got 2)");
    }

    #[tokio::test]
    async fn test_rate_limit_is_json() {
        let err = AppError::from(GovernorError::TooManyRequests {
            wait_time: 6,
            headers: None,
        });
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Too many requests, please slow down");
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let (_, a) = body_of(AppError::Auth(AuthError::InvalidCredentials)).await;
        let (_, b) = body_of(AppError::Auth(AuthError::UserNotFound)).await;
        assert_eq!(a, b);
    }
}
