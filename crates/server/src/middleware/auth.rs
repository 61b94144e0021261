//! Authentication extractor.
//!
//! Reads the `sessionToken` cookie and resolves it with
//! [`AuthService::get_auth_user`](crate::services::AuthService::get_auth_user).

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::{AppError, set_sentry_user};
use crate::middleware::cookies::read_session_cookie;
use crate::models::AuthUser;
use crate::state::AppState;

/// Extractor that requires a valid session.
///
/// Rejects with `401 {"error": ...}` when the cookie is missing or the
/// session is invalid.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(auth): RequireAuth) -> impl IntoResponse {
///     Json(auth.user)
/// }
/// ```
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = read_session_cookie(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let auth = state
            .auth()
            .get_auth_user(&token)
            .await
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        set_sentry_user(&auth.user.id, None);
        Ok(Self(auth))
    }
}
