//! Account and session endpoints under `/api/auth`.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;

use territory_core::Locale;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{
    RequestLocale, RequireAuth, clear_session_cookie, read_session_cookie, set_session_cookie,
};
use crate::models::User;
use crate::state::AppState;

/// Registration form.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub locale: Option<Locale>,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body carrying an emailed token.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Optional locale override.
#[derive(Debug, Default, Deserialize)]
pub struct LocaleRequest {
    #[serde(default)]
    pub locale: Option<Locale>,
}

/// Forgot password form.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    #[serde(default)]
    pub locale: Option<Locale>,
}

/// Reset password form.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Change password form.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    locale: RequestLocale,
    Json(form): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state
        .auth()
        .register(&form.email, &form.password, locale.or(form.locale))
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
///
/// Sets the session cookie on success.
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let (user, session) = state.auth().login(&form.email, &form.password).await?;
    set_sentry_user(&user.id, None);

    let cookie = set_session_cookie(&session.token, state.config().session);
    Ok(([(header::SET_COOKIE, cookie)], Json(user)))
}

/// POST /api/auth/logout
///
/// Always clears the cookie, even without a live session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    if let Some(token) = read_session_cookie(&headers) {
        state.auth().logout(&token).await?;
    }
    clear_sentry_user();

    let cookie = clear_session_cookie(state.config().session);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

/// GET /api/auth/me
pub async fn me(RequireAuth(auth): RequireAuth) -> Json<User> {
    Json(auth.user)
}

/// POST /api/auth/refresh
///
/// Rotates the session token and extends the session.
pub async fn refresh(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse> {
    let session = state.auth().refresh(&auth.session).await?;

    let cookie = set_session_cookie(&session.token, state.config().session);
    Ok(([(header::SET_COOKIE, cookie)], Json(auth.user)))
}

/// POST /api/auth/confirm-email
pub async fn confirm_email(
    State(state): State<AppState>,
    Json(form): Json<TokenRequest>,
) -> Result<StatusCode> {
    state.auth().confirm_email(&form.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/resend-confirmation
pub async fn resend_confirmation(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    locale: RequestLocale,
    body: Option<Json<LocaleRequest>>,
) -> Result<StatusCode> {
    let Json(form) = body.unwrap_or_default();
    state
        .auth()
        .resend_confirmation(&auth.user, locale.or(form.locale))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/forgot-password
///
/// Answers 202 whatever happens, so the response never reveals whether an
/// account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    locale: RequestLocale,
    Json(form): Json<ForgotPasswordRequest>,
) -> StatusCode {
    if let Err(e) = state
        .auth()
        .request_password_reset(&form.email, locale.or(form.locale))
        .await
    {
        tracing::warn!(error = %e, "Password reset request failed");
    }
    StatusCode::ACCEPTED
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(form): Json<ResetPasswordRequest>,
) -> Result<StatusCode> {
    state
        .auth()
        .reset_password(&form.token, &form.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Json(form): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state
        .auth()
        .change_password(&auth, &form.current_password, &form.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
