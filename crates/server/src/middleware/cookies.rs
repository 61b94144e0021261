//! The `sessionToken` cookie.
//!
//! Always `Path=/`, `HttpOnly` and `SameSite=Lax`; `Secure` follows
//! configuration. Clearing sends the same attributes with `Max-Age=0` so the
//! browser matches and drops the stored cookie.

use axum::http::{HeaderMap, HeaderValue, header};
use cookie::{Cookie, SameSite, time::Duration};

use crate::config::SessionConfig;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sessionToken";

fn build(value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

fn to_header(cookie: &Cookie<'_>) -> HeaderValue {
    // Tokens are base64url and JWT dots, always a valid header value
    HeaderValue::from_str(&cookie.to_string()).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` value storing `token` for the configured session lifetime.
#[must_use]
pub fn set_session_cookie(token: &str, config: SessionConfig) -> HeaderValue {
    let cookie = build(
        token.to_string(),
        Duration::days(i64::from(config.max_age_days)),
        config.cookie_secure,
    );
    to_header(&cookie)
}

/// `Set-Cookie` value removing the session cookie.
#[must_use]
pub fn clear_session_cookie(config: SessionConfig) -> HeaderValue {
    let cookie = build(String::new(), Duration::ZERO, config.cookie_secure);
    to_header(&cookie)
}

/// The session token sent by the client, if any.
///
/// Looks through every `Cookie` header; empty values count as absent.
#[must_use]
pub fn read_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
