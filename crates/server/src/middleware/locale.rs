//! Locale of the caller, from `Accept-Language`.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use territory_core::Locale;

/// Locale negotiated from the `Accept-Language` header, `gb` by default.
///
/// Request bodies may carry an explicit `locale` that takes precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

impl RequestLocale {
    /// `explicit` if given, else the negotiated locale.
    #[must_use]
    pub fn or(self, explicit: Option<Locale>) -> Locale {
        explicit.unwrap_or(self.0)
    }
}

impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(Locale::from_accept_language)
            .unwrap_or_default();
        Ok(Self(locale))
    }
}
