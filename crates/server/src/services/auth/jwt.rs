//! Signed tokens for sessions and emailed links.
//!
//! Payload is `{ userId, purpose, iat, exp, jti }`, HS256 with the shared
//! secret. `purpose` keeps a confirmation link from being replayed as a
//! session cookie and the other way round; `jti` makes two tokens issued in
//! the same second for the same user distinct.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use territory_core::UserId;

use super::AuthError;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Session cookie value.
    Session,
    /// Email confirmation link.
    EmailConfirmation,
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: UserId,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Signing and verification keys plus the default token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    default_ttl: TimeDelta,
}

impl JwtKeys {
    /// Build keys from the shared secret.
    #[must_use]
    pub fn new(secret: &SecretString, default_ttl: TimeDelta) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            default_ttl,
        }
    }

    /// Lifetime used when no explicit TTL is given.
    #[must_use]
    pub const fn default_ttl(&self) -> TimeDelta {
        self.default_ttl
    }

    /// Sign a token valid from now for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if encoding fails.
    pub fn sign(
        &self,
        user_id: UserId,
        purpose: TokenPurpose,
        ttl: TimeDelta,
    ) -> Result<String, AuthError> {
        self.sign_at(user_id, purpose, Utc::now(), ttl)
    }

    /// Sign a token with an explicit issue time.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if encoding fails, or
    /// `AuthError::LifetimeOutOfRange` if `issued_at + ttl` overflows.
    pub fn sign_at(
        &self,
        user_id: UserId,
        purpose: TokenPurpose,
        issued_at: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            user_id,
            purpose,
            iat: issued_at.timestamp(),
            exp: issued_at
                .checked_add_signed(ttl)
                .ok_or(AuthError::LifetimeOutOfRange)?
                .timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Token)
    }

    /// Verify signature, expiry and purpose.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` for bad signatures, malformed or expired
    /// tokens, and `AuthError::WrongTokenPurpose` if the purpose differs.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(AuthError::Token)?;

        if data.claims.purpose != purpose {
            return Err(AuthError::WrongTokenPurpose);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new(
            &SecretString::from("k3Y!x9#Lm2$Qp7&Zt4*Rw8^Vn1@Hs6%D"),
            TimeDelta::hours(1),
        )
    }

    #[test]
    fn test_overflowing_lifetime_is_an_error() {
        let result = keys().sign(UserId::new(7), TokenPurpose::Session, TimeDelta::MAX);
        assert!(matches!(result, Err(AuthError::LifetimeOutOfRange)));
    }

    #[test]
    fn test_sign_and_verify() {
        let keys = keys();
        let token = keys
            .sign(UserId::new(7), TokenPurpose::Session, TimeDelta::days(30))
            .unwrap();
        let claims = keys.verify(&token, TokenPurpose::Session).unwrap();
        assert_eq!(claims.user_id, UserId::new(7));
        assert_eq!(claims.exp - claims.iat, 30 * 24 * 3600);
    }

    #[test]
    fn test_payload_uses_user_id_key() {
        use base64::Engine;

        let token = keys()
            .sign(UserId::new(3), TokenPurpose::EmailConfirmation, TimeDelta::hours(1))
            .unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let json = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["userId"], 3);
        assert_eq!(value["purpose"], "email_confirmation");
    }

    #[test]
    fn test_tokens_are_unique() {
        let keys = keys();
        let a = keys.sign(UserId::new(1), TokenPurpose::Session, TimeDelta::hours(1)).unwrap();
        let b = keys.sign(UserId::new(1), TokenPurpose::Session, TimeDelta::hours(1)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys();
        let token = keys
            .sign_at(
                UserId::new(1),
                TokenPurpose::Session,
                Utc::now() - TimeDelta::hours(3),
                TimeDelta::hours(1),
            )
            .unwrap();
        assert!(matches!(
            keys.verify(&token, TokenPurpose::Session),
            Err(AuthError::Token(_))
        ));
    }

    #[test]
    fn test_wrong_purpose_rejected() {
        let keys = keys();
        let token = keys
            .sign(UserId::new(1), TokenPurpose::EmailConfirmation, TimeDelta::hours(1))
            .unwrap();
        assert!(matches!(
            keys.verify(&token, TokenPurpose::Session),
            Err(AuthError::WrongTokenPurpose)
        ));
    }

    #[test]
    fn test_tampered_and_foreign_tokens_rejected() {
        let keys = keys();
        let token = keys.sign(UserId::new(1), TokenPurpose::Session, TimeDelta::hours(1)).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(keys.verify(&tampered, TokenPurpose::Session).is_err());

        let other = JwtKeys::new(
            &SecretString::from("Zq8#pW2!mN5@rT9$kL3^vB7&xC1*hJ4%"),
            TimeDelta::hours(1),
        );
        assert!(other.verify(&token, TokenPurpose::Session).is_err());
        assert!(keys.verify("not-a-jwt", TokenPurpose::Session).is_err());
    }
}
