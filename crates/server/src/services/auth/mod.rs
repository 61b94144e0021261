//! Authentication service.
//!
//! Password accounts with server-side sessions. The session cookie carries a
//! signed token; a request is authenticated only if the token verifies AND a
//! matching unexpired session row exists AND the user still exists.

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, JwtKeys, TokenPurpose};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, TimeDelta, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::MySqlPool;

use territory_core::{Email, Locale};

use crate::db::{PasswordResetTokenRepository, RepositoryError, SessionRepository, UserRepository};
use crate::models::{AuthUser, Session, User};
use crate::services::email::{EmailService, MessageKind};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest password accepted, to bound hashing cost.
const MAX_PASSWORD_LENGTH: usize = 256;

/// Random bytes in a password reset token.
const RESET_TOKEN_BYTES: usize = 32;

/// Lifetimes the service works with.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    /// Session row and cookie lifetime.
    pub session_max_age: TimeDelta,
    /// Password reset link lifetime.
    pub reset_ttl: TimeDelta,
}

/// Authentication service.
///
/// Handles registration, login, sessions, email confirmation and password
/// reset.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    sessions: SessionRepository<'a>,
    reset_tokens: PasswordResetTokenRepository<'a>,
    keys: &'a JwtKeys,
    email: &'a EmailService,
    settings: AuthSettings,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        pool: &'a MySqlPool,
        keys: &'a JwtKeys,
        email: &'a EmailService,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users: UserRepository::new(pool),
            sessions: SessionRepository::new(pool),
            reset_tokens: PasswordResetTokenRepository::new(pool),
            keys,
            email,
            settings,
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register a new account and mail a confirmation link.
    ///
    /// The caller is not logged in. A failed confirmation email is logged and
    /// does not undo the registration; the user can ask for another one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        locale: Locale,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        if let Err(e) = self.send_confirmation(&user, locale).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send confirmation email");
        }

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, Session), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let session = self.create_session(&user).await?;
        tracing::info!(user_id = %user.id, session_id = %session.id, "User logged in");
        Ok((user, session))
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Sign a session token and store the session row.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    /// Returns `AuthError::Repository` if the insert fails.
    pub async fn create_session(&self, user: &User) -> Result<Session, AuthError> {
        let max_age = self.settings.session_max_age;
        let token = self.keys.sign(user.id, TokenPurpose::Session, max_age)?;
        let session = self
            .sessions
            .create(user.id, &token, expiry_after(max_age)?)
            .await?;
        Ok(session)
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` on any failure: bad signature, wrong purpose, unknown
    /// or expired session, deleted user, or a database error.
    pub async fn get_auth_user(&self, token: &str) -> Option<AuthUser> {
        match self.authenticate(token).await {
            Ok(auth) => Some(auth),
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                None
            }
        }
    }

    async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.keys.verify(token, TokenPurpose::Session)?;

        let session = self
            .sessions
            .get_valid_by_token(token, Utc::now())
            .await?
            .ok_or(AuthError::SessionExpired)?;
        if session.user_id != claims.user_id {
            return Err(AuthError::SessionExpired);
        }

        let user = self
            .users
            .get_by_id(session.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(AuthUser { user, session })
    }

    /// Give a session a new token and a full new lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if the session row is gone.
    pub async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let max_age = self.settings.session_max_age;
        let token = self
            .keys
            .sign(session.user_id, TokenPurpose::Session, max_age)?;

        self.sessions
            .update_token(session.id, &token, expiry_after(max_age)?)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::SessionExpired,
                other => AuthError::Repository(other),
            })
    }

    /// Delete the session holding `token`. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the delete fails.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if self.sessions.delete_by_token(token).await? {
            tracing::info!("Session closed");
        }
        Ok(())
    }

    // =========================================================================
    // Email confirmation
    // =========================================================================

    /// Mail a confirmation link to `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    /// Returns `AuthError::Email` if the message cannot be sent.
    pub async fn send_confirmation(&self, user: &User, locale: Locale) -> Result<(), AuthError> {
        let token = self.keys.sign(
            user.id,
            TokenPurpose::EmailConfirmation,
            self.keys.default_ttl(),
        )?;
        self.email
            .send(&user.email, MessageKind::Confirmation, locale, &token)
            .await?;
        Ok(())
    }

    /// Mail a new confirmation link unless the address is already verified.
    ///
    /// # Errors
    ///
    /// Same as [`Self::send_confirmation`].
    pub async fn resend_confirmation(&self, user: &User, locale: Locale) -> Result<(), AuthError> {
        if user.email_verified {
            return Ok(());
        }
        self.send_confirmation(user, locale).await
    }

    /// Mark the address of the token's user as verified.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` or `AuthError::WrongTokenPurpose` for a bad token.
    /// Returns `AuthError::UserNotFound` if the account was deleted since.
    pub async fn confirm_email(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.keys.verify(token, TokenPurpose::EmailConfirmation)?;

        self.users
            .set_email_verified(claims.user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %claims.user_id, "Email confirmed");
        self.users
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // Passwords
    // =========================================================================

    /// Mail a reset link if an account exists for `email`.
    ///
    /// Callers must report success whether or not the account exists. Earlier
    /// links for the address stop working. Delivery failures are logged only.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the address is malformed.
    /// Returns `AuthError::Repository` if storing the token fails.
    pub async fn request_password_reset(&self, email: &str, locale: Locale) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown address");
            return Ok(());
        };

        self.reset_tokens.delete_for_email(&email).await?;

        let token = generate_reset_token();
        self.reset_tokens
            .create(&email, &sha256_hex(&token), expiry_after(self.settings.reset_ttl)?)
            .await?;

        if let Err(e) = self
            .email
            .send(&user.email, MessageKind::Reset, locale, &token)
            .await
        {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }
        Ok(())
    }

    /// Set a new password from an emailed reset token.
    ///
    /// Consumes every reset token of the address and closes every session of
    /// the user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidResetToken` if the token is unknown or expired.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;

        // Taken before use so a link works once even under concurrent requests
        let record = self
            .reset_tokens
            .consume(&sha256_hex(token))
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        if record.expires_at <= Utc::now() {
            return Err(AuthError::InvalidResetToken);
        }

        let user = self
            .users
            .get_by_email(&record.email)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let password_hash = hash_password(new_password)?;
        self.users.update_password(user.id, &password_hash).await?;
        self.reset_tokens.delete_for_email(&record.email).await?;
        let closed = self.sessions.delete_for_user(user.id, None).await?;

        tracing::info!(user_id = %user.id, sessions_closed = closed, "Password reset");
        Ok(())
    }

    /// Change the password of a logged-in user.
    ///
    /// Other sessions of the user are closed; the current one stays open.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet requirements.
    pub async fn change_password(
        &self,
        auth: &AuthUser,
        current: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let stored = self.users.get_password_hash_by_id(auth.user.id).await?;
        verify_password(current, &stored)?;
        validate_password(new_password)?;

        let password_hash = hash_password(new_password)?;
        self.users
            .update_password(auth.user.id, &password_hash)
            .await?;
        let closed = self
            .sessions
            .delete_for_user(auth.user.id, Some(auth.session.id))
            .await?;

        tracing::info!(user_id = %auth.user.id, sessions_closed = closed, "Password changed");
        Ok(())
    }
}

/// Instant `ttl` from now.
fn expiry_after(ttl: TimeDelta) -> Result<DateTime<Utc>, AuthError> {
    Utc::now()
        .checked_add_signed(ttl)
        .ok_or(AuthError::LifetimeOutOfRange)
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the length is out of bounds.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// A fresh random reset token, hex encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex SHA-256 digest, the form reset tokens are stored in.
#[must_use]
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use territory_core::UserId;

    use super::*;
    use crate::db::create_lazy_pool;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("whatever1", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_bounds() {
        assert!(matches!(validate_password("short"), Err(AuthError::WeakPassword(_))));
        assert!(validate_password("eightchr").is_ok());
        assert!(validate_password("éééééééé").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_reset_token_shape() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), RESET_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        assert!(expiry_after(TimeDelta::days(30)).unwrap() > Utc::now());
        assert!(matches!(
            expiry_after(TimeDelta::MAX),
            Err(AuthError::LifetimeOutOfRange)
        ));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    fn keys() -> JwtKeys {
        JwtKeys::new(
            &SecretString::from("k3Y!x9#Lm2$Qp7&Zt4*Rw8^Vn1@Hs6%D"),
            TimeDelta::hours(1),
        )
    }

    fn settings() -> AuthSettings {
        AuthSettings {
            session_max_age: TimeDelta::days(30),
            reset_ttl: TimeDelta::minutes(60),
        }
    }

    #[tokio::test]
    async fn test_get_auth_user_fails_closed_without_database() {
        // Unroutable database: verification must fail before or at the lookup
        let pool = create_lazy_pool(&SecretString::from("mysql://u:p@127.0.0.1:9/none")).unwrap();
        let keys = keys();
        let email = EmailService::outbox("https://app.example.test");
        let auth = AuthService::new(&pool, &keys, &email, settings());

        assert!(auth.get_auth_user("garbage").await.is_none());

        let confirmation = keys
            .sign(UserId::new(1), TokenPurpose::EmailConfirmation, TimeDelta::hours(1))
            .unwrap();
        assert!(auth.get_auth_user(&confirmation).await.is_none());
    }

    #[tokio::test]
    async fn test_huge_session_lifetime_fails_without_panicking() {
        let pool = create_lazy_pool(&SecretString::from("mysql://u:p@127.0.0.1:9/none")).unwrap();
        let keys = keys();
        let email = EmailService::outbox("https://app.example.test");
        let settings = AuthSettings {
            session_max_age: TimeDelta::days(4_000_000_000),
            ..settings()
        };
        let auth = AuthService::new(&pool, &keys, &email, settings);

        let user = User {
            id: UserId::new(1),
            email: Email::parse("someone@territoires.fr").unwrap(),
            email_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            auth.create_session(&user).await,
            Err(AuthError::LifetimeOutOfRange)
        ));
    }

    #[tokio::test]
    async fn test_confirm_email_rejects_session_token() {
        let pool = create_lazy_pool(&SecretString::from("mysql://u:p@127.0.0.1:9/none")).unwrap();
        let keys = keys();
        let email = EmailService::outbox("https://app.example.test");
        let auth = AuthService::new(&pool, &keys, &email, settings());

        let session_token = keys
            .sign(UserId::new(1), TokenPurpose::Session, TimeDelta::hours(1))
            .unwrap();
        assert!(matches!(
            auth.confirm_email(&session_token).await,
            Err(AuthError::WrongTokenPurpose)
        ));
    }
}
