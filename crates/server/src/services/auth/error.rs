//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] territory_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Signed token could not be created, or failed verification.
    #[error("token error: {0}")]
    Token(#[source] jsonwebtoken::errors::Error),

    /// Configured lifetime puts the expiry out of the representable range.
    #[error("token lifetime out of range")]
    LifetimeOutOfRange,

    /// Token is valid but was issued for another use.
    #[error("token issued for another purpose")]
    WrongTokenPurpose,

    /// Reset token unknown, already used or expired.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// Session missing or expired.
    #[error("session expired")]
    SessionExpired,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Sending a transactional email failed.
    #[error("email error: {0}")]
    Email(#[from] EmailError),
}
