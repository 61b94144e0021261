//! Password reset token repository.
//!
//! Only the SHA-256 digest of a token is stored, so a leaked table cannot be
//! replayed against the reset endpoint.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use territory_core::Email;

use super::RepositoryError;

/// A stored reset token.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub email: Email,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Repository for password reset tokens.
pub struct PasswordResetTokenRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> PasswordResetTokenRepository<'a> {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Store a token digest for `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a digest collision.
    pub async fn create(
        &self,
        email: &Email,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (email, token_hash, expires_at) VALUES (?, ?, ?)",
        )
        .bind(email)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::on_unique("reset token"))?;

        Ok(())
    }

    /// Look up a token by digest, expired or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, RepositoryError> {
        let token = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT email, token_hash, expires_at, created_at
             FROM password_reset_tokens WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(token)
    }

    /// Take a token out of the table, expired or not.
    ///
    /// The row is locked, read and deleted in one transaction, so of several
    /// concurrent callers with the same digest only one gets `Some`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn consume(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let token = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT email, token_hash, expires_at, created_at
             FROM password_reset_tokens WHERE token_hash = ? FOR UPDATE",
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?;

        if token.is_some() {
            sqlx::query("DELETE FROM password_reset_tokens WHERE token_hash = ?")
                .bind(token_hash)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(token)
    }

    /// Delete every token issued for `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_email(&self, email: &Email) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE email = ?")
            .bind(email)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete tokens with `expires_at < now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
