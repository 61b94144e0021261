//! Session repository.
//!
//! Sessions are soft-expiring: an expired row is ignored by
//! [`SessionRepository::get_valid_by_token`] and removed later by
//! [`SessionRepository::delete_expired`].

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use territory_core::{SessionId, UserId};

use super::RepositoryError;
use crate::models::Session;

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: SessionId,
    token: String,
    user_id: UserId,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            token: row.token,
            user_id: row.user_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// Repository for session database operations.
pub struct SessionRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Insert a session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the token is already in use.
    pub async fn create(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, RepositoryError> {
        let result =
            sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
                .bind(token)
                .bind(user_id)
                .bind(expires_at)
                .execute(self.pool)
                .await
                .map_err(RepositoryError::on_unique("session token"))?;

        let id = i32::try_from(result.last_insert_id()).map_err(|e| {
            RepositoryError::DataCorruption(format!("session id out of range: {e}"))
        })?;

        self.get_by_id(SessionId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get a session by ID, expired or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: SessionId) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, token, user_id, expires_at, created_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Session::from))
    }

    /// Get a session by token, expired or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, token, user_id, expires_at, created_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Session::from))
    }

    /// Get a session by token if it has not expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_valid_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepositoryError> {
        Ok(self
            .get_by_token(token)
            .await?
            .filter(|session| !session.is_expired_at(now)))
    }

    /// Replace the token and expiry of a session (refresh).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session doesn't exist.
    pub async fn update_token(
        &self,
        id: SessionId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, RepositoryError> {
        let result = sqlx::query("UPDATE sessions SET token = ?, expires_at = ? WHERE id = ?")
            .bind(token)
            .bind(expires_at)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(RepositoryError::on_unique("session token"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: SessionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a session by token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every session of a user, optionally keeping one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_user(
        &self,
        user_id: UserId,
        keep: Option<SessionId>,
    ) -> Result<u64, RepositoryError> {
        let result = match keep {
            Some(keep) => {
                sqlx::query("DELETE FROM sessions WHERE user_id = ? AND id <> ?")
                    .bind(user_id)
                    .bind(keep)
                    .execute(self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                    .bind(user_id)
                    .execute(self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    /// Delete sessions with `expires_at < now`.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
