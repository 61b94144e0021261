//! Per-user image generation settings.

use sqlx::MySqlPool;
use sqlx::types::Json;

use territory_core::{ImageGenerationConfig, UserId};

use super::RepositoryError;

/// Repository for `user_configs`.
pub struct UserConfigRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> UserConfigRepository<'a> {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// The user's settings, or the defaults when none were saved.
    ///
    /// Missing fields in an older stored document take their default value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<ImageGenerationConfig, RepositoryError> {
        let stored = sqlx::query_scalar::<_, Json<ImageGenerationConfig>>(
            "SELECT image_generation FROM user_configs WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(stored.map(|Json(config)| config).unwrap_or_default())
    }

    /// Save the user's settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        user_id: UserId,
        config: &ImageGenerationConfig,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_configs (user_id, image_generation) VALUES (?, ?)
             ON DUPLICATE KEY UPDATE image_generation = VALUES(image_generation)",
        )
        .bind(user_id)
        .bind(Json(config))
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
