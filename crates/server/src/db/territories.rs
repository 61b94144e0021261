//! Territory and territory image repository.

use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use sqlx::types::Json;

use territory_core::{
    BoundingBox, Coordinate, ImageKind, Polygon, TerritoryId, TerritoryNum, UserId,
};

use super::RepositoryError;
use crate::models::{Territory, TerritoryImage};

#[derive(sqlx::FromRow)]
struct TerritoryRow {
    id: TerritoryId,
    user_id: UserId,
    num: String,
    name: String,
    polygon: Json<Vec<Coordinate>>,
    rotation: f64,
    bbox_north: f64,
    bbox_south: f64,
    bbox_east: f64,
    bbox_west: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TerritoryRow> for Territory {
    type Error = RepositoryError;

    fn try_from(row: TerritoryRow) -> Result<Self, Self::Error> {
        let num = TerritoryNum::parse(&row.num).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid territory number in database: {e}"))
        })?;
        let polygon = Polygon::new(row.polygon.0).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid polygon for territory {num}: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            num,
            name: row.name,
            polygon,
            rotation: row.rotation,
            bounding_box: BoundingBox {
                north: row.bbox_north,
                south: row.bbox_south,
                east: row.bbox_east,
                west: row.bbox_west,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    territory_id: TerritoryId,
    kind: String,
    content_type: String,
    data: Vec<u8>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ImageRow> for TerritoryImage {
    type Error = RepositoryError;

    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<ImageKind>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            territory_id: row.territory_id,
            kind,
            content_type: row.content_type,
            data: row.data,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MiniatureRow {
    num: String,
    #[sqlx(flatten)]
    image: ImageRow,
}

const TERRITORY_COLUMNS: &str = "id, user_id, num, name, polygon, rotation, \
     bbox_north, bbox_south, bbox_east, bbox_west, created_at, updated_at";

/// Fields written on create and update.
#[derive(Debug, Clone)]
pub struct TerritoryFields<'f> {
    pub num: &'f TerritoryNum,
    pub name: &'f str,
    pub polygon: &'f Polygon,
    /// Already normalized to `[0, 360)`.
    pub rotation: f64,
}

/// Repository for territories and their images.
pub struct TerritoryRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> TerritoryRepository<'a> {
    /// Create a new territory repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// All territories of a user, ordered by number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Territory>, RepositoryError> {
        let rows = sqlx::query_as::<_, TerritoryRow>(&format!(
            "SELECT {TERRITORY_COLUMNS} FROM territories
             WHERE user_id = ?
             ORDER BY CHAR_LENGTH(num), num"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Territory::try_from).collect()
    }

    /// Get one territory by its number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_num(
        &self,
        user_id: UserId,
        num: &TerritoryNum,
    ) -> Result<Option<Territory>, RepositoryError> {
        let row = sqlx::query_as::<_, TerritoryRow>(&format!(
            "SELECT {TERRITORY_COLUMNS} FROM territories WHERE user_id = ? AND num = ?"
        ))
        .bind(user_id)
        .bind(num.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Territory::try_from).transpose()
    }

    async fn get_by_id(&self, id: TerritoryId) -> Result<Option<Territory>, RepositoryError> {
        let row = sqlx::query_as::<_, TerritoryRow>(&format!(
            "SELECT {TERRITORY_COLUMNS} FROM territories WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Territory::try_from).transpose()
    }

    /// Insert a territory; the bounding box is derived from the polygon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has this number.
    pub async fn create(
        &self,
        user_id: UserId,
        fields: &TerritoryFields<'_>,
    ) -> Result<Territory, RepositoryError> {
        let bbox = fields.polygon.bounding_box();
        let result = sqlx::query(
            "INSERT INTO territories
                (user_id, num, name, polygon, rotation, bbox_north, bbox_south, bbox_east, bbox_west)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(fields.num.as_str())
        .bind(fields.name)
        .bind(Json(fields.polygon.points()))
        .bind(fields.rotation)
        .bind(bbox.north)
        .bind(bbox.south)
        .bind(bbox.east)
        .bind(bbox.west)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::on_unique("territory number"))?;

        let id = i32::try_from(result.last_insert_id()).map_err(|e| {
            RepositoryError::DataCorruption(format!("territory id out of range: {e}"))
        })?;

        self.get_by_id(TerritoryId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Overwrite a territory's fields; the bounding box is recomputed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the territory doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new number is taken.
    pub async fn update(
        &self,
        id: TerritoryId,
        fields: &TerritoryFields<'_>,
    ) -> Result<Territory, RepositoryError> {
        let bbox = fields.polygon.bounding_box();
        sqlx::query(
            "UPDATE territories
             SET num = ?, name = ?, polygon = ?, rotation = ?,
                 bbox_north = ?, bbox_south = ?, bbox_east = ?, bbox_west = ?
             WHERE id = ?",
        )
        .bind(fields.num.as_str())
        .bind(fields.name)
        .bind(Json(fields.polygon.points()))
        .bind(fields.rotation)
        .bind(bbox.north)
        .bind(bbox.south)
        .bind(bbox.east)
        .bind(bbox.west)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::on_unique("territory number"))?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a territory and, by cascade, its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId, num: &TerritoryNum) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM territories WHERE user_id = ? AND num = ?")
            .bind(user_id)
            .bind(num.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert or replace an image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn put_image(
        &self,
        territory_id: TerritoryId,
        kind: ImageKind,
        content_type: &str,
        data: &[u8],
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO territory_images (territory_id, kind, content_type, data)
             VALUES (?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE content_type = VALUES(content_type), data = VALUES(data)",
        )
        .bind(territory_id)
        .bind(kind.as_str())
        .bind(content_type)
        .bind(data)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Get an image of a territory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_image(
        &self,
        territory_id: TerritoryId,
        kind: ImageKind,
    ) -> Result<Option<TerritoryImage>, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(
            "SELECT territory_id, kind, content_type, data, updated_at
             FROM territory_images WHERE territory_id = ? AND kind = ?",
        )
        .bind(territory_id)
        .bind(kind.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TerritoryImage::try_from).transpose()
    }

    /// Delete an image of a territory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_image(
        &self,
        territory_id: TerritoryId,
        kind: ImageKind,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM territory_images WHERE territory_id = ? AND kind = ?")
            .bind(territory_id)
            .bind(kind.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Miniatures of all a user's territories, keyed by number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_miniatures(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(String, TerritoryImage)>, RepositoryError> {
        let rows = sqlx::query_as::<_, MiniatureRow>(
            "SELECT t.num, i.territory_id, i.kind, i.content_type, i.data, i.updated_at
             FROM territory_images i
             JOIN territories t ON t.id = i.territory_id
             WHERE t.user_id = ? AND i.kind = ?",
        )
        .bind(user_id)
        .bind(ImageKind::Miniature.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok((row.num, TerritoryImage::try_from(row.image)?)))
            .collect()
    }
}
