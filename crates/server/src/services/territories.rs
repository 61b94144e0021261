//! Territory management: validation, updates, map frames and images.

use serde::Deserialize;
use sqlx::MySqlPool;
use thiserror::Error;

use territory_core::{
    Coordinate, GeometryError, ImageConfigError, ImageGenerationConfig, ImageKind, MapFrame,
    Polygon, TerritoryNum, TerritoryNumError, UserId, normalize_rotation,
};

use crate::db::territories::TerritoryFields;
use crate::db::{RepositoryError, TerritoryRepository, UserConfigRepository};
use crate::models::{Territory, TerritoryImage, TerritorySummary};

/// Longest accepted territory name.
const MAX_NAME_LENGTH: usize = 255;

/// Errors from territory operations.
#[derive(Debug, Error)]
pub enum TerritoryError {
    /// Invalid territory number.
    #[error(transparent)]
    InvalidNum(#[from] TerritoryNumError),

    /// Invalid outline or rotation.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Invalid name.
    #[error("{0}")]
    InvalidName(String),

    /// Invalid image generation settings.
    #[error(transparent)]
    InvalidConfig(#[from] ImageConfigError),

    /// No such territory for this user.
    #[error("territory not found")]
    NotFound,

    /// The number is already used by another territory of the user.
    #[error("a territory with this number already exists")]
    AlreadyExists,

    /// Upload is not a PNG, JPEG or WebP image.
    #[error("image must be PNG, JPEG or WebP")]
    UnsupportedImage,

    /// Upload exceeds the configured limit.
    #[error("image exceeds {max} bytes")]
    ImageTooLarge {
        /// Maximum size in bytes.
        max: usize,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for TerritoryError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(_) => Self::AlreadyExists,
            other => Self::Repository(other),
        }
    }
}

/// Body of a territory creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTerritory {
    pub num: String,
    pub name: String,
    pub polygon: Vec<Coordinate>,
    #[serde(default)]
    pub rotation: Option<f64>,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TerritoryPatch {
    #[serde(default)]
    pub num: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub polygon: Option<Vec<Coordinate>>,
    #[serde(default)]
    pub rotation: Option<f64>,
}

/// Territory service.
pub struct TerritoryService<'a> {
    territories: TerritoryRepository<'a>,
    configs: UserConfigRepository<'a>,
}

impl<'a> TerritoryService<'a> {
    /// Create a new territory service.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self {
            territories: TerritoryRepository::new(pool),
            configs: UserConfigRepository::new(pool),
        }
    }

    /// List a user's territories, with miniatures inlined if asked.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::Repository` if a query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        with_miniatures: bool,
    ) -> Result<Vec<TerritorySummary>, TerritoryError> {
        let territories = self.territories.list_for_user(user_id).await?;
        let mut summaries: Vec<TerritorySummary> =
            territories.iter().map(TerritorySummary::from).collect();

        if with_miniatures {
            let miniatures = self.territories.list_miniatures(user_id).await?;
            for summary in &mut summaries {
                summary.miniature = miniatures
                    .iter()
                    .find(|(num, _)| num == summary.num.as_str())
                    .map(|(_, image)| image.to_data_url());
            }
        }

        Ok(summaries)
    }

    /// Get one territory.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::NotFound` if the user has no such territory.
    pub async fn get(&self, user_id: UserId, num: &str) -> Result<Territory, TerritoryError> {
        let num = TerritoryNum::parse(num)?;
        self.territories
            .get_by_num(user_id, &num)
            .await?
            .ok_or(TerritoryError::NotFound)
    }

    /// Create a territory.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad input.
    /// Returns `TerritoryError::AlreadyExists` if the number is taken.
    pub async fn create(
        &self,
        user_id: UserId,
        input: NewTerritory,
    ) -> Result<Territory, TerritoryError> {
        let num = TerritoryNum::parse(&input.num)?;
        let name = validate_name(&input.name)?;
        let polygon = Polygon::new(input.polygon)?;
        let rotation = normalize_rotation(input.rotation.unwrap_or(0.0))?;

        let territory = self
            .territories
            .create(
                user_id,
                &TerritoryFields {
                    num: &num,
                    name,
                    polygon: &polygon,
                    rotation,
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, num = %territory.num, "Territory created");
        Ok(territory)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::NotFound` if the user has no such territory.
    /// Returns `TerritoryError::AlreadyExists` if renumbering collides.
    pub async fn update(
        &self,
        user_id: UserId,
        num: &str,
        patch: TerritoryPatch,
    ) -> Result<Territory, TerritoryError> {
        let current = self.get(user_id, num).await?;

        let num = match patch.num.as_deref() {
            Some(new) => TerritoryNum::parse(new)?,
            None => current.num.clone(),
        };
        let name = match patch.name.as_deref() {
            Some(new) => validate_name(new)?,
            None => current.name.as_str(),
        };
        let polygon = match patch.polygon {
            Some(points) => Polygon::new(points)?,
            None => current.polygon.clone(),
        };
        let rotation = match patch.rotation {
            Some(deg) => normalize_rotation(deg)?,
            None => current.rotation,
        };

        let territory = self
            .territories
            .update(
                current.id,
                &TerritoryFields {
                    num: &num,
                    name,
                    polygon: &polygon,
                    rotation,
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, num = %territory.num, "Territory updated");
        Ok(territory)
    }

    /// Delete a territory and its images.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::NotFound` if the user has no such territory.
    pub async fn delete(&self, user_id: UserId, num: &str) -> Result<(), TerritoryError> {
        let num = TerritoryNum::parse(num)?;
        if !self.territories.delete(user_id, &num).await? {
            return Err(TerritoryError::NotFound);
        }
        tracing::info!(user_id = %user_id, num = %num, "Territory deleted");
        Ok(())
    }

    /// Frame to render for a territory with the user's image settings.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::NotFound` if the user has no such territory.
    pub async fn frame(&self, user_id: UserId, num: &str) -> Result<MapFrame, TerritoryError> {
        let territory = self.get(user_id, num).await?;
        let config = self.configs.get(user_id).await?;
        Ok(MapFrame::fit(&territory.polygon, territory.rotation, &config))
    }

    /// Store a generated image, replacing any previous one of that kind.
    ///
    /// Returns the detected content type.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::ImageTooLarge` or
    /// `TerritoryError::UnsupportedImage` for rejected uploads.
    pub async fn put_image(
        &self,
        user_id: UserId,
        num: &str,
        kind: ImageKind,
        data: &[u8],
        max_bytes: usize,
    ) -> Result<&'static str, TerritoryError> {
        if data.len() > max_bytes {
            return Err(TerritoryError::ImageTooLarge { max: max_bytes });
        }
        let content_type = sniff_image_type(data).ok_or(TerritoryError::UnsupportedImage)?;

        let territory = self.get(user_id, num).await?;
        self.territories
            .put_image(territory.id, kind, content_type, data)
            .await?;

        tracing::info!(
            user_id = %user_id,
            num = %territory.num,
            kind = %kind,
            bytes = data.len(),
            "Territory image stored"
        );
        Ok(content_type)
    }

    /// Get a stored image.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::NotFound` if the territory or image is missing.
    pub async fn get_image(
        &self,
        user_id: UserId,
        num: &str,
        kind: ImageKind,
    ) -> Result<TerritoryImage, TerritoryError> {
        let territory = self.get(user_id, num).await?;
        self.territories
            .get_image(territory.id, kind)
            .await?
            .ok_or(TerritoryError::NotFound)
    }

    /// Delete a stored image.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::NotFound` if the territory or image is missing.
    pub async fn delete_image(
        &self,
        user_id: UserId,
        num: &str,
        kind: ImageKind,
    ) -> Result<(), TerritoryError> {
        let territory = self.get(user_id, num).await?;
        if !self.territories.delete_image(territory.id, kind).await? {
            return Err(TerritoryError::NotFound);
        }
        Ok(())
    }

    /// The user's image generation settings.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::Repository` if the query fails.
    pub async fn config(&self, user_id: UserId) -> Result<ImageGenerationConfig, TerritoryError> {
        Ok(self.configs.get(user_id).await?)
    }

    /// Validate and save the user's image generation settings.
    ///
    /// # Errors
    ///
    /// Returns `TerritoryError::InvalidConfig` naming the first bad field.
    pub async fn update_config(
        &self,
        user_id: UserId,
        config: ImageGenerationConfig,
    ) -> Result<ImageGenerationConfig, TerritoryError> {
        config.validate()?;
        self.configs.upsert(user_id, &config).await?;
        Ok(config)
    }
}

fn validate_name(name: &str) -> Result<&str, TerritoryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TerritoryError::InvalidName("name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(TerritoryError::InvalidName(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

/// Detect PNG, JPEG or WebP from the leading magic bytes.
#[must_use]
pub fn sniff_image_type(data: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    if data.starts_with(PNG) {
        Some("image/png")
    } else if data.starts_with(JPEG) {
        Some("image/jpeg")
    } else if data.get(..4) == Some(b"RIFF".as_slice())
        && data.get(8..12) == Some(b"WEBP".as_slice())
    {
        Some("image/webp")
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_image_type() {
        assert_eq!(sniff_image_type(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), Some("image/png"));
        assert_eq!(sniff_image_type(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]), Some("image/jpeg"));
        assert_eq!(sniff_image_type(b"RIFF\x24\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_type(b"RIFF\x24\0\0\0WAVEfmt "), None);
        assert_eq!(sniff_image_type(b"GIF89a"), None);
        assert_eq!(sniff_image_type(b""), None);
        assert_eq!(sniff_image_type(b"RIFF"), None);
        assert_eq!(sniff_image_type(b"RIFF\x24\0\0\0WEB"), None);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Centre ville ").unwrap(), "Centre ville");
        assert!(matches!(validate_name("   "), Err(TerritoryError::InvalidName(_))));
        assert!(validate_name(&"n".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_repository_error_mapping() {
        assert!(matches!(
            TerritoryError::from(RepositoryError::Conflict("territory number already exists".into())),
            TerritoryError::AlreadyExists
        ));
        assert!(matches!(
            TerritoryError::from(RepositoryError::NotFound),
            TerritoryError::NotFound
        ));
        assert!(matches!(
            TerritoryError::from(RepositoryError::DataCorruption("x".into())),
            TerritoryError::Repository(_)
        ));
    }

    #[test]
    fn test_patch_accepts_partial_body() {
        let patch: TerritoryPatch = serde_json::from_str(r#"{"rotation": 450}"#).unwrap();
        assert!(patch.num.is_none());
        assert!(patch.polygon.is_none());
        assert_eq!(patch.rotation, Some(450.0));
    }

    #[test]
    fn test_new_territory_rotation_optional() {
        let input: NewTerritory = serde_json::from_str(
            r#"{"num":"7","name":"Port","polygon":[{"lat":1,"lon":1},{"lat":1,"lon":2},{"lat":2,"lon":2}]}"#,
        )
        .unwrap();
        assert_eq!(input.rotation, None);
        assert_eq!(input.polygon.len(), 3);
    }
}
