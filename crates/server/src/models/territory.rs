//! Territory domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use territory_core::{BoundingBox, ImageKind, Polygon, TerritoryId, TerritoryNum, UserId};

/// A territory outline owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Territory {
    #[serde(skip)]
    pub id: TerritoryId,
    #[serde(skip)]
    pub user_id: UserId,
    /// User-facing number, unique per user.
    pub num: TerritoryNum,
    pub name: String,
    pub polygon: Polygon,
    /// Map rotation in degrees, `[0, 360)`.
    pub rotation: f64,
    /// Derived from `polygon` on every write.
    pub bounding_box: BoundingBox,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List entry for a territory, optionally with its miniature inlined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritorySummary {
    pub num: TerritoryNum,
    pub name: String,
    pub rotation: f64,
    pub bounding_box: BoundingBox,
    pub updated_at: DateTime<Utc>,
    /// `data:` URL of the miniature when requested and present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miniature: Option<String>,
}

impl From<&Territory> for TerritorySummary {
    fn from(territory: &Territory) -> Self {
        Self {
            num: territory.num.clone(),
            name: territory.name.clone(),
            rotation: territory.rotation,
            bounding_box: territory.bounding_box,
            updated_at: territory.updated_at,
            miniature: None,
        }
    }
}

/// A stored image for a territory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryImage {
    pub territory_id: TerritoryId,
    pub kind: ImageKind,
    /// MIME type sniffed at upload.
    pub content_type: String,
    pub data: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

impl TerritoryImage {
    /// Encode the image as a `data:` URL for inlining in JSON.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        use base64::Engine;
        format!(
            "data:{};base64,{}",
            self.content_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}
