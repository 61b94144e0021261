//! Territory identifiers, image settings and map framing.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geo::{Coordinate, Polygon};

/// Errors for [`TerritoryNum`] parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TerritoryNumError {
    /// Empty after trimming.
    #[error("territory number cannot be empty")]
    Empty,
    /// Longer than [`TerritoryNum::MAX_LENGTH`].
    #[error("territory number must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Contains a character outside `[A-Za-z0-9._-]`.
    #[error("territory number contains invalid character {0:?}")]
    InvalidChar(char),
}

/// The user-facing number of a territory (e.g. `"12"`, `"B-4"`).
///
/// Unique per user and used as the path segment in the API, so only
/// URL-safe characters are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TerritoryNum(String);

impl TerritoryNum {
    /// Maximum length of a territory number.
    pub const MAX_LENGTH: usize = 32;

    /// Parse a territory number.
    ///
    /// # Errors
    ///
    /// Returns [`TerritoryNumError`] if the value is empty, too long or has
    /// characters outside `[A-Za-z0-9._-]`.
    pub fn parse(s: &str) -> Result<Self, TerritoryNumError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TerritoryNumError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(TerritoryNumError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(TerritoryNumError::InvalidChar(c));
        }
        Ok(Self(s.to_owned()))
    }

    /// The number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TerritoryNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TerritoryNum {
    type Err = TerritoryNumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TerritoryNum {
    type Error = TerritoryNumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TerritoryNum> for String {
    fn from(num: TerritoryNum) -> Self {
        num.0
    }
}

/// Which generated image of a territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Small preview shown in territory lists.
    Miniature,
    /// Full-size printable map.
    Full,
}

impl ImageKind {
    /// Database / path representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Miniature => "miniature",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "miniature" => Ok(Self::Miniature),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown image kind: {other}")),
        }
    }
}

/// Invalid [`ImageGenerationConfig`] field.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid image configuration: {field} {reason}")]
pub struct ImageConfigError {
    /// Offending field (camelCase, as sent by clients).
    pub field: &'static str,
    /// Human readable constraint.
    pub reason: &'static str,
}

/// Per-user settings for generating territory map images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageGenerationConfig {
    /// Horizontal part of the image aspect ratio.
    pub ratio_x: u32,
    /// Vertical part of the image aspect ratio.
    pub ratio_y: u32,
    /// Width in pixels of the full image.
    pub width_px: u32,
    /// Width in pixels of the miniature.
    pub miniature_width_px: u32,
    /// Margin around the outline, as a fraction of its larger side.
    pub padding: f64,
    /// Outline color, `#rrggbb`.
    pub stroke_color: String,
    /// Outline width in pixels.
    pub stroke_width: f64,
    /// Fill opacity inside the outline, 0 to 1.
    pub fill_opacity: f64,
}

impl Default for ImageGenerationConfig {
    fn default() -> Self {
        Self {
            ratio_x: 3,
            ratio_y: 2,
            width_px: 1600,
            miniature_width_px: 320,
            padding: 0.05,
            stroke_color: "#e11d48".to_owned(),
            stroke_width: 4.0,
            fill_opacity: 0.15,
        }
    }
}

impl ImageGenerationConfig {
    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ImageConfigError`] found.
    pub fn validate(&self) -> Result<(), ImageConfigError> {
        let err = |field, reason| Err(ImageConfigError { field, reason });

        if !(1..=100).contains(&self.ratio_x) {
            return err("ratioX", "must be between 1 and 100");
        }
        if !(1..=100).contains(&self.ratio_y) {
            return err("ratioY", "must be between 1 and 100");
        }
        if !(64..=8192).contains(&self.width_px) {
            return err("widthPx", "must be between 64 and 8192");
        }
        if !(16..=self.width_px).contains(&self.miniature_width_px) {
            return err("miniatureWidthPx", "must be between 16 and widthPx");
        }
        if !(0.0..=1.0).contains(&self.padding) {
            return err("padding", "must be between 0 and 1");
        }
        if !is_hex_color(&self.stroke_color) {
            return err("strokeColor", "must be a #rrggbb color");
        }
        if !(0.0..=64.0).contains(&self.stroke_width) {
            return err("strokeWidth", "must be between 0 and 64");
        }
        if !(0.0..=1.0).contains(&self.fill_opacity) {
            return err("fillOpacity", "must be between 0 and 1");
        }
        Ok(())
    }

    /// Aspect ratio as width / height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.ratio_x) / f64::from(self.ratio_y)
    }

    /// Pixel height matching `width` at the configured ratio.
    #[must_use]
    pub fn height_for(&self, width: u32) -> u32 {
        let height = (f64::from(width) / self.aspect_ratio()).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // bounded by validate()
        let height = height.max(1.0) as u32;
        height
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s.chars().skip(1).all(|c| c.is_ascii_hexdigit())
}

/// The rectangle an image generator renders for a territory.
///
/// Extents are in degrees of latitude; east-west distances were scaled by
/// `cos(latitude)` at the frame center so both axes share one unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFrame {
    /// Geographic center of the frame.
    pub center: Coordinate,
    /// Rotation applied to the map, degrees clockwise.
    pub rotation: f64,
    /// Frame width, latitude-equivalent degrees.
    pub width: f64,
    /// Frame height, latitude-equivalent degrees.
    pub height: f64,
    /// Full image width in pixels.
    pub width_px: u32,
    /// Full image height in pixels.
    pub height_px: u32,
    /// Miniature width in pixels.
    pub miniature_width_px: u32,
    /// Miniature height in pixels.
    pub miniature_height_px: u32,
}

impl MapFrame {
    /// Fit a frame around `polygon` rotated by `rotation` degrees.
    ///
    /// Points are projected around the bounding-box center, rotated, and the
    /// rotated extent is padded and then widened along one axis to match the
    /// configured aspect ratio. The frame center is the rotated extent's
    /// center mapped back to lat/lon.
    #[must_use]
    pub fn fit(polygon: &Polygon, rotation: f64, config: &ImageGenerationConfig) -> Self {
        let origin = polygon.bounding_box().center();
        let lon_scale = origin.lat.to_radians().cos().max(1e-6);
        let (sin, cos) = rotation.to_radians().sin_cos();

        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in polygon.points() {
            let x = (p.lon - origin.lon) * lon_scale;
            let y = p.lat - origin.lat;
            // Clockwise map rotation moves points counterclockwise in frame space
            let rx = x.mul_add(cos, -(y * sin));
            let ry = x.mul_add(sin, y * cos);
            min_x = min_x.min(rx);
            max_x = max_x.max(rx);
            min_y = min_y.min(ry);
            max_y = max_y.max(ry);
        }

        let mut width = max_x - min_x;
        let mut height = max_y - min_y;
        let pad = config.padding * width.max(height);
        width = 2.0f64.mul_add(pad, width);
        height = 2.0f64.mul_add(pad, height);

        let ratio = config.aspect_ratio();
        if height == 0.0 || width / height > ratio {
            height = width / ratio;
        } else {
            width = height * ratio;
        }

        // Undo the rotation for the extent center
        let cx = f64::midpoint(min_x, max_x);
        let cy = f64::midpoint(min_y, max_y);
        let x = cx.mul_add(cos, cy * sin);
        let y = (-cx).mul_add(sin, cy * cos);
        let center = Coordinate::new(origin.lat + y, origin.lon + x / lon_scale);

        Self {
            center,
            rotation,
            width,
            height,
            width_px: config.width_px,
            height_px: config.height_for(config.width_px),
            miniature_width_px: config.miniature_width_px,
            miniature_height_px: config.height_for(config.miniature_width_px),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rectangle() -> Polygon {
        // 0.02 degrees of latitude by 0.02 degrees of longitude at the equator
        Polygon::new(vec![
            Coordinate::new(-0.01, -0.01),
            Coordinate::new(-0.01, 0.01),
            Coordinate::new(0.01, 0.01),
            Coordinate::new(0.01, -0.01),
        ])
        .unwrap()
    }

    #[test]
    fn test_territory_num_parse() {
        assert_eq!(TerritoryNum::parse(" B-4 ").unwrap().as_str(), "B-4");
        assert_eq!(TerritoryNum::parse(""), Err(TerritoryNumError::Empty));
        assert_eq!(
            TerritoryNum::parse("12/3"),
            Err(TerritoryNumError::InvalidChar('/'))
        );
        assert!(matches!(
            TerritoryNum::parse(&"9".repeat(33)),
            Err(TerritoryNumError::TooLong { max: 32 })
        ));
    }

    #[test]
    fn test_image_kind_from_str() {
        assert_eq!("miniature".parse::<ImageKind>(), Ok(ImageKind::Miniature));
        assert_eq!("full".parse::<ImageKind>(), Ok(ImageKind::Full));
        assert!("thumbnail".parse::<ImageKind>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ImageGenerationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = ImageGenerationConfig {
            stroke_color: "red".to_owned(),
            ..ImageGenerationConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "strokeColor");

        let config = ImageGenerationConfig {
            miniature_width_px: 4000,
            ..ImageGenerationConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "miniatureWidthPx");
    }

    #[test]
    fn test_config_deserializes_partial_camel_case() {
        let config: ImageGenerationConfig =
            serde_json::from_str(r#"{"ratioX":16,"ratioY":9}"#).unwrap();
        assert_eq!(config.ratio_x, 16);
        assert_eq!(config.ratio_y, 9);
        assert_eq!(config.width_px, 1600);
        assert_eq!(config.height_for(1600), 900);
    }

    #[test]
    fn test_frame_matches_aspect_ratio() {
        let config = ImageGenerationConfig {
            padding: 0.0,
            ..ImageGenerationConfig::default()
        };
        let frame = MapFrame::fit(&rectangle(), 0.0, &config);
        assert!((frame.width / frame.height - 1.5).abs() < 1e-9);
        // Square outline: height stays at the outline size, width grows
        assert!((frame.height - 0.02).abs() < 1e-9);
        assert!(frame.center.lat.abs() < 1e-12);
        assert!(frame.center.lon.abs() < 1e-12);
        assert_eq!(frame.height_px, 1067);
    }

    #[test]
    fn test_frame_padding_grows_extent() {
        let config = ImageGenerationConfig {
            ratio_x: 1,
            ratio_y: 1,
            padding: 0.5,
            ..ImageGenerationConfig::default()
        };
        let frame = MapFrame::fit(&rectangle(), 0.0, &config);
        assert!((frame.width - 0.04).abs() < 1e-9);
        assert!((frame.height - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_frame_rotation_of_square_by_45_degrees() {
        let config = ImageGenerationConfig {
            ratio_x: 1,
            ratio_y: 1,
            padding: 0.0,
            ..ImageGenerationConfig::default()
        };
        let frame = MapFrame::fit(&rectangle(), 45.0, &config);
        // Diagonal of a 0.02 square
        let diagonal = 0.02 * std::f64::consts::SQRT_2;
        assert!((frame.width - diagonal).abs() < 1e-9);
        assert!((frame.rotation - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_frame_center_follows_offset_outline() {
        let polygon = Polygon::new(vec![
            Coordinate::new(45.0, 5.0),
            Coordinate::new(45.0, 5.2),
            Coordinate::new(45.1, 5.2),
        ])
        .unwrap();
        let frame = MapFrame::fit(&polygon, 90.0, &ImageGenerationConfig::default());
        assert!((frame.center.lat - 45.05).abs() < 1e-9);
        assert!((frame.center.lon - 5.1).abs() < 1e-9);
    }
}
