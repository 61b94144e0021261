//! Geographic primitives for territory outlines.
//!
//! Coordinates are WGS84 degrees. Distances and extents are kept in degrees
//! as well; the only projection applied anywhere is the local
//! equirectangular scaling in [`crate::MapFrame`].

use serde::{Deserialize, Serialize};

/// Errors raised while validating territory geometry.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A coordinate is NaN or infinite.
    #[error("coordinate {index} is not a finite number")]
    NotFinite {
        /// Position of the offending point in the input.
        index: usize,
    },
    /// Latitude outside [-90, 90].
    #[error("latitude {lat} at point {index} is out of range")]
    LatitudeOutOfRange {
        /// Position of the offending point in the input.
        index: usize,
        /// Offending latitude.
        lat: f64,
    },
    /// Longitude outside [-180, 180].
    #[error("longitude {lon} at point {index} is out of range")]
    LongitudeOutOfRange {
        /// Position of the offending point in the input.
        index: usize,
        /// Offending longitude.
        lon: f64,
    },
    /// Fewer than three distinct points.
    #[error("polygon needs at least {min} distinct points (got {got})")]
    TooFewPoints {
        /// Minimum point count.
        min: usize,
        /// Distinct points supplied.
        got: usize,
    },
    /// More points than a territory outline may hold.
    #[error("polygon has too many points (max {max})")]
    TooManyPoints {
        /// Maximum point count.
        max: usize,
    },
    /// Rotation is NaN or infinite.
    #[error("rotation must be a finite number of degrees")]
    InvalidRotation,
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude, positive north.
    pub lat: f64,
    /// Longitude, positive east.
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate without validation.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    fn validate(self, index: usize) -> Result<Self, GeometryError> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(GeometryError::NotFinite { index });
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(GeometryError::LatitudeOutOfRange {
                index,
                lat: self.lat,
            });
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(GeometryError::LongitudeOutOfRange {
                index,
                lon: self.lon,
            });
        }
        Ok(self)
    }
}

/// An ordered, open ring of coordinates outlining a territory.
///
/// A closing point equal to the first one is dropped on construction, so the
/// ring is always stored open. Serializes as a plain array of points and
/// re-validates on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct Polygon(Vec<Coordinate>);

impl Polygon {
    /// Minimum number of distinct points.
    pub const MIN_POINTS: usize = 3;
    /// Maximum number of points accepted from clients.
    pub const MAX_POINTS: usize = 10_000;

    /// Validate and build a polygon.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] for non-finite or out-of-range points, or when
    /// fewer than three distinct points remain.
    pub fn new(points: Vec<Coordinate>) -> Result<Self, GeometryError> {
        if points.len() > Self::MAX_POINTS {
            return Err(GeometryError::TooManyPoints {
                max: Self::MAX_POINTS,
            });
        }

        let mut points = points
            .into_iter()
            .enumerate()
            .map(|(index, point)| point.validate(index))
            .collect::<Result<Vec<_>, _>>()?;

        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        let mut distinct: Vec<Coordinate> = Vec::with_capacity(points.len());
        for point in &points {
            if !distinct.contains(point) {
                distinct.push(*point);
            }
        }
        if distinct.len() < Self::MIN_POINTS {
            return Err(GeometryError::TooFewPoints {
                min: Self::MIN_POINTS,
                got: distinct.len(),
            });
        }

        Ok(Self(points))
    }

    /// The outline points, in order.
    #[must_use]
    pub fn points(&self) -> &[Coordinate] {
        &self.0
    }

    /// Number of points in the open ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated polygon.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Smallest lat/lon rectangle containing every point.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(self.0.iter().copied())
    }
}

impl TryFrom<Vec<Coordinate>> for Polygon {
    type Error = GeometryError;

    fn try_from(points: Vec<Coordinate>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<Polygon> for Vec<Coordinate> {
    fn from(polygon: Polygon) -> Self {
        polygon.0
    }
}

/// An axis-aligned lat/lon rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Maximum latitude.
    pub north: f64,
    /// Minimum latitude.
    pub south: f64,
    /// Maximum longitude.
    pub east: f64,
    /// Minimum longitude.
    pub west: f64,
}

impl BoundingBox {
    /// Bounding box of a set of points. Returns a degenerate box at the
    /// origin when the iterator is empty.
    pub fn around(points: impl IntoIterator<Item = Coordinate>) -> Self {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Self {
                north: 0.0,
                south: 0.0,
                east: 0.0,
                west: 0.0,
            };
        };

        points.fold(
            Self {
                north: first.lat,
                south: first.lat,
                east: first.lon,
                west: first.lon,
            },
            |bbox, p| Self {
                north: bbox.north.max(p.lat),
                south: bbox.south.min(p.lat),
                east: bbox.east.max(p.lon),
                west: bbox.west.min(p.lon),
            },
        )
    }

    /// Center of the rectangle.
    #[must_use]
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            f64::midpoint(self.north, self.south),
            f64::midpoint(self.east, self.west),
        )
    }

    /// Latitude span in degrees.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Longitude span in degrees.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Whether the point lies inside or on the edge.
    #[must_use]
    pub fn contains(&self, point: &Coordinate) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lon)
    }
}

/// Normalize a rotation in degrees to `[0, 360)`.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidRotation`] for NaN or infinite input.
pub fn normalize_rotation(degrees: f64) -> Result<f64, GeometryError> {
    if !degrees.is_finite() {
        return Err(GeometryError::InvalidRotation);
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    Ok(if normalized >= 360.0 { 0.0 } else { normalized })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn square() -> Vec<Coordinate> {
        vec![
            Coordinate::new(48.0, 2.0),
            Coordinate::new(48.0, 3.0),
            Coordinate::new(49.0, 3.0),
            Coordinate::new(49.0, 2.0),
        ]
    }

    #[test]
    fn test_polygon_drops_closing_point() {
        let mut ring = square();
        ring.push(Coordinate::new(48.0, 2.0));
        let polygon = Polygon::new(ring).unwrap();
        assert_eq!(polygon.len(), 4);
        assert_eq!(polygon.points()[0], Coordinate::new(48.0, 2.0));
    }

    #[test]
    fn test_polygon_requires_three_distinct_points() {
        let err = Polygon::new(vec![
            Coordinate::new(1.0, 1.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
        ])
        .unwrap_err();
        assert_eq!(err, GeometryError::TooFewPoints { min: 3, got: 2 });
    }

    #[test]
    fn test_polygon_rejects_out_of_range() {
        let mut ring = square();
        ring[2].lat = 91.0;
        assert!(matches!(
            Polygon::new(ring),
            Err(GeometryError::LatitudeOutOfRange { index: 2, .. })
        ));

        let mut ring = square();
        ring[1].lon = -180.5;
        assert!(matches!(
            Polygon::new(ring),
            Err(GeometryError::LongitudeOutOfRange { index: 1, .. })
        ));

        let mut ring = square();
        ring[0].lat = f64::NAN;
        assert_eq!(
            Polygon::new(ring),
            Err(GeometryError::NotFinite { index: 0 })
        );
    }

    #[test]
    fn test_bounding_box() {
        let bbox = Polygon::new(square()).unwrap().bounding_box();
        assert_eq!(
            bbox,
            BoundingBox {
                north: 49.0,
                south: 48.0,
                east: 3.0,
                west: 2.0
            }
        );
        assert_eq!(bbox.center(), Coordinate::new(48.5, 2.5));
        assert!(bbox.contains(&Coordinate::new(48.2, 2.9)));
        assert!(!bbox.contains(&Coordinate::new(47.9, 2.5)));
    }

    #[test]
    fn test_polygon_deserialize_validates() {
        let json = r#"[{"lat":0,"lon":0},{"lat":0,"lon":1},{"lat":1,"lon":1}]"#;
        let polygon: Polygon = serde_json::from_str(json).unwrap();
        assert_eq!(polygon.len(), 3);

        let bad = r#"[{"lat":0,"lon":0},{"lat":0,"lon":1}]"#;
        assert!(serde_json::from_str::<Polygon>(bad).is_err());
    }

    #[test]
    fn test_normalize_rotation() {
        assert!((normalize_rotation(370.0).unwrap() - 10.0).abs() < 1e-9);
        assert!((normalize_rotation(-90.0).unwrap() - 270.0).abs() < 1e-9);
        assert!(normalize_rotation(360.0).unwrap().abs() < 1e-9);
        assert_eq!(
            normalize_rotation(f64::INFINITY),
            Err(GeometryError::InvalidRotation)
        );
    }
}
