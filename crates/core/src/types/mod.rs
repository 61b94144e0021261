//! Core types for the territory manager.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod geo;
pub mod id;
pub mod locale;
pub mod territory;

pub use email::{Email, EmailError};
pub use geo::{BoundingBox, Coordinate, GeometryError, Polygon, normalize_rotation};
pub use id::*;
pub use locale::Locale;
pub use territory::{
    ImageConfigError, ImageGenerationConfig, ImageKind, MapFrame, TerritoryNum, TerritoryNumError,
};
