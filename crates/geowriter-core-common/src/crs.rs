//! Spatial references and coordinate transforms.
//!
//! The export engine never projects coordinates itself; it receives a
//! [`CoordinateTransform`] from the caller and applies it feature by feature.

use std::fmt;

use geo::{AffineOps, AffineTransform};
use thiserror::Error;

use crate::geometry::Geometry;

/// Linear unit of a coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    /// Metres
    Meters,
    /// Kilometres
    Kilometers,
    /// International feet
    Feet,
    /// Angular degrees
    Degrees,
    /// Unit could not be determined
    #[default]
    Unknown,
}

/// A coordinate reference system as handed to format drivers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpatialRef {
    /// WKT definition written to sidecar files and passed to drivers
    pub wkt: String,
    /// Authority identifier such as `EPSG:4326`, when known
    pub auth_id: Option<String>,
    /// Map units of the reference system
    pub map_units: DistanceUnit,
}

impl SpatialRef {
    /// Creates a reference from its WKT definition.
    #[must_use]
    pub fn from_wkt(wkt: impl Into<String>, map_units: DistanceUnit) -> Self {
        Self {
            wkt: wkt.into(),
            auth_id: None,
            map_units,
        }
    }

    /// Sets the authority identifier.
    #[must_use]
    pub fn with_auth_id(mut self, auth_id: impl Into<String>) -> Self {
        self.auth_id = Some(auth_id.into());
        self
    }

    /// A reference is valid when it carries a WKT definition.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.wkt.trim().is_empty()
    }
}

impl fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.auth_id {
            Some(id) => f.write_str(id),
            None => f.write_str(&self.wkt),
        }
    }
}

/// Failure reported by a coordinate transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransformError {
    /// Diagnostic text from the projection library
    pub message: String,
}

impl TransformError {
    /// Creates a transform error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Reprojects geometries into a destination reference system.
pub trait CoordinateTransform: Send + Sync {
    /// Reference system of the transformed geometries.
    fn destination_crs(&self) -> &SpatialRef;

    /// Transforms one geometry.
    ///
    /// # Errors
    ///
    /// Returns an error when a coordinate cannot be projected.
    fn transform(&self, geometry: &Geometry) -> Result<Geometry, TransformError>;
}

/// A transform applying a fixed 2D affine matrix.
///
/// Useful for local grid shifts and in tests. Elevations are not preserved.
#[derive(Debug, Clone)]
pub struct AffineCoordinateTransform {
    destination: SpatialRef,
    matrix: AffineTransform<f64>,
}

impl AffineCoordinateTransform {
    /// Creates a transform into `destination` using `matrix`.
    #[must_use]
    pub fn new(destination: SpatialRef, matrix: AffineTransform<f64>) -> Self {
        Self {
            destination,
            matrix,
        }
    }

    /// Creates a pure translation.
    #[must_use]
    pub fn translation(destination: SpatialRef, dx: f64, dy: f64) -> Self {
        Self::new(destination, AffineTransform::translate(dx, dy))
    }
}

impl CoordinateTransform for AffineCoordinateTransform {
    fn destination_crs(&self) -> &SpatialRef {
        &self.destination
    }

    fn transform(&self, geometry: &Geometry) -> Result<Geometry, TransformError> {
        let decoded = geometry
            .to_geo()
            .map_err(|e| TransformError::new(e.to_string()))?;
        let moved = decoded.affine_transform(&self.matrix);
        Geometry::from_geo(&moved).map_err(|e| TransformError::new(e.to_string()))
    }
}
