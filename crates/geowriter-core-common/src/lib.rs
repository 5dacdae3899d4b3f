//! Common types and traits shared across `geowriter` crates.
//!
//! This crate provides the data model and collaborator traits that are shared
//! between `geowriter-core` and the format driver crates, preventing circular
//! dependencies.

pub mod crs;
pub mod driver;
pub mod feature;
pub mod geometry;
pub mod render;
pub mod source;

// Re-export commonly used types
pub use crs::{AffineCoordinateTransform, CoordinateTransform, DistanceUnit, SpatialRef, TransformError};
pub use driver::{
    Dataset, DateTimeParts, Driver, DriverError, DriverService, FieldDefinition, FieldValue,
    LayerId, OutputFeature, OutputFieldType, OutputGeometry,
};
pub use feature::{Feature, Field, FieldType, Fields, Value};
pub use geometry::{Dimensions, Geometry, GeometryError, GeometryKind, GeometryType};
pub use render::{FeatureRenderer, RenderUnit, Symbol, SymbolLayer};
pub use source::{FeatureRequest, MemoryLayer, ProviderKind, SourceInfo, VectorLayer};
