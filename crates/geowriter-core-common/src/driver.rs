//! Driver service traits implemented by format backends.
//!
//! A backend exposes a [`DriverService`] that hands out [`Driver`]s by name.
//! A driver creates [`Dataset`]s; a dataset owns layers, fields and committed
//! features. The export engine talks to backends only through these traits,
//! so format crates never depend on the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::crs::SpatialRef;
use crate::geometry::GeometryType;

/// Errors reported by format drivers.
///
/// The `Display` output is the driver diagnostic that the engine embeds in
/// its own messages.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No driver is registered under the requested name
    #[error("driver '{name}' is not available")]
    NotFound {
        /// The requested driver name
        name: String,
    },

    /// The driver cannot perform the requested operation
    #[error("{operation} is not supported by driver '{driver}'")]
    Unsupported {
        /// Driver name
        driver: String,
        /// Operation that was attempted
        operation: String,
    },

    /// The driver rejected the request
    #[error("{message}")]
    Failed {
        /// Diagnostic text
        message: String,
    },

    /// Filesystem failure
    #[error("{path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
}

impl DriverError {
    /// Creates a [`DriverError::Failed`] with the given diagnostic.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        DriverError::Failed {
            message: message.into(),
        }
    }

    /// Creates a [`DriverError::Io`] for `path`.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DriverError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Field types a driver can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputFieldType {
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    Integer64,
    /// Double precision float
    Real,
    /// Text
    String,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time of day
    DateTime,
}

impl OutputFieldType {
    /// Every output field type.
    pub const ALL: [OutputFieldType; 7] = [
        OutputFieldType::Integer,
        OutputFieldType::Integer64,
        OutputFieldType::Real,
        OutputFieldType::String,
        OutputFieldType::Date,
        OutputFieldType::Time,
        OutputFieldType::DateTime,
    ];

    /// Returns the driver-facing name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OutputFieldType::Integer => "Integer",
            OutputFieldType::Integer64 => "Integer64",
            OutputFieldType::Real => "Real",
            OutputFieldType::String => "String",
            OutputFieldType::Date => "Date",
            OutputFieldType::Time => "Time",
            OutputFieldType::DateTime => "DateTime",
        }
    }
}

impl fmt::Display for OutputFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a field to create in an output layer.
///
/// Width and precision are only passed on when they are meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Output field name
    pub name: String,
    /// Output field type
    pub field_type: OutputFieldType,
    /// Field width
    pub width: Option<u32>,
    /// Decimal precision
    pub precision: Option<u32>,
}

/// Broken-down date and time handed to drivers.
///
/// Dates carry a zero time of day; times carry a zero date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeParts {
    /// Year
    pub year: i32,
    /// Month (1-12, 0 for a pure time)
    pub month: u32,
    /// Day (1-31, 0 for a pure time)
    pub day: u32,
    /// Hour
    pub hour: u32,
    /// Minute
    pub minute: u32,
    /// Whole seconds
    pub second: u32,
}

/// A converted field value ready to be stored by a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 32-bit integer
    Integer(i32),
    /// 64-bit integer
    Integer64(i64),
    /// Double precision float
    Real(f64),
    /// Text already encoded with the session codec
    String(Vec<u8>),
    /// Date, time or date-time components
    DateTime(DateTimeParts),
}

/// A geometry imported into a driver-side container of a fixed type.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputGeometry {
    /// Type of the container the WKB was imported into
    pub geometry_type: GeometryType,
    /// Imported WKB
    pub wkb: Vec<u8>,
}

/// A feature record built by the engine and handed over to a driver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputFeature {
    /// Explicit feature id; `None` lets the driver assign one
    pub fid: Option<i64>,
    /// Field values keyed by output field index
    pub fields: BTreeMap<usize, FieldValue>,
    /// Geometry, if the layer has one
    pub geometry: Option<OutputGeometry>,
    /// Feature style string
    pub style: Option<String>,
}

impl OutputFeature {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of the output field at `index`.
    pub fn set_field(&mut self, index: usize, value: FieldValue) {
        self.fields.insert(index, value);
    }
}

/// Handle of a layer inside a [`Dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub usize);

/// Entry point of a format backend.
pub trait DriverService: Send + Sync {
    /// Looks up a driver by its exact name.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotFound`] if no such driver exists.
    fn find_driver(&self, name: &str) -> Result<Arc<dyn Driver>, DriverError>;

    /// Names of every driver this service provides.
    fn driver_names(&self) -> Vec<String>;
}

/// A single output format.
pub trait Driver: Send + Sync {
    /// Driver name (e.g. `"ESRI Shapefile"`).
    fn name(&self) -> &str;

    /// Field types this driver can create.
    fn creation_field_types(&self) -> &[OutputFieldType];

    /// Returns `true` if `field_type` appears in [`Driver::creation_field_types`].
    fn supports_field_type(&self, field_type: OutputFieldType) -> bool {
        self.creation_field_types().contains(&field_type)
    }

    /// Returns `true` if the driver can create new datasets.
    fn can_create_datasource(&self) -> bool {
        true
    }

    /// Creates a dataset at `path` with `KEY=value` creation options.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be created.
    fn create_dataset(&self, path: &Path, options: &[String]) -> Result<Box<dyn Dataset>, DriverError>;

    /// Deletes a dataset previously created at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be removed.
    fn delete_dataset(&self, path: &Path) -> Result<(), DriverError>;
}

/// An open output dataset.
pub trait Dataset: Send {
    /// Creates a layer and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer cannot be created.
    fn create_layer(
        &mut self,
        name: &str,
        srs: Option<&SpatialRef>,
        geometry_type: GeometryType,
        options: &[String],
    ) -> Result<LayerId, DriverError>;

    /// Adds a field to a layer. The driver may launder or truncate the name.
    ///
    /// # Errors
    ///
    /// Returns an error if the field cannot be created.
    fn create_field(&mut self, layer: LayerId, definition: &FieldDefinition) -> Result<(), DriverError>;

    /// Index of the field called `name` in the materialized layer schema.
    fn field_index(&self, layer: LayerId, name: &str) -> Option<usize>;

    /// Number of fields in the materialized layer schema.
    fn field_count(&self, layer: LayerId) -> usize;

    /// Opens a transaction on the layer.
    ///
    /// # Errors
    ///
    /// Returns an error if transactions are unsupported.
    fn start_transaction(&mut self, layer: LayerId) -> Result<(), DriverError>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    fn commit_transaction(&mut self, layer: LayerId) -> Result<(), DriverError>;

    /// Imports WKB into a geometry container of type `container`.
    ///
    /// # Errors
    ///
    /// Returns an error if the WKB does not fit the container.
    fn import_geometry(&self, container: GeometryType, wkb: &[u8]) -> Result<OutputGeometry, DriverError>;

    /// Writes a feature record. The record is consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver rejects the record.
    fn commit_feature(&mut self, layer: LayerId, feature: OutputFeature) -> Result<(), DriverError>;

    /// Flushes and closes the dataset. Further calls are undefined.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn close(&mut self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display_is_diagnostic() {
        assert_eq!(DriverError::failed("disk full").to_string(), "disk full");
        assert_eq!(
            DriverError::NotFound {
                name: "XYZ".to_string()
            }
            .to_string(),
            "driver 'XYZ' is not available"
        );
    }

    #[test]
    fn test_output_feature_set_field() {
        let mut feature = OutputFeature::new();
        feature.set_field(2, FieldValue::Integer(5));
        feature.set_field(2, FieldValue::Integer(6));
        assert_eq!(feature.fields.len(), 1);
        assert_eq!(feature.fields.get(&2), Some(&FieldValue::Integer(6)));
    }

    #[test]
    fn test_output_field_type_names() {
        let names: Vec<&str> = OutputFieldType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(
            names,
            ["Integer", "Integer64", "Real", "String", "Date", "Time", "DateTime"]
        );
    }
}
