//! Data types returned by export operations.

use std::path::PathBuf;

use geowriter_core_common::GeometryType;

/// Outcome of a successful layer export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Path of the written dataset, including any appended extension
    pub output_path: PathBuf,
    /// Driver the dataset was written with
    pub driver_name: String,
    /// Geometry type of the output layer
    pub geometry_type: GeometryType,
    /// Number of source features handed to the writer
    pub features_written: usize,
    /// Number of features dropped by the extent filter
    pub features_filtered: usize,
}
