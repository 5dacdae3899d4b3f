//! `geowriter-core` is the core library of the `GeoWriter` project: it exports
//! vector layers into OGR-style output formats.
//!
//! This crate includes:
//! - **Driver Registry**: metadata and typed creation options of every writable format.
//! - **Field Mapping**: conversion of layer schemas into driver field definitions.
//! - **Export Session**: one open output dataset accepting features.
//! - **Layer Export**: reprojection, filtering and error collection around a session.
//! - **Symbology**: OGR feature style strings derived from renderers.
//!
//! Format backends implement the traits in `geowriter-core-common`.

pub mod drivers;
pub mod error;
pub mod fields;
pub mod operations;
pub mod symbology;
pub mod types;
pub mod utils;
pub mod writer;

pub use error::{ErrorKind, Result, WriterError};
pub use operations::{ExportOptions, Exporter};
pub use types::ExportReport;
pub use writer::{ExportSession, SessionConfig, StyleContext};
