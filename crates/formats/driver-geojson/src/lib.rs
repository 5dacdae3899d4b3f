//! `GeoJSON` file driver for `geowriter`.
//!
//! [`GeoJsonDriverService`] exposes a single driver named `GeoJSON` that
//! streams committed feature records into a `FeatureCollection` file. The
//! layer creation options `COORDINATE_PRECISION` and `WRITE_BBOX` are
//! honored; everything else is ignored.

pub mod driver;
pub mod writer;

pub use driver::{DRIVER_NAME, GeoJsonDataset, GeoJsonDriver, GeoJsonDriverService};
pub use writer::GeoJsonWriterOptions;
