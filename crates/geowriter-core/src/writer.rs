//! Export session: one open output dataset with one layer.
//!
//! An [`ExportSession`] resolves the driver, prepares the output path,
//! creates the dataset, the layer and its fields, and then converts source
//! features into driver records one at a time. Construction never panics and
//! never returns early: any failure leaves the session in a failed state that
//! can be queried with [`ExportSession::error_kind`] and
//! [`ExportSession::error_message`]. Use [`ExportSession::open`] to get a
//! `Result` instead.
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//!
//! use geowriter_core::drivers::DriverRegistry;
//! use geowriter_core::error::ErrorKind;
//! use geowriter_core::writer::{ExportSession, SessionConfig};
//! use geowriter_core_common::{
//!     Dataset, Driver, DriverError, DriverService, GeometryKind, GeometryType,
//! };
//! use std::sync::Arc;
//!
//! struct NoDrivers;
//!
//! impl DriverService for NoDrivers {
//!     fn find_driver(&self, name: &str) -> Result<Arc<dyn Driver>, DriverError> {
//!         Err(DriverError::NotFound { name: name.to_string() })
//!     }
//!
//!     fn driver_names(&self) -> Vec<String> {
//!         Vec::new()
//!     }
//! }
//!
//! let config = SessionConfig::new("/tmp/out.gpkg", "GPKG")
//!     .with_geometry_type(GeometryType::xy(GeometryKind::Point));
//! let session = ExportSession::create(&NoDrivers, &DriverRegistry::new(), config);
//!
//! assert_eq!(session.error_kind(), ErrorKind::DriverNotFound);
//! assert!(session.error_message().starts_with("OGR driver for 'GPKG' not found"));
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, Timelike};
use encoding_rs::{Encoding, UTF_8};
use geowriter_core_common::{
    Dataset, DateTimeParts, Dimensions, DistanceUnit, DriverError, DriverService, Feature,
    FeatureRenderer, FieldValue, Fields, Geometry, GeometryKind, GeometryType, LayerId,
    OutputFeature, OutputGeometry, SpatialRef, Value,
};
use log::{debug, info, warn};

use crate::drivers::DriverRegistry;
use crate::error::{ErrorKind, Result, WriterError};
use crate::fields::{FieldValueConverter, SHAPEFILE_DRIVER, SQLITE_DRIVER, create_fields};
use crate::symbology::{SymbologyExport, map_unit_scale_factor, mm_scale_factor};
use crate::utils::{
    SHAPEFILE_SUFFIXES, append_extension, convert_codec_name_for_encoding_option, encode_text,
    format_shapefile_datetime, format_shapefile_time, has_extension, layer_name_for, resolve_codec,
};

/// Settings for opening an [`ExportSession`].
#[derive(Clone)]
pub struct SessionConfig {
    /// Destination path; an extension is appended when missing
    pub path: PathBuf,
    /// Requested text encoding
    pub encoding: String,
    /// Schema of the exported features
    pub fields: Fields,
    /// Geometry type of the output layer
    pub geometry_type: GeometryType,
    /// Spatial reference of the output layer
    pub srs: Option<SpatialRef>,
    /// Format name, a driver name or one of the `MapInfo MIF`,
    /// `SpatiaLite` and `DBF file` aliases
    pub driver_name: String,
    /// `KEY=value` dataset creation options
    pub dataset_options: Vec<String>,
    /// `KEY=value` layer creation options
    pub layer_options: Vec<String>,
    /// Optional field and value rewriting hook
    pub converter: Option<Arc<dyn FieldValueConverter>>,
    /// Style export mode
    pub symbology_export: SymbologyExport,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("path", &self.path)
            .field("encoding", &self.encoding)
            .field("fields", &self.fields)
            .field("geometry_type", &self.geometry_type)
            .field("srs", &self.srs)
            .field("driver_name", &self.driver_name)
            .field("dataset_options", &self.dataset_options)
            .field("layer_options", &self.layer_options)
            .field("converter", &self.converter.is_some())
            .field("symbology_export", &self.symbology_export)
            .finish()
    }
}

impl SessionConfig {
    /// Creates a config for a point-less, attribute-less layer in UTF-8.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, driver_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            encoding: "UTF-8".to_string(),
            fields: Fields::new(),
            geometry_type: GeometryType::NO_GEOMETRY,
            srs: None,
            driver_name: driver_name.into(),
            dataset_options: Vec::new(),
            layer_options: Vec::new(),
            converter: None,
            symbology_export: SymbologyExport::NoSymbology,
        }
    }

    /// Set the text encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the exported schema.
    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Set the output geometry type.
    #[must_use]
    pub fn with_geometry_type(mut self, geometry_type: GeometryType) -> Self {
        self.geometry_type = geometry_type;
        self
    }

    /// Set the spatial reference.
    #[must_use]
    pub fn with_srs(mut self, srs: SpatialRef) -> Self {
        self.srs = Some(srs);
        self
    }

    /// Set the dataset creation options.
    #[must_use]
    pub fn with_dataset_options(mut self, options: Vec<String>) -> Self {
        self.dataset_options = options;
        self
    }

    /// Set the layer creation options.
    #[must_use]
    pub fn with_layer_options(mut self, options: Vec<String>) -> Self {
        self.layer_options = options;
        self
    }

    /// Set the field value converter.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn FieldValueConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Set the style export mode.
    #[must_use]
    pub fn with_symbology_export(mut self, mode: SymbologyExport) -> Self {
        self.symbology_export = mode;
        self
    }
}

/// Renderer and map units used to derive feature styles.
#[derive(Clone, Copy)]
pub struct StyleContext<'a> {
    /// Renderer mapping features to symbols
    pub renderer: &'a dyn FeatureRenderer,
    /// Units of the output reference system
    pub map_units: DistanceUnit,
}

#[derive(Debug)]
enum SessionState {
    Ready,
    Failed(WriterError),
}

/// Closes the wrapped dataset when dropped.
struct DatasetHandle(Box<dyn Dataset>);

impl Deref for DatasetHandle {
    type Target = dyn Dataset;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for DatasetHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for DatasetHandle {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            warn!("Closing output dataset failed: {e}");
        }
    }
}

/// An open output layer accepting features.
pub struct ExportSession {
    state: SessionState,
    last_error: Option<WriterError>,
    dataset: Option<DatasetHandle>,
    layer: Option<LayerId>,
    driver_name: String,
    output_path: PathBuf,
    codec: &'static Encoding,
    fields: Fields,
    field_map: BTreeMap<usize, usize>,
    geometry_type: GeometryType,
    converter: Option<Arc<dyn FieldValueConverter>>,
    symbology_export: SymbologyExport,
    symbology_scale: f64,
}

impl fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportSession")
            .field("state", &self.state)
            .field("driver_name", &self.driver_name)
            .field("output_path", &self.output_path)
            .field("codec", &self.codec.name())
            .field("field_map", &self.field_map)
            .field("geometry_type", &self.geometry_type)
            .field("symbology_export", &self.symbology_export)
            .finish_non_exhaustive()
    }
}

impl ExportSession {
    /// Opens the output described by `config`.
    ///
    /// Failures are recorded in the returned session; check
    /// [`ExportSession::error_kind`] before adding features.
    #[must_use]
    pub fn create(service: &dyn DriverService, registry: &DriverRegistry, config: SessionConfig) -> Self {
        let mut session = Self {
            state: SessionState::Ready,
            last_error: None,
            dataset: None,
            layer: None,
            driver_name: config.driver_name.clone(),
            output_path: config.path.clone(),
            codec: UTF_8,
            fields: config.fields.clone(),
            field_map: BTreeMap::new(),
            geometry_type: config.geometry_type,
            converter: config.converter.clone(),
            symbology_export: config.symbology_export,
            symbology_scale: 1.0,
        };

        if let Err(error) = session.init(service, registry, config) {
            warn!("Opening {} failed: {error}", session.output_path.display());
            session.dataset = None;
            session.state = SessionState::Failed(error);
        }
        session
    }

    /// Opens the output described by `config`.
    ///
    /// # Errors
    ///
    /// Returns the construction error; see [`ExportSession::create`].
    pub fn open(service: &dyn DriverService, registry: &DriverRegistry, config: SessionConfig) -> Result<Self> {
        let mut session = Self::create(service, registry, config);
        match std::mem::replace(&mut session.state, SessionState::Ready) {
            SessionState::Ready => Ok(session),
            SessionState::Failed(error) => Err(error),
        }
    }

    fn init(&mut self, service: &dyn DriverService, registry: &DriverRegistry, config: SessionConfig) -> Result<()> {
        let SessionConfig {
            path,
            mut encoding,
            geometry_type,
            mut srs,
            driver_name: format,
            mut dataset_options,
            mut layer_options,
            ..
        } = config;

        if path.as_os_str().is_empty() {
            return Err(WriterError::CreateDataSource {
                message: "Empty filename given".to_string(),
            });
        }

        let driver_name = match format.as_str() {
            "MapInfo MIF" => "MapInfo File".to_string(),
            "SpatiaLite" => {
                push_unique(&mut dataset_options, "SPATIALITE=YES");
                SQLITE_DRIVER.to_string()
            },
            "DBF file" => {
                push_unique(&mut layer_options, "SHPT=NULL");
                srs = None;
                SHAPEFILE_DRIVER.to_string()
            },
            _ => format.clone(),
        };
        self.driver_name.clone_from(&driver_name);

        let driver = service
            .find_driver(&driver_name)
            .map_err(|e| WriterError::DriverNotFound {
                message: format!("OGR driver for '{format}' not found (OGR error: {e})"),
            })?;

        let metadata = registry.lookup(&format);

        let mut path = path;
        if driver_name == SHAPEFILE_DRIVER {
            if !layer_options
                .iter()
                .any(|option| option.to_ascii_uppercase().contains("ENCODING="))
            {
                layer_options.push(format!(
                    "ENCODING={}",
                    convert_codec_name_for_encoding_option(&encoding)
                ));
            }

            if format == SHAPEFILE_DRIVER && !has_extension(&path, "shp") {
                path = append_extension(&path, "shp");
            } else if format == "DBF file" && !has_extension(&path, "dbf") {
                path = append_extension(&path, "dbf");
            }

            delete_shapefile(&path);
        } else {
            if let Some(metadata) = metadata {
                let extensions: Vec<&str> = metadata.ext.split_whitespace().collect();
                if let Some(first) = extensions.first() {
                    if !extensions.iter().any(|ext| has_extension(&path, ext)) {
                        path = append_extension(&path, first);
                    }
                }
            }
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    debug!("Removing {} failed: {e}", path.display());
                }
            }
        }
        self.output_path.clone_from(&path);

        if let Some(compulsory) = metadata.and_then(|m| m.compulsory_encoding.as_deref()) {
            if !encoding.eq_ignore_ascii_case(compulsory) {
                debug!("Forced {compulsory} encoding for {format}");
                encoding = compulsory.to_string();
            }
        }

        let dataset = driver
            .create_dataset(&path, &dataset_options)
            .map_err(|e| WriterError::CreateDataSource {
                message: format!("creation of data source failed (OGR error:{e})"),
            })?;
        let dataset = self.dataset.insert(DatasetHandle(dataset));
        debug!("Created data source {}", path.display());

        let (codec, known) = resolve_codec(&encoding);
        if !known {
            debug!("No codec found for {encoding}, using {}", codec.name());
        }
        self.codec = codec;

        let srs = srs.filter(SpatialRef::is_valid);
        let layer_name = layer_name_for(&path);
        if let Some(pos) = layer_options.iter().position(|o| o == "FEATURE_DATASET=") {
            layer_options.remove(pos);
        }

        let layer = dataset
            .create_layer(&layer_name, srs.as_ref(), geometry_type.driver_type(), &layer_options)
            .map_err(|e| WriterError::CreateLayer {
                message: format!("creation of layer failed (OGR error:{e})"),
            })?;
        self.layer = Some(layer);
        debug!("Created layer {layer_name}");

        if let Some(srs) = &srs {
            if driver_name == SHAPEFILE_DRIVER {
                let qpj = path.with_extension("qpj");
                if let Err(e) = fs::write(&qpj, format!("{}\n", srs.wkt)) {
                    debug!("Couldn't write {}: {e}", qpj.display());
                }
            }
        }

        self.field_map = create_fields(
            &mut **dataset,
            layer,
            driver.as_ref(),
            &self.fields,
            self.converter.as_deref(),
        )?;
        Ok(())
    }

    /// Kind of the construction error, or of the last feature error;
    /// [`ErrorKind::None`] when neither occurred.
    #[must_use]
    pub fn error_kind(&self) -> ErrorKind {
        self.current_error().map_or(ErrorKind::None, WriterError::kind)
    }

    /// Message matching [`ExportSession::error_kind`]; empty without error.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.current_error()
            .map(|e| e.message().to_string())
            .unwrap_or_default()
    }

    fn current_error(&self) -> Option<&WriterError> {
        match &self.state {
            SessionState::Failed(error) => Some(error),
            SessionState::Ready => self.last_error.as_ref(),
        }
    }

    /// Path of the created dataset, including any appended extension.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Driver the output is written with, after alias resolution.
    #[must_use]
    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// Geometry type of the output layer.
    #[must_use]
    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    /// Mapping from input attribute index to output field index.
    #[must_use]
    pub fn field_map(&self) -> &BTreeMap<usize, usize> {
        &self.field_map
    }

    /// Style export mode.
    #[must_use]
    pub fn symbology_export(&self) -> SymbologyExport {
        self.symbology_export
    }

    /// Scale denominator used to size exported styles.
    #[must_use]
    pub fn symbology_scale_denominator(&self) -> f64 {
        self.symbology_scale
    }

    /// Sets the scale denominator used to size exported styles.
    pub fn set_symbology_scale_denominator(&mut self, denominator: f64) {
        self.symbology_scale = denominator;
    }

    /// Remaps the i-th exported attribute to source index `attributes[i]`.
    ///
    /// Positions without an output field are dropped. `source_fields`
    /// replaces the session schema so that diagnostics name source fields.
    pub fn reset_map(&mut self, attributes: &[usize], source_fields: Fields) {
        let previous = std::mem::take(&mut self.field_map);
        for (position, source_index) in attributes.iter().enumerate() {
            if let Some(output_index) = previous.get(&position) {
                self.field_map.insert(*source_index, *output_index);
            }
        }
        self.fields = source_fields;
    }

    /// Opens a transaction on the output layer.
    ///
    /// # Errors
    ///
    /// Returns the driver error when transactions are unavailable.
    pub fn start_transaction(&mut self) -> std::result::Result<(), DriverError> {
        let (dataset, layer) = self.output_for_transaction()?;
        dataset.start_transaction(layer)
    }

    /// Commits the transaction opened by [`ExportSession::start_transaction`].
    ///
    /// # Errors
    ///
    /// Returns the driver error when the commit fails.
    pub fn commit_transaction(&mut self) -> std::result::Result<(), DriverError> {
        let (dataset, layer) = self.output_for_transaction()?;
        dataset.commit_transaction(layer)
    }

    fn output_for_transaction(&mut self) -> std::result::Result<(&mut DatasetHandle, LayerId), DriverError> {
        match (self.dataset.as_mut(), self.layer) {
            (Some(dataset), Some(layer)) => Ok((dataset, layer)),
            _ => Err(DriverError::failed("no output layer")),
        }
    }

    /// Writes one feature.
    ///
    /// With a style context and feature symbology, the record carries every
    /// style fragment of the feature's symbols joined with `;`. With
    /// symbol-layer symbology, one record is written per symbol layer.
    ///
    /// # Errors
    ///
    /// Returns the construction error of a failed session, or
    /// [`WriterError::FeatureWriteFailed`] when the feature cannot be
    /// converted or the driver rejects it.
    pub fn add_feature(&mut self, feature: &Feature, style: Option<&StyleContext<'_>>) -> Result<()> {
        self.ensure_ready()?;
        let mut record = self.track(self.build_record(feature))?;

        match (self.symbology_export, style) {
            (SymbologyExport::FeatureSymbology, Some(context)) => {
                let style = self.feature_style(feature, context);
                if !style.is_empty() {
                    record.style = Some(style);
                }
                self.write_record(record)
            },
            (SymbologyExport::SymbolLayerSymbology, Some(context)) => {
                for symbol in context.renderer.symbols_for_feature(feature) {
                    let mm = mm_scale_factor(self.symbology_scale, symbol.output_unit, context.map_units);
                    let mu =
                        map_unit_scale_factor(self.symbology_scale, symbol.output_unit, context.map_units);
                    for layer in &symbol.layers {
                        let mut copy = record.clone();
                        copy.style = Some(layer.ogr_feature_style(mm, mu));
                        self.write_record(copy)?;
                    }
                }
                Ok(())
            },
            _ => self.write_record(record),
        }
    }

    /// Writes one feature carrying `style`.
    ///
    /// The record is built even for an empty style, so conversion errors are
    /// reported, but nothing is written in that case.
    ///
    /// # Errors
    ///
    /// Same as [`ExportSession::add_feature`].
    pub fn add_feature_with_style(&mut self, feature: &Feature, style: &str) -> Result<()> {
        self.ensure_ready()?;
        let mut record = self.track(self.build_record(feature))?;
        if style.is_empty() {
            return Ok(());
        }
        record.style = Some(style.to_string());
        self.write_record(record)
    }

    fn ensure_ready(&self) -> Result<()> {
        match &self.state {
            SessionState::Ready => Ok(()),
            SessionState::Failed(error) => Err(error.clone()),
        }
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            info!("{error}");
            self.last_error = Some(error.clone());
        }
        result
    }

    fn feature_style(&self, feature: &Feature, context: &StyleContext<'_>) -> String {
        let mut fragments = Vec::new();
        for symbol in context.renderer.symbols_for_feature(feature) {
            let mm = mm_scale_factor(self.symbology_scale, symbol.output_unit, context.map_units);
            let mu = map_unit_scale_factor(self.symbology_scale, symbol.output_unit, context.map_units);
            fragments.extend(symbol.layers.iter().map(|layer| layer.ogr_feature_style(mm, mu)));
        }
        fragments.join(";")
    }

    fn write_record(&mut self, record: OutputFeature) -> Result<()> {
        let result = match (self.dataset.as_mut(), self.layer) {
            (Some(dataset), Some(layer)) => {
                dataset
                    .commit_feature(layer, record)
                    .map_err(|e| WriterError::FeatureWriteFailed {
                        message: format!("Feature creation error (OGR error: {e})"),
                    })
            },
            _ => Err(missing_layer()),
        };
        self.track(result)
    }

    fn build_record(&self, feature: &Feature) -> Result<OutputFeature> {
        let mut record = OutputFeature::new();

        if feature.id > i64::from(i32::MAX) {
            debug!("Feature id {} too large", feature.id);
            record.fid = Some(feature.id);
        }

        for (&input, &output) in &self.field_map {
            let Some(value) = feature.attribute(input).filter(|v| !v.is_null()) else {
                continue;
            };
            let value = match &self.converter {
                Some(converter) => Cow::Owned(converter.convert(input, value)),
                None => Cow::Borrowed(value),
            };
            if let Some(field_value) = self.field_value(input, output, &value)? {
                record.set_field(output, field_value);
            }
        }

        if self.geometry_type.kind != GeometryKind::NoGeometry {
            record.geometry = Some(self.output_geometry(feature.geometry.as_ref())?);
        }
        Ok(record)
    }

    fn field_value(&self, input: usize, output: usize, value: &Value) -> Result<Option<FieldValue>> {
        let shapefile = self.driver_name == SHAPEFILE_DRIVER;
        let field_value = match value {
            Value::Null => return Ok(None),
            Value::Int(v) => FieldValue::Integer(*v),
            Value::Int64(v) => FieldValue::Integer64(*v),
            Value::Double(v) => FieldValue::Real(*v),
            Value::String(v) => FieldValue::String(encode_text(self.codec, v)),
            Value::Date(date) => FieldValue::DateTime(DateTimeParts {
                year: date.year(),
                month: date.month(),
                day: date.day(),
                ..DateTimeParts::default()
            }),
            Value::DateTime(datetime) if shapefile => {
                FieldValue::String(encode_text(self.codec, &format_shapefile_datetime(datetime)))
            },
            Value::DateTime(datetime) => FieldValue::DateTime(DateTimeParts {
                year: datetime.year(),
                month: datetime.month(),
                day: datetime.day(),
                hour: datetime.hour(),
                minute: datetime.minute(),
                second: datetime.second(),
            }),
            Value::Time(time) if shapefile => {
                FieldValue::String(encode_text(self.codec, &format_shapefile_time(time)))
            },
            Value::Time(time) => FieldValue::DateTime(DateTimeParts {
                hour: time.hour(),
                minute: time.minute(),
                second: time.second(),
                ..DateTimeParts::default()
            }),
            Value::Bool(_) | Value::Binary(_) => {
                let name = self.fields.get(input).map_or("", |f| f.name.as_str());
                return Err(WriterError::FeatureWriteFailed {
                    message: format!(
                        "Invalid variant type for field {name}[{output}]: received {value} with type {}",
                        value.type_name()
                    ),
                });
            },
        };
        Ok(Some(field_value))
    }

    fn output_geometry(&self, geometry: Option<&Geometry>) -> Result<OutputGeometry> {
        let Some(geometry) = geometry else {
            return Ok(OutputGeometry {
                geometry_type: self.geometry_type.driver_type(),
                wkb: Geometry::empty(self.geometry_type).into_wkb(),
            });
        };

        let session_type = self.geometry_type;
        let mut geometry = Cow::Borrowed(geometry);
        let flat = geometry.geometry_type().flat();
        if flat != session_type.flat() && flat == session_type.single().flat() {
            geometry = Cow::Owned(geometry.to_multi());
        }

        let feature_type = geometry.geometry_type();
        let container = if feature_type == session_type {
            session_type.driver_type()
        } else if session_type.is_25d()
            && feature_type.dimensions == Dimensions::Xyz
            && feature_type.kind.has_25d_variant()
        {
            feature_type.to_25d()
        } else {
            feature_type.driver_type()
        };

        let dataset = self.dataset.as_ref().ok_or_else(missing_layer)?;
        dataset
            .import_geometry(container, geometry.wkb())
            .map_err(|e| WriterError::FeatureWriteFailed {
                message: format!("Feature geometry not imported (OGR error: {e})"),
            })
    }
}

fn missing_layer() -> WriterError {
    WriterError::InvalidLayer {
        message: "no output layer".to_string(),
    }
}

fn push_unique(options: &mut Vec<String>, option: &str) {
    if !options.iter().any(|o| o == option) {
        options.push(option.to_string());
    }
}

/// Deletes the shapefile at `path` together with its sidecar files.
///
/// Returns `false` if any existing file could not be removed.
pub fn delete_shapefile(path: &Path) -> bool {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = layer_name_for(path);

    let mut ok = true;
    for suffix in SHAPEFILE_SUFFIXES {
        let file = dir.join(format!("{stem}.{suffix}"));
        if !file.exists() {
            continue;
        }
        if let Err(e) = fs::remove_file(&file) {
            debug!("Removing file {} failed: {e}", file.display());
            ok = false;
        }
    }
    ok
}
