//! Layer export: drives an [`ExportSession`] across a feature source.
//!
//! [`Exporter::write_as_vector_format`] resolves the output geometry type and
//! attribute set, opens the session, streams the source features through the
//! optional reprojection and extent filter, and collects per-feature errors.
//! When the renderer draws by symbol level and symbol layers are exported,
//! features are bucketed by symbol first and written level by level.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use geo_types::Rect;
use geowriter_core_common::{
    CoordinateTransform, DistanceUnit, DriverService, Feature, FeatureRenderer, FeatureRequest,
    Field, FieldType, Fields, GeometryType, ProviderKind, Symbol, VectorLayer,
};
use log::{debug, info, warn};

use crate::drivers::DriverRegistry;
use crate::error::{Result, WriterError};
use crate::fields::{FieldValueConverter, SHAPEFILE_DRIVER};
use crate::symbology::{SymbologyExport, map_unit_scale_factor, mm_scale_factor};
use crate::types::ExportReport;
use crate::writer::{ExportSession, SessionConfig, StyleContext};

/// Export stops once more than this many features failed.
pub const MAX_FEATURE_ERRORS: usize = 1000;

/// Render levels outside `0..MAX_RENDER_LEVELS` are ignored.
const MAX_RENDER_LEVELS: i32 = 1000;

/// Options for [`Exporter::write_as_vector_format`].
///
/// # Examples
///
/// ```
/// use geowriter_core::operations::ExportOptions;
/// use geowriter_core::symbology::SymbologyExport;
///
/// let options = ExportOptions::new("GPKG")
///     .with_only_selected(true)
///     .with_symbology(SymbologyExport::FeatureSymbology, 25_000.0);
///
/// assert_eq!(options.driver_name, "GPKG");
/// assert_eq!(options.encoding, "UTF-8");
/// ```
#[derive(Clone)]
pub struct ExportOptions {
    /// Text encoding of the output
    pub encoding: String,
    /// Reprojection applied to every geometry
    pub transform: Option<Arc<dyn CoordinateTransform>>,
    /// Output format name
    pub driver_name: String,
    /// Export only the layer's selected features
    pub only_selected: bool,
    /// `KEY=value` dataset creation options
    pub dataset_options: Vec<String>,
    /// `KEY=value` layer creation options
    pub layer_options: Vec<String>,
    /// Write geometries only
    pub skip_attribute_creation: bool,
    /// Style export mode
    pub symbology_export: SymbologyExport,
    /// Scale denominator used to size exported styles
    pub symbology_scale: f64,
    /// Drop features whose geometry does not intersect this rectangle
    pub filter_extent: Option<Rect<f64>>,
    /// Geometry type to write instead of the layer's own
    pub override_geometry_type: Option<GeometryType>,
    /// Promote the output geometry type to its multi variant
    pub force_multi: bool,
    /// Add an elevation to the overridden geometry type
    pub include_z: bool,
    /// Source attribute indices to export; empty exports all
    pub attributes: Vec<usize>,
    /// Field and value rewriting hook
    pub converter: Option<Arc<dyn FieldValueConverter>>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            encoding: "UTF-8".to_string(),
            transform: None,
            driver_name: SHAPEFILE_DRIVER.to_string(),
            only_selected: false,
            dataset_options: Vec::new(),
            layer_options: Vec::new(),
            skip_attribute_creation: false,
            symbology_export: SymbologyExport::NoSymbology,
            symbology_scale: 1.0,
            filter_extent: None,
            override_geometry_type: None,
            force_multi: false,
            include_z: false,
            attributes: Vec::new(),
            converter: None,
        }
    }
}

impl ExportOptions {
    /// Creates options writing with `driver_name`.
    #[must_use]
    pub fn new(driver_name: impl Into<String>) -> Self {
        Self {
            driver_name: driver_name.into(),
            ..Self::default()
        }
    }

    /// Set the text encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the coordinate transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn CoordinateTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Restrict the export to selected features.
    #[must_use]
    pub fn with_only_selected(mut self, only_selected: bool) -> Self {
        self.only_selected = only_selected;
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

    /// Write geometries only.
    #[must_use]
    pub fn with_skip_attribute_creation(mut self, skip: bool) -> Self {
        self.skip_attribute_creation = skip;
        self
    }

    /// Set the style export mode and scale denominator.
    #[must_use]
    pub fn with_symbology(mut self, mode: SymbologyExport, scale: f64) -> Self {
        self.symbology_export = mode;
        self.symbology_scale = scale;
        self
    }

    /// Set the extent filter.
    #[must_use]
    pub fn with_filter_extent(mut self, extent: Rect<f64>) -> Self {
        self.filter_extent = Some(extent);
        self
    }

    /// Override the output geometry type.
    #[must_use]
    pub fn with_override_geometry_type(mut self, geometry_type: GeometryType) -> Self {
        self.override_geometry_type = Some(geometry_type);
        self
    }

    /// Promote the output geometry type to multi.
    #[must_use]
    pub fn with_force_multi(mut self, force_multi: bool) -> Self {
        self.force_multi = force_multi;
        self
    }

    /// Add an elevation to the overridden geometry type.
    #[must_use]
    pub fn with_include_z(mut self, include_z: bool) -> Self {
        self.include_z = include_z;
        self
    }

    /// Set the exported source attribute indices.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<usize>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set the field value converter.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn FieldValueConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Geometry type written for a source layer of type `layer_type`.
    #[must_use]
    pub fn destination_geometry_type(&self, layer_type: GeometryType) -> GeometryType {
        let mut destination = layer_type;
        if let Some(override_type) = self.override_geometry_type {
            destination = override_type.flat();
            if override_type.has_z() || self.include_z {
                destination = destination.add_z();
            }
        }
        if self.force_multi {
            destination = destination.multi();
        }
        destination
    }
}

/// Writes vector layers through a driver service.
pub struct Exporter {
    service: Arc<dyn DriverService>,
    registry: Arc<DriverRegistry>,
}

impl Exporter {
    /// Creates an exporter using the built-in driver catalog.
    #[must_use]
    pub fn new(service: Arc<dyn DriverService>) -> Self {
        Self::with_registry(service, Arc::new(DriverRegistry::new()))
    }

    /// Creates an exporter using `registry` for format metadata.
    #[must_use]
    pub fn with_registry(service: Arc<dyn DriverService>, registry: Arc<DriverRegistry>) -> Self {
        Self { service, registry }
    }

    /// Driver metadata registry.
    #[must_use]
    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Exports `layer` to `path` in the format named by `options`.
    ///
    /// A single transaction wraps the write loop when the driver supports
    /// one. It is committed even when some features failed.
    ///
    /// # Errors
    ///
    /// * [`WriterError::CreateDataSource`] when `path` is the layer's own file
    /// * any construction error of [`ExportSession`]
    /// * [`WriterError::Projection`] when a geometry cannot be transformed;
    ///   nothing further is written or committed
    /// * [`WriterError::FeatureWriteFailed`] with the collected messages when
    ///   at least one feature could not be written
    pub fn write_as_vector_format(
        &self,
        layer: &dyn VectorLayer,
        path: &Path,
        options: &ExportOptions,
    ) -> Result<ExportReport> {
        info!("Starting export:");
        info!("Layer: {}", layer.name());
        info!("Output: {} (Driver: {})", path.display(), options.driver_name);

        let output_crs = match &options.transform {
            Some(transform) => Some(transform.destination_crs().clone()),
            None => layer.crs().cloned(),
        };
        let map_units = output_crs
            .as_ref()
            .map_or(DistanceUnit::Unknown, |crs| crs.map_units);

        let mut destination = options.destination_geometry_type(layer.geometry_type());

        let renderer = match options.symbology_export {
            SymbologyExport::NoSymbology => None,
            _ => layer.renderer(),
        };
        let attributes = export_attributes(layer, options, renderer.as_deref());

        let source = layer.source();
        if source.provider == ProviderKind::Ogr {
            if let Some(source_path) = &source.path {
                if source_path.exists() && same_file(path, source_path) {
                    return Err(WriterError::CreateDataSource {
                        message: "Cannot overwrite a OGR layer in place".to_string(),
                    });
                }
            }
        }

        let selection = options.only_selected.then(|| layer.selected_ids());

        if source.provider == ProviderKind::Ogr
            && source.storage_type == SHAPEFILE_DRIVER
            && !destination.is_multi()
        {
            let mut request = FeatureRequest::new().with_attributes(Vec::new());
            if let Some(ids) = &selection {
                request = request.with_feature_ids(ids.clone());
            }
            let has_multi = layer.features(&request).any(|feature| {
                feature
                    .geometry
                    .as_ref()
                    .is_some_and(|geometry| geometry.geometry_type().is_multi())
            });
            if has_multi {
                debug!("Shapefile source holds multi-part geometries, writing {}", destination.multi());
                destination = destination.multi();
            }
        }

        let mut fields: Vec<Field> = attributes
            .iter()
            .filter_map(|&index| layer.fields().get(index).cloned())
            .collect();

        if source.provider == ProviderKind::Spatialite {
            for (field, &index) in fields.iter_mut().zip(&attributes) {
                if field.field_type == FieldType::Int64 && fits_in_i32(layer, index) {
                    debug!("Writing 64-bit field {} as 32-bit", field.name);
                    field.field_type = FieldType::Int;
                }
            }
        }

        let mut config = SessionConfig::new(path, options.driver_name.clone())
            .with_encoding(options.encoding.clone())
            .with_fields(fields.into())
            .with_geometry_type(destination)
            .with_dataset_options(options.dataset_options.clone())
            .with_layer_options(options.layer_options.clone())
            .with_symbology_export(options.symbology_export);
        if let Some(crs) = output_crs {
            config = config.with_srs(crs);
        }
        if let Some(converter) = &options.converter {
            config = config.with_converter(Arc::clone(converter));
        }

        let mut session = ExportSession::open(self.service.as_ref(), &self.registry, config)?;
        session.set_symbology_scale_denominator(options.symbology_scale);
        session.reset_map(&attributes, layer.fields().clone());

        let transaction = match session.start_transaction() {
            Ok(()) => true,
            Err(e) => {
                debug!("Writing without transaction: {e}");
                false
            },
        };

        let mut request = FeatureRequest::new()
            .with_no_geometry(layer.geometry_type() == GeometryType::NO_GEOMETRY)
            .with_attributes(attributes.clone());
        if let Some(ids) = selection {
            request = request.with_feature_ids(ids);
        }

        let _render = RenderScope::start(renderer.clone(), layer.fields());
        let mut stream = TransformedFeatures {
            features: layer.features(&request),
            transform: options.transform.as_deref(),
            extent: options.filter_extent.as_ref(),
            filtered: 0,
        };

        let level_renderer = renderer
            .as_ref()
            .filter(|r| options.symbology_export == SymbologyExport::SymbolLayerSymbology && r.uses_symbol_levels());

        let mut log = ErrorLog::default();
        let total = match level_renderer {
            Some(renderer) => {
                write_by_symbol_level(&mut session, &mut stream, &**renderer, map_units, &mut log)?
            },
            None => {
                let context = renderer.as_deref().map(|renderer| StyleContext {
                    renderer,
                    map_units,
                });
                let skip = options.skip_attribute_creation && attributes.is_empty();
                write_features(&mut session, &mut stream, context.as_ref(), skip, &mut log)?
            },
        };

        if transaction {
            if let Err(e) = session.commit_transaction() {
                warn!("Error while committing transaction: {e}");
            }
        }

        let features_filtered = stream.filtered;
        if let Some(message) = log.finish(total) {
            warn!("Export to {} finished with errors", session.output_path().display());
            return Err(WriterError::FeatureWriteFailed { message });
        }

        info!("Export completed successfully");
        Ok(ExportReport {
            output_path: session.output_path().to_path_buf(),
            driver_name: session.driver_name().to_string(),
            geometry_type: session.geometry_type(),
            features_written: total.unwrap_or_default(),
            features_filtered,
        })
    }
}

fn export_attributes(
    layer: &dyn VectorLayer,
    options: &ExportOptions,
    renderer: Option<&dyn FeatureRenderer>,
) -> Vec<usize> {
    let mut attributes = if options.skip_attribute_creation {
        Vec::new()
    } else if options.attributes.is_empty() {
        (0..layer.fields().len())
            .filter(|&index| !layer.is_opaque_geometry_field(index))
            .collect()
    } else {
        options.attributes.clone()
    };

    if let Some(renderer) = renderer {
        for name in renderer.used_attributes() {
            match layer.fields().index_of(&name) {
                Some(index) if !attributes.contains(&index) => attributes.push(index),
                Some(_) => {},
                None => debug!("Renderer attribute {name} not found in layer"),
            }
        }
    }
    attributes
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn fits_in_i32(layer: &dyn VectorLayer, index: usize) -> bool {
    let Some((min, max)) = layer.value_range(index) else {
        return false;
    };
    match (min.as_i64(), max.as_i64()) {
        (Some(min), Some(max)) => {
            min.unsigned_abs().max(max.unsigned_abs()) < u64::from(i32::MAX.unsigned_abs())
        },
        _ => false,
    }
}

/// Calls `stop_render` on drop for a renderer started with `start_render`.
struct RenderScope(Option<Arc<dyn FeatureRenderer>>);

impl RenderScope {
    fn start(renderer: Option<Arc<dyn FeatureRenderer>>, fields: &Fields) -> Self {
        if let Some(renderer) = &renderer {
            renderer.start_render(fields);
        }
        Self(renderer)
    }
}

impl Drop for RenderScope {
    fn drop(&mut self) {
        if let Some(renderer) = &self.0 {
            renderer.stop_render();
        }
    }
}

/// Source features after reprojection and extent filtering.
struct TransformedFeatures<'a> {
    features: Box<dyn Iterator<Item = Feature> + 'a>,
    transform: Option<&'a dyn CoordinateTransform>,
    extent: Option<&'a Rect<f64>>,
    filtered: usize,
}

impl Iterator for TransformedFeatures<'_> {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut feature = self.features.next()?;

            if let (Some(transform), Some(geometry)) = (self.transform, feature.geometry.as_ref()) {
                match transform.transform(geometry) {
                    Ok(transformed) => feature.geometry = Some(transformed),
                    Err(e) => {
                        return Some(Err(WriterError::Projection {
                            message: format!(
                                "Failed to transform a point while drawing a feature with ID '{}'. \
                                 Writing stopped. (Exception: {e})",
                                feature.id
                            ),
                        }));
                    },
                }
            }

            if let (Some(extent), Some(geometry)) = (self.extent, feature.geometry.as_ref()) {
                if !geometry.intersects_rect(extent) {
                    self.filtered += 1;
                    continue;
                }
            }
            return Some(Ok(feature));
        }
    }
}

/// Collected per-feature error messages.
#[derive(Debug, Default)]
struct ErrorLog {
    message: String,
    errors: usize,
    stopped: bool,
}

impl ErrorLog {
    /// Records one failure. Returns `true` once the export should stop.
    fn record(&mut self, error: &WriterError) -> bool {
        if self.message.is_empty() {
            self.message.push_str("Feature write errors:");
        }
        self.message.push('\n');
        self.message.push_str(error.message());
        self.errors += 1;

        if self.errors > MAX_FEATURE_ERRORS {
            self.message.push_str(&format!("\nStopping after {} errors", self.errors));
            self.stopped = true;
        }
        self.stopped
    }

    /// Summary for the caller, `None` when nothing failed.
    ///
    /// `total` is the number of attempted features, `None` when the export
    /// was cut short.
    fn finish(mut self, total: Option<usize>) -> Option<String> {
        if self.errors == 0 {
            return None;
        }
        if let Some(total) = total.filter(|n| *n > 0) {
            self.message.push_str(&format!(
                "\nOnly {} of {total} features written.",
                total.saturating_sub(self.errors)
            ));
        }
        Some(self.message)
    }
}

fn write_features(
    session: &mut ExportSession,
    stream: &mut TransformedFeatures<'_>,
    style: Option<&StyleContext<'_>>,
    skip_attributes: bool,
    log: &mut ErrorLog,
) -> Result<Option<usize>> {
    let mut total = 0;
    for feature in stream {
        let mut feature = feature?;
        if skip_attributes {
            feature.clear_attributes();
        }
        if let Err(e) = session.add_feature(&feature, style) {
            if log.record(&e) {
                return Ok(None);
            }
        }
        total += 1;
    }
    Ok(Some(total))
}

fn write_by_symbol_level(
    session: &mut ExportSession,
    stream: &mut TransformedFeatures<'_>,
    renderer: &dyn FeatureRenderer,
    map_units: DistanceUnit,
    log: &mut ErrorLog,
) -> Result<Option<usize>> {
    let mut buckets: BTreeMap<String, Vec<Feature>> = BTreeMap::new();
    for feature in stream {
        let feature = feature?;
        if let Some(symbol) = renderer.symbol_for_feature(&feature) {
            buckets.entry(symbol.id.clone()).or_default().push(feature);
        }
    }

    let mut levels: Vec<Vec<(Arc<Symbol>, usize)>> = Vec::new();
    for symbol in renderer.symbols() {
        for (index, layer) in symbol.layers.iter().enumerate() {
            let pass = layer.rendering_pass();
            let Ok(level) = usize::try_from(pass) else {
                continue;
            };
            if pass >= MAX_RENDER_LEVELS {
                continue;
            }
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push((Arc::clone(&symbol), index));
        }
    }

    let scale = session.symbology_scale_denominator();
    let mut total = 0;
    for (symbol, index) in levels.iter().flatten() {
        let Some(features) = buckets.get(&symbol.id) else {
            debug!("No features drawn with symbol {}", symbol.id);
            continue;
        };
        let mm = mm_scale_factor(scale, symbol.output_unit, map_units);
        let mu = map_unit_scale_factor(scale, symbol.output_unit, map_units);
        let style = symbol.layers[*index].ogr_feature_style(mm, mu);

        for feature in features {
            total += 1;
            if let Err(e) = session.add_feature_with_style(feature, &style) {
                if log.record(&e) {
                    return Ok(None);
                }
            }
        }
    }
    Ok(Some(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geowriter_core_common::GeometryKind;

    #[test]
    fn test_destination_geometry_type() {
        let polygon = GeometryType::xy(GeometryKind::Polygon);
        let options = ExportOptions::default();
        assert_eq!(options.destination_geometry_type(polygon), polygon);

        let multi = ExportOptions::default().with_force_multi(true);
        assert_eq!(
            multi.destination_geometry_type(polygon),
            GeometryType::xy(GeometryKind::MultiPolygon)
        );

        let line_z = ExportOptions::default()
            .with_override_geometry_type(GeometryType::xy(GeometryKind::LineString))
            .with_include_z(true);
        assert_eq!(
            line_z.destination_geometry_type(polygon),
            GeometryType::xy(GeometryKind::LineString).add_z()
        );

        let include_z_only = ExportOptions::default().with_include_z(true);
        assert_eq!(include_z_only.destination_geometry_type(polygon), polygon);
    }

    #[test]
    fn test_error_log_summary() {
        let error = WriterError::FeatureWriteFailed {
            message: "boom".to_string(),
        };
        let mut log = ErrorLog::default();
        assert!(!log.record(&error));
        assert!(!log.record(&error));
        assert_eq!(
            log.finish(Some(5)).unwrap(),
            "Feature write errors:\nboom\nboom\nOnly 3 of 5 features written."
        );

        assert!(ErrorLog::default().finish(Some(4)).is_none());
    }

    #[test]
    fn test_error_log_cutoff() {
        let error = WriterError::FeatureWriteFailed {
            message: "boom".to_string(),
        };
        let mut log = ErrorLog::default();
        for _ in 0..MAX_FEATURE_ERRORS {
            assert!(!log.record(&error));
        }
        assert!(log.record(&error));
        let message = log.finish(None).unwrap();
        assert!(message.ends_with("\nStopping after 1001 errors"));
        assert!(!message.contains("Only"));
    }
}
