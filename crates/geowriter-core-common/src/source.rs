//! Feature sources: the layers an export reads from.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::crs::SpatialRef;
use crate::feature::{Feature, Fields, Value};
use crate::geometry::GeometryType;
use crate::render::FeatureRenderer;

/// Data provider backing a layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// File-based OGR data source
    Ogr,
    /// SpatiaLite database
    Spatialite,
    /// Oracle Spatial
    Oracle,
    /// In-memory features
    #[default]
    Memory,
    /// Any other provider, by key
    Other(String),
}

/// Where a layer's features come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    /// Provider kind
    pub provider: ProviderKind,
    /// Backing file, if any
    pub path: Option<PathBuf>,
    /// Provider storage type, e.g. `"ESRI Shapefile"`
    pub storage_type: String,
}

/// Which features and which parts of them to fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureRequest {
    /// Skip geometries
    pub no_geometry: bool,
    /// Attribute indices to fetch; `None` fetches all
    pub attributes: Option<Vec<usize>>,
    /// Feature ids to fetch; `None` fetches all
    pub feature_ids: Option<BTreeSet<i64>>,
}

impl FeatureRequest {
    /// Request for every feature with every attribute.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops geometries from the fetched features.
    #[must_use]
    pub fn with_no_geometry(mut self, no_geometry: bool) -> Self {
        self.no_geometry = no_geometry;
        self
    }

    /// Restricts fetched attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<usize>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Restricts fetched features.
    #[must_use]
    pub fn with_feature_ids(mut self, ids: BTreeSet<i64>) -> Self {
        self.feature_ids = Some(ids);
        self
    }

    /// Returns `true` if `id` passes the id filter.
    #[must_use]
    pub fn accepts(&self, id: i64) -> bool {
        self.feature_ids.as_ref().is_none_or(|ids| ids.contains(&id))
    }
}

/// A vector layer that can be exported.
pub trait VectorLayer {
    /// Layer name.
    fn name(&self) -> &str;

    /// Attribute schema.
    fn fields(&self) -> &Fields;

    /// Geometry subtype of the layer.
    fn geometry_type(&self) -> GeometryType;

    /// Reference system of the layer's geometries.
    fn crs(&self) -> Option<&SpatialRef>;

    /// Provider details.
    fn source(&self) -> SourceInfo;

    /// Iterates the features matching `request`.
    fn features<'a>(&'a self, request: &FeatureRequest) -> Box<dyn Iterator<Item = Feature> + 'a>;

    /// Ids of the currently selected features.
    fn selected_ids(&self) -> BTreeSet<i64> {
        BTreeSet::new()
    }

    /// Renderer used to draw the layer.
    fn renderer(&self) -> Option<Arc<dyn FeatureRenderer>> {
        None
    }

    /// Returns `true` for attribute columns that store geometries opaquely
    /// and must never be exported as attributes.
    fn is_opaque_geometry_field(&self, _index: usize) -> bool {
        false
    }

    /// Minimum and maximum of an attribute, when the provider knows them.
    fn value_range(&self, _index: usize) -> Option<(Value, Value)> {
        None
    }
}

/// A layer whose features live in memory.
///
/// # Examples
///
/// ```
/// use geowriter_core_common::feature::{Feature, Field, FieldType, Value};
/// use geowriter_core_common::geometry::{GeometryKind, GeometryType};
/// use geowriter_core_common::source::{FeatureRequest, MemoryLayer, VectorLayer};
///
/// let layer = MemoryLayer::new("parcels", GeometryType::xy(GeometryKind::Polygon))
///     .with_fields(vec![Field::new("id", FieldType::Int)].into())
///     .with_features(vec![Feature::new(1).with_attributes(vec![Value::Int(7)])]);
///
/// assert_eq!(layer.features(&FeatureRequest::new()).count(), 1);
/// ```
#[derive(Clone)]
pub struct MemoryLayer {
    name: String,
    fields: Fields,
    geometry_type: GeometryType,
    crs: Option<SpatialRef>,
    source: SourceInfo,
    features: Vec<Feature>,
    selection: BTreeSet<i64>,
    renderer: Option<Arc<dyn FeatureRenderer>>,
}

impl MemoryLayer {
    /// Creates an empty layer.
    #[must_use]
    pub fn new(name: impl Into<String>, geometry_type: GeometryType) -> Self {
        Self {
            name: name.into(),
            fields: Fields::new(),
            geometry_type,
            crs: None,
            source: SourceInfo::default(),
            features: Vec::new(),
            selection: BTreeSet::new(),
            renderer: None,
        }
    }

    /// Sets the schema.
    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the reference system.
    #[must_use]
    pub fn with_crs(mut self, crs: SpatialRef) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Overrides the provider details, e.g. to mimic a file-backed layer.
    #[must_use]
    pub fn with_source(mut self, source: SourceInfo) -> Self {
        self.source = source;
        self
    }

    /// Sets the features.
    #[must_use]
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }

    /// Sets the selection.
    #[must_use]
    pub fn with_selection(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.selection = ids.into_iter().collect();
        self
    }

    /// Sets the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn FeatureRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Appends one feature.
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }
}

impl VectorLayer for MemoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    fn crs(&self) -> Option<&SpatialRef> {
        self.crs.as_ref()
    }

    fn source(&self) -> SourceInfo {
        self.source.clone()
    }

    fn features<'a>(&'a self, request: &FeatureRequest) -> Box<dyn Iterator<Item = Feature> + 'a> {
        let request = request.clone();
        let no_geometry = request.no_geometry;
        Box::new(
            self.features
                .iter()
                .filter(move |f| request.accepts(f.id))
                .map(move |f| {
                    let mut feature = f.clone();
                    if no_geometry {
                        feature.geometry = None;
                    }
                    feature
                }),
        )
    }

    fn selected_ids(&self) -> BTreeSet<i64> {
        self.selection.clone()
    }

    fn renderer(&self) -> Option<Arc<dyn FeatureRenderer>> {
        self.renderer.clone()
    }

    fn value_range(&self, index: usize) -> Option<(Value, Value)> {
        let values = self
            .features
            .iter()
            .filter_map(|f| f.attribute(index))
            .filter_map(Value::as_i64);
        let (min, max) = values.fold(None, |acc: Option<(i64, i64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
        Some((Value::Int64(min), Value::Int64(max)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryKind;

    fn layer() -> MemoryLayer {
        MemoryLayer::new("points", GeometryType::xy(GeometryKind::Point)).with_features(vec![
            Feature::new(1).with_attributes(vec![Value::Int64(-3)]),
            Feature::new(2).with_attributes(vec![Value::Int64(12)]),
            Feature::new(3).with_attributes(vec![Value::Null]),
        ])
    }

    #[test]
    fn test_feature_id_filter() {
        let request = FeatureRequest::new().with_feature_ids([1, 3].into_iter().collect());
        let ids: Vec<i64> = layer().features(&request).map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_value_range_skips_nulls() {
        assert_eq!(
            layer().value_range(0),
            Some((Value::Int64(-3), Value::Int64(12)))
        );
        assert_eq!(layer().value_range(4), None);
    }

    #[test]
    fn test_defaults() {
        let layer = layer();
        assert!(layer.selected_ids().is_empty());
        assert!(layer.renderer().is_none());
        assert_eq!(layer.source().provider, ProviderKind::Memory);
    }
}
