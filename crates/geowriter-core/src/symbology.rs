//! Cartographic style export.
//!
//! Symbol layers describe themselves as OGR feature style strings
//! (`PEN(...)`, `BRUSH(...)`, `SYMBOL(...)`). During export these strings
//! are attached to each written record, either concatenated per feature or
//! one record per symbol layer, depending on [`SymbologyExport`].
//!
//! This module also provides simple symbol layers and two renderers that
//! cover the common single-symbol and categorized cases.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use geowriter_core_common::{
    DistanceUnit, Feature, FeatureRenderer, Fields, RenderUnit, Symbol, SymbolLayer, Value,
};

/// How feature styles are exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbologyExport {
    /// No styles are written
    #[default]
    NoSymbology,
    /// One record per feature carrying every style fragment joined by `;`
    FeatureSymbology,
    /// One record per symbol layer, each carrying that layer's style.
    ///
    /// Without a renderer the feature is still written once, unstyled.
    SymbolLayerSymbology,
}

impl SymbologyExport {
    /// Returns the name of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SymbologyExport::NoSymbology => "NoSymbology",
            SymbologyExport::FeatureSymbology => "FeatureSymbology",
            SymbologyExport::SymbolLayerSymbology => "SymbolLayerSymbology",
        }
    }
}

impl fmt::Display for SymbologyExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Factor converting symbol sizes to millimetres.
///
/// Millimetre symbols are unchanged. Other symbols on metre-based maps are
/// scaled by `1000 / scale_denominator`.
///
/// # Examples
///
/// ```
/// use geowriter_core::symbology::mm_scale_factor;
/// use geowriter_core_common::{DistanceUnit, RenderUnit};
///
/// assert_eq!(mm_scale_factor(500.0, RenderUnit::MapUnits, DistanceUnit::Meters), 2.0);
/// assert_eq!(mm_scale_factor(500.0, RenderUnit::Millimeters, DistanceUnit::Meters), 1.0);
/// ```
#[must_use]
pub fn mm_scale_factor(scale_denominator: f64, symbol_unit: RenderUnit, map_units: DistanceUnit) -> f64 {
    if symbol_unit == RenderUnit::Millimeters {
        return 1.0;
    }
    if map_units == DistanceUnit::Meters {
        return 1000.0 / scale_denominator;
    }
    1.0
}

/// Factor converting symbol sizes to map units.
///
/// Map-unit symbols are unchanged. Millimetre symbols on metre-based maps
/// are scaled by `scale_denominator / 1000`.
#[must_use]
pub fn map_unit_scale_factor(scale_denominator: f64, symbol_unit: RenderUnit, map_units: DistanceUnit) -> f64 {
    if symbol_unit == RenderUnit::MapUnits {
        return 1.0;
    }
    if symbol_unit == RenderUnit::Millimeters && map_units == DistanceUnit::Meters {
        return scale_denominator / 1000.0;
    }
    1.0
}

/// Formats a size with at most six decimals and no trailing zeros.
fn format_size(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

fn scaled_size(size: f64, unit: RenderUnit, mm_scale: f64, map_unit_scale: f64) -> String {
    match unit {
        RenderUnit::MapUnits => format!("{}g", format_size(size * map_unit_scale)),
        RenderUnit::Pixels => format!("{}px", format_size(size)),
        RenderUnit::Millimeters => format!("{}mm", format_size(size * mm_scale)),
    }
}

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Color {
    /// Creates a colour from its components.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Solid line.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleLineSymbolLayer {
    /// Stroke colour
    pub color: Color,
    /// Stroke width
    pub width: f64,
    /// Unit of `width`
    pub width_unit: RenderUnit,
    /// Render level
    pub rendering_pass: i32,
}

impl SimpleLineSymbolLayer {
    /// Creates a line with a width in millimetres.
    #[must_use]
    pub fn new(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            width_unit: RenderUnit::Millimeters,
            rendering_pass: 0,
        }
    }

    /// Sets the width unit.
    #[must_use]
    pub fn with_width_unit(mut self, unit: RenderUnit) -> Self {
        self.width_unit = unit;
        self
    }

    /// Sets the render level.
    #[must_use]
    pub fn with_rendering_pass(mut self, pass: i32) -> Self {
        self.rendering_pass = pass;
        self
    }
}

fn pen(color: Color, width: f64, unit: RenderUnit, mm_scale: f64, map_unit_scale: f64) -> String {
    format!(
        "PEN(c:{color},w:{})",
        scaled_size(width, unit, mm_scale, map_unit_scale)
    )
}

impl SymbolLayer for SimpleLineSymbolLayer {
    fn ogr_feature_style(&self, mm_scale_factor: f64, map_unit_scale_factor: f64) -> String {
        pen(
            self.color,
            self.width,
            self.width_unit,
            mm_scale_factor,
            map_unit_scale_factor,
        )
    }

    fn rendering_pass(&self) -> i32 {
        self.rendering_pass
    }
}

/// Solid fill with an outline.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleFillSymbolLayer {
    /// Fill colour
    pub fill: Color,
    /// Outline colour
    pub stroke: Color,
    /// Outline width
    pub stroke_width: f64,
    /// Unit of `stroke_width`
    pub stroke_width_unit: RenderUnit,
    /// Render level
    pub rendering_pass: i32,
}

impl SimpleFillSymbolLayer {
    /// Creates a fill with an outline width in millimetres.
    #[must_use]
    pub fn new(fill: Color, stroke: Color, stroke_width: f64) -> Self {
        Self {
            fill,
            stroke,
            stroke_width,
            stroke_width_unit: RenderUnit::Millimeters,
            rendering_pass: 0,
        }
    }

    /// Sets the render level.
    #[must_use]
    pub fn with_rendering_pass(mut self, pass: i32) -> Self {
        self.rendering_pass = pass;
        self
    }
}

impl SymbolLayer for SimpleFillSymbolLayer {
    fn ogr_feature_style(&self, mm_scale_factor: f64, map_unit_scale_factor: f64) -> String {
        format!(
            "BRUSH(fc:{});{}",
            self.fill,
            pen(
                self.stroke,
                self.stroke_width,
                self.stroke_width_unit,
                mm_scale_factor,
                map_unit_scale_factor,
            )
        )
    }

    fn rendering_pass(&self) -> i32 {
        self.rendering_pass
    }
}

/// Marker shapes with an OGR symbol id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerShape {
    /// `+`
    Cross,
    /// `x`
    DiagonalCross,
    /// Filled circle
    #[default]
    Circle,
    /// Filled square
    Square,
    /// Filled triangle
    Triangle,
    /// Filled star
    Star,
}

impl MarkerShape {
    /// OGR symbol number of this shape.
    #[must_use]
    pub const fn ogr_symbol(self) -> u8 {
        match self {
            MarkerShape::Cross => 0,
            MarkerShape::DiagonalCross => 1,
            MarkerShape::Circle => 3,
            MarkerShape::Square => 5,
            MarkerShape::Triangle => 7,
            MarkerShape::Star => 9,
        }
    }
}

/// Point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleMarkerSymbolLayer {
    /// Shape
    pub shape: MarkerShape,
    /// Marker colour
    pub color: Color,
    /// Marker size
    pub size: f64,
    /// Unit of `size`
    pub size_unit: RenderUnit,
    /// Render level
    pub rendering_pass: i32,
}

impl SimpleMarkerSymbolLayer {
    /// Creates a marker with a size in millimetres.
    #[must_use]
    pub fn new(shape: MarkerShape, color: Color, size: f64) -> Self {
        Self {
            shape,
            color,
            size,
            size_unit: RenderUnit::Millimeters,
            rendering_pass: 0,
        }
    }

    /// Sets the size unit.
    #[must_use]
    pub fn with_size_unit(mut self, unit: RenderUnit) -> Self {
        self.size_unit = unit;
        self
    }
}

impl SymbolLayer for SimpleMarkerSymbolLayer {
    fn ogr_feature_style(&self, mm_scale_factor: f64, map_unit_scale_factor: f64) -> String {
        format!(
            "SYMBOL(id:\"ogr-sym-{}\",c:{},s:{})",
            self.shape.ogr_symbol(),
            self.color,
            scaled_size(self.size, self.size_unit, mm_scale_factor, map_unit_scale_factor)
        )
    }

    fn rendering_pass(&self) -> i32 {
        self.rendering_pass
    }
}

/// Draws every feature with one symbol.
pub struct SingleSymbolRenderer {
    symbol: Arc<Symbol>,
    symbol_levels: bool,
}

impl SingleSymbolRenderer {
    /// Creates a renderer drawing every feature with `symbol`.
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol: Arc::new(symbol),
            symbol_levels: false,
        }
    }

    /// Enables drawing by symbol level.
    #[must_use]
    pub fn with_symbol_levels(mut self, enabled: bool) -> Self {
        self.symbol_levels = enabled;
        self
    }
}

impl FeatureRenderer for SingleSymbolRenderer {
    fn symbols(&self) -> Vec<Arc<Symbol>> {
        vec![Arc::clone(&self.symbol)]
    }

    fn symbols_for_feature(&self, _feature: &Feature) -> Vec<Arc<Symbol>> {
        self.symbols()
    }

    fn used_attributes(&self) -> Vec<String> {
        Vec::new()
    }

    fn uses_symbol_levels(&self) -> bool {
        self.symbol_levels
    }
}

/// Draws features with the symbol of the category matching one attribute.
///
/// The attribute is located by name when rendering starts; features whose
/// value matches no category use the fallback symbol, if any.
pub struct CategorizedRenderer {
    attribute: String,
    categories: Vec<(Value, Arc<Symbol>)>,
    fallback: Option<Arc<Symbol>>,
    symbol_levels: bool,
    attribute_index: RwLock<Option<usize>>,
}

impl CategorizedRenderer {
    /// Creates a renderer keyed by `attribute`.
    #[must_use]
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            categories: Vec::new(),
            fallback: None,
            symbol_levels: false,
            attribute_index: RwLock::new(None),
        }
    }

    /// Adds a category.
    #[must_use]
    pub fn with_category(mut self, value: Value, symbol: Symbol) -> Self {
        self.categories.push((value, Arc::new(symbol)));
        self
    }

    /// Sets the symbol for unmatched values.
    #[must_use]
    pub fn with_fallback(mut self, symbol: Symbol) -> Self {
        self.fallback = Some(Arc::new(symbol));
        self
    }

    /// Enables drawing by symbol level.
    #[must_use]
    pub fn with_symbol_levels(mut self, enabled: bool) -> Self {
        self.symbol_levels = enabled;
        self
    }

    fn resolved_index(&self) -> Option<usize> {
        *self
            .attribute_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl FeatureRenderer for CategorizedRenderer {
    fn symbols(&self) -> Vec<Arc<Symbol>> {
        self.categories
            .iter()
            .map(|(_, symbol)| Arc::clone(symbol))
            .chain(self.fallback.iter().cloned())
            .collect()
    }

    fn symbols_for_feature(&self, feature: &Feature) -> Vec<Arc<Symbol>> {
        let value = self
            .resolved_index()
            .and_then(|index| feature.attribute(index));
        let matched = value.and_then(|value| {
            self.categories
                .iter()
                .find(|(category, _)| category == value)
                .map(|(_, symbol)| Arc::clone(symbol))
        });
        matched.or_else(|| self.fallback.clone()).into_iter().collect()
    }

    fn used_attributes(&self) -> Vec<String> {
        vec![self.attribute.clone()]
    }

    fn uses_symbol_levels(&self) -> bool {
        self.symbol_levels
    }

    fn start_render(&self, fields: &Fields) {
        *self
            .attribute_index
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fields.index_of(&self.attribute);
    }

    fn stop_render(&self) {
        *self
            .attribute_index
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
