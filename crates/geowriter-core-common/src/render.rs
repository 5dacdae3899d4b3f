//! Renderer and symbol traits used for style export.
//!
//! A renderer maps features to [`Symbol`]s; each symbol is a stack of
//! [`SymbolLayer`]s that can describe themselves as OGR feature style
//! fragments such as `PEN(c:#ff0000,w:0.26mm)`.

use std::fmt;
use std::sync::Arc;

use crate::feature::{Feature, Fields};

/// Unit in which symbol sizes are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderUnit {
    /// Millimetres on the rendered page
    #[default]
    Millimeters,
    /// Map units of the layer's reference system
    MapUnits,
    /// Screen pixels
    Pixels,
}

/// One stylistic component of a symbol.
pub trait SymbolLayer: Send + Sync + fmt::Debug {
    /// OGR feature style fragment for this layer.
    ///
    /// `mm_scale_factor` converts millimetre sizes, `map_unit_scale_factor`
    /// converts map-unit sizes into the units the output expects.
    fn ogr_feature_style(&self, mm_scale_factor: f64, map_unit_scale_factor: f64) -> String;

    /// Render level of this layer. Levels outside `0..1000` are ignored
    /// when exporting by symbol level.
    fn rendering_pass(&self) -> i32 {
        0
    }
}

/// A cartographic symbol: an identified stack of symbol layers.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Identifier, unique within a renderer
    pub id: String,
    /// Unit of the symbol's sizes
    pub output_unit: RenderUnit,
    /// Symbol layers, bottom first
    pub layers: Vec<Arc<dyn SymbolLayer>>,
}

impl Symbol {
    /// Creates a symbol with no layers.
    #[must_use]
    pub fn new(id: impl Into<String>, output_unit: RenderUnit) -> Self {
        Self {
            id: id.into(),
            output_unit,
            layers: Vec::new(),
        }
    }

    /// Appends a symbol layer.
    #[must_use]
    pub fn with_layer(mut self, layer: Arc<dyn SymbolLayer>) -> Self {
        self.layers.push(layer);
        self
    }
}

/// Maps features to symbols.
pub trait FeatureRenderer: Send + Sync {
    /// Every symbol the renderer may return.
    fn symbols(&self) -> Vec<Arc<Symbol>>;

    /// Symbols used to draw `feature`, possibly none.
    fn symbols_for_feature(&self, feature: &Feature) -> Vec<Arc<Symbol>>;

    /// The primary symbol used to draw `feature`.
    fn symbol_for_feature(&self, feature: &Feature) -> Option<Arc<Symbol>> {
        self.symbols_for_feature(feature).into_iter().next()
    }

    /// Names of the attributes the renderer reads.
    fn used_attributes(&self) -> Vec<String>;

    /// Returns `true` when features are drawn level by level.
    fn uses_symbol_levels(&self) -> bool {
        false
    }

    /// Prepares the renderer for features with schema `fields`.
    fn start_render(&self, _fields: &Fields) {}

    /// Releases per-render state.
    fn stop_render(&self) {}
}
