//! `GeoJSON` driver service and streaming dataset.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geowriter_core_common::{
    Dataset, Driver, DriverError, DriverService, FieldDefinition, Geometry, GeometryType, LayerId,
    OutputFeature, OutputFieldType, OutputGeometry, SpatialRef,
};
use log::{debug, warn};

use crate::writer::{GeoJsonWriterOptions, crs_member, record_to_feature};

/// Name the driver is registered under.
pub const DRIVER_NAME: &str = "GeoJSON";

/// Driver service providing the `GeoJSON` file driver.
///
/// # Examples
///
/// ```
/// use geowriter_core_common::DriverService;
/// use geowriter_driver_geojson::GeoJsonDriverService;
///
/// let service = GeoJsonDriverService::new();
/// assert_eq!(service.driver_names(), vec!["GeoJSON".to_string()]);
/// assert!(service.find_driver("CSV").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct GeoJsonDriverService {
    driver: Arc<GeoJsonDriver>,
}

impl GeoJsonDriverService {
    /// Creates the service.
    #[must_use]
    pub fn new() -> Self {
        Self {
            driver: Arc::new(GeoJsonDriver),
        }
    }
}

impl Default for GeoJsonDriverService {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverService for GeoJsonDriverService {
    fn find_driver(&self, name: &str) -> Result<Arc<dyn Driver>, DriverError> {
        if name == DRIVER_NAME {
            Ok(Arc::clone(&self.driver) as Arc<dyn Driver>)
        } else {
            Err(DriverError::NotFound {
                name: name.to_string(),
            })
        }
    }

    fn driver_names(&self) -> Vec<String> {
        vec![DRIVER_NAME.to_string()]
    }
}

/// Writes one `FeatureCollection` per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonDriver;

impl Driver for GeoJsonDriver {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn creation_field_types(&self) -> &[OutputFieldType] {
        &OutputFieldType::ALL
    }

    fn create_dataset(&self, path: &Path, options: &[String]) -> Result<Box<dyn Dataset>, DriverError> {
        if !options.is_empty() {
            debug!("Ignoring GeoJSON dataset options {options:?}");
        }
        let file = File::create(path).map_err(|e| DriverError::io(path, e))?;
        debug!("Created GeoJSON dataset {}", path.display());
        Ok(Box::new(GeoJsonDataset {
            path: path.to_path_buf(),
            out: Some(BufWriter::new(file)),
            layer: None,
        }))
    }

    fn delete_dataset(&self, path: &Path) -> Result<(), DriverError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DriverError::io(path, e)),
        }
    }
}

struct LayerState {
    fields: Vec<FieldDefinition>,
    options: GeoJsonWriterOptions,
    written: usize,
}

/// An open `GeoJSON` file. Features are streamed as they are committed.
pub struct GeoJsonDataset {
    path: PathBuf,
    out: Option<BufWriter<File>>,
    layer: Option<LayerState>,
}

impl GeoJsonDataset {
    fn writer(&mut self) -> Result<&mut BufWriter<File>, DriverError> {
        self.out
            .as_mut()
            .ok_or_else(|| DriverError::failed(format!("{} is closed", self.path.display())))
    }

    fn write_raw(&mut self, text: &str) -> Result<(), DriverError> {
        let path = self.path.clone();
        self.writer()?
            .write_all(text.as_bytes())
            .map_err(|e| DriverError::io(path, e))
    }

    fn layer(&self, layer: LayerId) -> Result<&LayerState, DriverError> {
        match &self.layer {
            Some(state) if layer == LayerId(0) => Ok(state),
            _ => Err(DriverError::failed(format!("no layer {}", layer.0))),
        }
    }

    fn layer_mut(&mut self, layer: LayerId) -> Result<&mut LayerState, DriverError> {
        match &mut self.layer {
            Some(state) if layer == LayerId(0) => Ok(state),
            _ => Err(DriverError::failed(format!("no layer {}", layer.0))),
        }
    }

    fn unsupported(operation: &str) -> DriverError {
        DriverError::Unsupported {
            driver: DRIVER_NAME.to_string(),
            operation: operation.to_string(),
        }
    }
}

impl Dataset for GeoJsonDataset {
    fn create_layer(
        &mut self,
        name: &str,
        srs: Option<&SpatialRef>,
        geometry_type: GeometryType,
        options: &[String],
    ) -> Result<LayerId, DriverError> {
        if self.layer.is_some() {
            return Err(Self::unsupported("creating more than one layer"));
        }
        let parsed = GeoJsonWriterOptions::from_layer_options(options)?;

        let name_json = serde_json::to_string(name).map_err(|e| DriverError::failed(e.to_string()))?;
        let mut header = format!("{{\n\"type\": \"FeatureCollection\",\n\"name\": {name_json},\n");
        if let Some(crs) = srs.and_then(crs_member) {
            header.push_str(&format!("\"crs\": {crs},\n"));
        }
        header.push_str("\"features\": [\n");
        self.write_raw(&header)?;

        debug!("Created GeoJSON layer '{name}' of type {geometry_type}");
        self.layer = Some(LayerState {
            fields: Vec::new(),
            options: parsed,
            written: 0,
        });
        Ok(LayerId(0))
    }

    fn create_field(&mut self, layer: LayerId, definition: &FieldDefinition) -> Result<(), DriverError> {
        let state = self.layer_mut(layer)?;
        if state.written > 0 {
            return Err(DriverError::failed(format!(
                "cannot add field {} after features were written",
                definition.name
            )));
        }
        if state.fields.iter().any(|field| field.name == definition.name) {
            return Err(DriverError::failed(format!(
                "field {} already exists",
                definition.name
            )));
        }
        state.fields.push(definition.clone());
        Ok(())
    }

    fn field_index(&self, layer: LayerId, name: &str) -> Option<usize> {
        self.layer(layer)
            .ok()?
            .fields
            .iter()
            .position(|field| field.name == name)
    }

    fn field_count(&self, layer: LayerId) -> usize {
        self.layer(layer).map_or(0, |state| state.fields.len())
    }

    fn start_transaction(&mut self, _layer: LayerId) -> Result<(), DriverError> {
        Err(Self::unsupported("transactions"))
    }

    fn commit_transaction(&mut self, _layer: LayerId) -> Result<(), DriverError> {
        Err(Self::unsupported("transactions"))
    }

    fn import_geometry(&self, container: GeometryType, wkb: &[u8]) -> Result<OutputGeometry, DriverError> {
        let geometry = Geometry::from_wkb(wkb).map_err(|e| DriverError::failed(e.to_string()))?;
        if wkb.len() < 9 {
            return Err(DriverError::failed(format!("truncated {} body", geometry.geometry_type())));
        }
        Ok(OutputGeometry {
            geometry_type: container,
            wkb: geometry.into_wkb(),
        })
    }

    fn commit_feature(&mut self, layer: LayerId, feature: OutputFeature) -> Result<(), DriverError> {
        let state = self.layer(layer)?;
        let encoded = record_to_feature(&feature, &state.fields, &state.options)?;
        let separator = if state.written == 0 { "" } else { ",\n" };
        let json = serde_json::to_string(&encoded).map_err(|e| DriverError::failed(e.to_string()))?;

        self.write_raw(separator)?;
        self.write_raw(&json)?;
        self.layer_mut(layer)?.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.out.is_none() {
            return Ok(());
        }
        let footer = if self.layer.is_some() {
            "\n]\n}\n"
        } else {
            "{\n\"type\": \"FeatureCollection\",\n\"features\": []\n}\n"
        };
        self.write_raw(footer)?;

        let path = self.path.clone();
        let written = self.layer.as_ref().map_or(0, |state| state.written);
        if let Some(mut out) = self.out.take() {
            out.flush().map_err(|e| DriverError::io(&path, e))?;
        }
        debug!("Closed GeoJSON dataset {} with {written} features", path.display());
        Ok(())
    }
}

impl Drop for GeoJsonDataset {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close {}: {e}", self.path.display());
        }
    }
}
