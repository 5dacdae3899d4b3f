//! In-memory driver service for `geowriter`.
//!
//! Every dataset created through [`MemoryDriverService`] is recorded in a
//! shared store that can be inspected after an export: created layers, the
//! materialized field schema, committed feature records, transaction
//! counters and deleted paths. Drivers are described by a
//! [`MemoryDriverConfig`], which also allows failures to be injected at each
//! step of the write pipeline.
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//!
//! use geowriter_core_common::driver::DriverService;
//! use geowriter_driver_memory::MemoryDriverService;
//!
//! let service = MemoryDriverService::standard();
//! let driver = service.find_driver("GeoJSON").unwrap();
//! let mut dataset = driver.create_dataset(Path::new("/out/a.geojson"), &[]).unwrap();
//! dataset.close().unwrap();
//!
//! assert!(service.dataset(Path::new("/out/a.geojson")).is_some());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use geowriter_core_common::crs::SpatialRef;
use geowriter_core_common::driver::{
    Dataset, Driver, DriverError, DriverService, FieldDefinition, LayerId, OutputFeature,
    OutputFieldType, OutputGeometry,
};
use geowriter_core_common::geometry::{Geometry, GeometryKind, GeometryType};
use log::debug;

/// Decides whether a feature record is rejected on commit.
pub type CommitPredicate = Arc<dyn Fn(&OutputFeature) -> bool + Send + Sync>;

/// Capabilities and failure injection for one in-memory driver.
#[derive(Clone)]
pub struct MemoryDriverConfig {
    /// Driver name
    pub name: String,
    /// Field types the driver can create
    pub field_types: Vec<OutputFieldType>,
    /// Whether layers accept transactions
    pub transactions: bool,
    /// Maximum field name length; longer names are truncated
    pub max_field_name_length: Option<usize>,
    /// Lowercase field names and replace non-alphanumerics with `_`
    pub launder: bool,
    /// Whether the driver can create datasets at all
    pub can_create_datasource: bool,
    /// Create an empty file at the dataset path
    pub touch_files: bool,
    /// Reject geometries whose kind does not match the container
    pub strict_geometry: bool,
    /// Fail every `create_dataset` call
    pub fail_create_dataset: bool,
    /// Fail every `create_layer` call
    pub fail_create_layer: bool,
    /// Field names whose creation fails
    pub fail_field_names: Vec<String>,
    /// Dataset options the driver refuses
    pub rejected_dataset_options: Vec<String>,
    /// Records matching this predicate are rejected on commit
    pub fail_commit_when: Option<CommitPredicate>,
}

impl fmt::Debug for MemoryDriverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDriverConfig")
            .field("name", &self.name)
            .field("field_types", &self.field_types)
            .field("transactions", &self.transactions)
            .field("max_field_name_length", &self.max_field_name_length)
            .field("launder", &self.launder)
            .field("strict_geometry", &self.strict_geometry)
            .field("fail_commit_when", &self.fail_commit_when.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryDriverConfig {
    fn default() -> Self {
        Self {
            name: "Memory".to_string(),
            field_types: OutputFieldType::ALL.to_vec(),
            transactions: false,
            max_field_name_length: None,
            launder: false,
            can_create_datasource: true,
            touch_files: false,
            strict_geometry: true,
            fail_create_dataset: false,
            fail_create_layer: false,
            fail_field_names: Vec::new(),
            rejected_dataset_options: Vec::new(),
            fail_commit_when: None,
        }
    }
}

impl MemoryDriverConfig {
    /// Creates a driver config with every field type and no limits.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the creatable field types.
    #[must_use]
    pub fn with_field_types(mut self, field_types: &[OutputFieldType]) -> Self {
        self.field_types = field_types.to_vec();
        self
    }

    /// Enable or disable transaction support.
    #[must_use]
    pub fn with_transactions(mut self, transactions: bool) -> Self {
        self.transactions = transactions;
        self
    }

    /// Truncate field names to `len` characters.
    #[must_use]
    pub fn with_max_field_name_length(mut self, len: usize) -> Self {
        self.max_field_name_length = Some(len);
        self
    }

    /// Enable or disable name laundering.
    #[must_use]
    pub fn with_launder(mut self, launder: bool) -> Self {
        self.launder = launder;
        self
    }

    /// Set whether the driver can create datasets.
    #[must_use]
    pub fn with_can_create_datasource(mut self, can_create: bool) -> Self {
        self.can_create_datasource = can_create;
        self
    }

    /// Create an empty file at each dataset path.
    #[must_use]
    pub fn with_touch_files(mut self, touch: bool) -> Self {
        self.touch_files = touch;
        self
    }

    /// Enable or disable geometry container checks.
    #[must_use]
    pub fn with_strict_geometry(mut self, strict: bool) -> Self {
        self.strict_geometry = strict;
        self
    }

    /// Fail dataset creation.
    #[must_use]
    pub fn with_fail_create_dataset(mut self, fail: bool) -> Self {
        self.fail_create_dataset = fail;
        self
    }

    /// Fail layer creation.
    #[must_use]
    pub fn with_fail_create_layer(mut self, fail: bool) -> Self {
        self.fail_create_layer = fail;
        self
    }

    /// Fail creation of the named field.
    #[must_use]
    pub fn with_failing_field(mut self, name: impl Into<String>) -> Self {
        self.fail_field_names.push(name.into());
        self
    }

    /// Refuse a `KEY=value` dataset option.
    #[must_use]
    pub fn with_rejected_dataset_option(mut self, option: impl Into<String>) -> Self {
        self.rejected_dataset_options.push(option.into());
        self
    }

    /// Reject records on commit when `predicate` returns `true`.
    #[must_use]
    pub fn with_fail_commit_when(
        mut self,
        predicate: impl Fn(&OutputFeature) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_commit_when = Some(Arc::new(predicate));
        self
    }

    fn output_field_name(&self, requested: &str, existing: &[FieldDefinition]) -> String {
        let mut name = if self.launder {
            requested
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_lowercase()
                    } else {
                        '_'
                    }
                })
                .collect()
        } else {
            requested.to_string()
        };

        let Some(max) = self.max_field_name_length else {
            return name;
        };
        name = name.chars().take(max).collect();

        let taken = |candidate: &str| {
            existing
                .iter()
                .any(|field| field.name.eq_ignore_ascii_case(candidate))
        };
        if !taken(&name) {
            return name;
        }
        for n in 1..100 {
            let suffix = format!("_{n}");
            let stem: String = name.chars().take(max.saturating_sub(suffix.len())).collect();
            let candidate = format!("{stem}{suffix}");
            if !taken(&candidate) {
                return candidate;
            }
        }
        name
    }
}

/// A layer recorded by the store.
#[derive(Debug, Clone)]
pub struct LayerRecord {
    /// Layer name
    pub name: String,
    /// Spatial reference passed at creation
    pub srs: Option<SpatialRef>,
    /// Geometry type passed at creation
    pub geometry_type: GeometryType,
    /// Layer creation options
    pub options: Vec<String>,
    /// Materialized field schema
    pub fields: Vec<FieldDefinition>,
    /// Committed records
    pub features: Vec<OutputFeature>,
    /// Number of transactions started
    pub transactions_started: usize,
    /// Number of transactions committed
    pub transactions_committed: usize,
}

/// A dataset recorded by the store.
#[derive(Debug, Clone)]
pub struct DatasetRecord {
    /// Name of the driver that created the dataset
    pub driver: String,
    /// Dataset creation options
    pub options: Vec<String>,
    /// Layers in creation order
    pub layers: Vec<LayerRecord>,
    /// Whether the dataset was closed
    pub closed: bool,
}

#[derive(Debug, Default)]
struct StoreState {
    datasets: BTreeMap<PathBuf, DatasetRecord>,
    deleted: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
struct Store(Arc<Mutex<StoreState>>);

impl Store {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Driver service whose datasets live in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriverService {
    drivers: BTreeMap<String, Arc<MemoryDriver>>,
    store: Store,
}

impl MemoryDriverService {
    /// Creates a service without drivers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service with drivers resembling common OGR formats.
    ///
    /// * `ESRI Shapefile`: 10-character field names, no `Time`/`DateTime`
    /// * `GeoJSON`: every field type
    /// * `SQLite`: laundered names, transactions
    /// * `GPKG`: transactions
    /// * `CSV`: every field type
    /// * `MapInfo File`: no `Integer64`
    #[must_use]
    pub fn standard() -> Self {
        use OutputFieldType::{Date, DateTime, Integer, Integer64, Real, String, Time};

        Self::new()
            .with_driver(
                MemoryDriverConfig::new("ESRI Shapefile")
                    .with_field_types(&[Integer, Integer64, Real, String, Date])
                    .with_max_field_name_length(10),
            )
            .with_driver(MemoryDriverConfig::new("GeoJSON"))
            .with_driver(
                MemoryDriverConfig::new("SQLite")
                    .with_launder(true)
                    .with_transactions(true),
            )
            .with_driver(MemoryDriverConfig::new("GPKG").with_transactions(true))
            .with_driver(MemoryDriverConfig::new("CSV"))
            .with_driver(
                MemoryDriverConfig::new("MapInfo File")
                    .with_field_types(&[Integer, Real, String, Date, Time, DateTime]),
            )
    }

    /// Adds or replaces a driver.
    #[must_use]
    pub fn with_driver(mut self, config: MemoryDriverConfig) -> Self {
        let driver = MemoryDriver {
            config: Arc::new(config),
            store: self.store.clone(),
        };
        self.drivers.insert(driver.config.name.clone(), Arc::new(driver));
        self
    }

    /// Snapshot of the dataset created at `path`.
    #[must_use]
    pub fn dataset(&self, path: &Path) -> Option<DatasetRecord> {
        self.store.lock().datasets.get(path).cloned()
    }

    /// Paths of every live dataset.
    #[must_use]
    pub fn dataset_paths(&self) -> Vec<PathBuf> {
        self.store.lock().datasets.keys().cloned().collect()
    }

    /// Paths passed to `delete_dataset`, in call order.
    #[must_use]
    pub fn deleted_paths(&self) -> Vec<PathBuf> {
        self.store.lock().deleted.clone()
    }

    /// Committed records of the first layer of the dataset at `path`.
    #[must_use]
    pub fn features(&self, path: &Path) -> Vec<OutputFeature> {
        self.dataset(path)
            .and_then(|dataset| dataset.layers.into_iter().next())
            .map(|layer| layer.features)
            .unwrap_or_default()
    }
}

impl DriverService for MemoryDriverService {
    fn find_driver(&self, name: &str) -> Result<Arc<dyn Driver>, DriverError> {
        self.drivers
            .get(name)
            .map(|driver| Arc::clone(driver) as Arc<dyn Driver>)
            .ok_or_else(|| DriverError::NotFound {
                name: name.to_string(),
            })
    }

    fn driver_names(&self) -> Vec<String> {
        self.drivers.keys().cloned().collect()
    }
}

#[derive(Debug)]
struct MemoryDriver {
    config: Arc<MemoryDriverConfig>,
    store: Store,
}

impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn creation_field_types(&self) -> &[OutputFieldType] {
        &self.config.field_types
    }

    fn can_create_datasource(&self) -> bool {
        self.config.can_create_datasource
    }

    fn create_dataset(&self, path: &Path, options: &[String]) -> Result<Box<dyn Dataset>, DriverError> {
        if self.config.fail_create_dataset || !self.config.can_create_datasource {
            return Err(DriverError::failed(format!(
                "unable to create dataset {}",
                path.display()
            )));
        }
        if let Some(option) = options
            .iter()
            .find(|option| self.config.rejected_dataset_options.contains(option))
        {
            return Err(DriverError::failed(format!("unsupported option {option}")));
        }
        if self.config.touch_files {
            fs::write(path, b"").map_err(|e| DriverError::io(path, e))?;
        }

        debug!("Creating in-memory {} dataset at {}", self.config.name, path.display());
        self.store.lock().datasets.insert(
            path.to_path_buf(),
            DatasetRecord {
                driver: self.config.name.clone(),
                options: options.to_vec(),
                layers: Vec::new(),
                closed: false,
            },
        );

        Ok(Box::new(MemoryDataset {
            path: path.to_path_buf(),
            config: Arc::clone(&self.config),
            store: self.store.clone(),
            open_transactions: BTreeMap::new(),
        }))
    }

    fn delete_dataset(&self, path: &Path) -> Result<(), DriverError> {
        let mut state = self.store.lock();
        state.datasets.remove(path);
        state.deleted.push(path.to_path_buf());
        drop(state);
        if self.config.touch_files && path.exists() {
            fs::remove_file(path).map_err(|e| DriverError::io(path, e))?;
        }
        Ok(())
    }
}

struct MemoryDataset {
    path: PathBuf,
    config: Arc<MemoryDriverConfig>,
    store: Store,
    open_transactions: BTreeMap<LayerId, bool>,
}

impl MemoryDataset {
    fn with_layer<T>(
        &self,
        layer: LayerId,
        f: impl FnOnce(&mut LayerRecord) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let mut state = self.store.lock();
        let record = state
            .datasets
            .get_mut(&self.path)
            .ok_or_else(|| DriverError::failed(format!("dataset {} was deleted", self.path.display())))?;
        if record.closed {
            return Err(DriverError::failed("dataset is closed"));
        }
        let layer = record
            .layers
            .get_mut(layer.0)
            .ok_or_else(|| DriverError::failed(format!("no layer with index {}", layer.0)))?;
        f(layer)
    }

    fn read_layer<T>(&self, layer: LayerId, f: impl FnOnce(&LayerRecord) -> T) -> Option<T> {
        let state = self.store.lock();
        state
            .datasets
            .get(&self.path)
            .and_then(|record| record.layers.get(layer.0))
            .map(f)
    }
}

impl Dataset for MemoryDataset {
    fn create_layer(
        &mut self,
        name: &str,
        srs: Option<&SpatialRef>,
        geometry_type: GeometryType,
        options: &[String],
    ) -> Result<LayerId, DriverError> {
        if self.config.fail_create_layer {
            return Err(DriverError::failed(format!("layer {name} could not be created")));
        }
        let mut state = self.store.lock();
        let record = state
            .datasets
            .get_mut(&self.path)
            .ok_or_else(|| DriverError::failed(format!("dataset {} was deleted", self.path.display())))?;
        record.layers.push(LayerRecord {
            name: name.to_string(),
            srs: srs.cloned(),
            geometry_type,
            options: options.to_vec(),
            fields: Vec::new(),
            features: Vec::new(),
            transactions_started: 0,
            transactions_committed: 0,
        });
        Ok(LayerId(record.layers.len() - 1))
    }

    fn create_field(&mut self, layer: LayerId, definition: &FieldDefinition) -> Result<(), DriverError> {
        let config = Arc::clone(&self.config);
        if config.fail_field_names.contains(&definition.name) {
            return Err(DriverError::failed(format!(
                "field {} rejected by driver",
                definition.name
            )));
        }
        if !config.field_types.contains(&definition.field_type) {
            return Err(DriverError::Unsupported {
                driver: config.name.clone(),
                operation: format!("field type {}", definition.field_type),
            });
        }
        self.with_layer(layer, |record| {
            let name = config.output_field_name(&definition.name, &record.fields);
            record.fields.push(FieldDefinition {
                name,
                ..definition.clone()
            });
            Ok(())
        })
    }

    fn field_index(&self, layer: LayerId, name: &str) -> Option<usize> {
        self.read_layer(layer, |record| {
            record
                .fields
                .iter()
                .position(|field| field.name.eq_ignore_ascii_case(name))
        })
        .flatten()
    }

    fn field_count(&self, layer: LayerId) -> usize {
        self.read_layer(layer, |record| record.fields.len()).unwrap_or(0)
    }

    fn start_transaction(&mut self, layer: LayerId) -> Result<(), DriverError> {
        if !self.config.transactions {
            return Err(DriverError::Unsupported {
                driver: self.config.name.clone(),
                operation: "transactions".to_string(),
            });
        }
        self.with_layer(layer, |record| {
            record.transactions_started += 1;
            Ok(())
        })?;
        self.open_transactions.insert(layer, true);
        Ok(())
    }

    fn commit_transaction(&mut self, layer: LayerId) -> Result<(), DriverError> {
        if self.open_transactions.remove(&layer).is_none() {
            return Err(DriverError::failed("no transaction in progress"));
        }
        self.with_layer(layer, |record| {
            record.transactions_committed += 1;
            Ok(())
        })
    }

    fn import_geometry(&self, container: GeometryType, wkb: &[u8]) -> Result<OutputGeometry, DriverError> {
        let geometry = Geometry::from_wkb(wkb).map_err(|e| DriverError::failed(e.to_string()))?;
        if wkb.len() < 9 {
            return Err(DriverError::failed(format!("truncated {} body", geometry.geometry_type())));
        }
        if self.config.strict_geometry
            && container.kind != GeometryKind::Unknown
            && container.kind != geometry.geometry_type().kind
        {
            return Err(DriverError::failed(format!(
                "cannot import {} into {}",
                geometry.geometry_type(),
                container
            )));
        }
        Ok(OutputGeometry {
            geometry_type: container,
            wkb: geometry.into_wkb(),
        })
    }

    fn commit_feature(&mut self, layer: LayerId, feature: OutputFeature) -> Result<(), DriverError> {
        if let Some(predicate) = &self.config.fail_commit_when {
            if predicate(&feature) {
                return Err(DriverError::failed("record rejected"));
            }
        }
        self.with_layer(layer, |record| {
            record.features.push(feature);
            Ok(())
        })
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if let Some(record) = self.store.lock().datasets.get_mut(&self.path) {
            record.closed = true;
        }
        Ok(())
    }
}
