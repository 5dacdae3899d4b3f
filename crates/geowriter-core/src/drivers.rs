//! Driver capability registry: format metadata and creation options.
//!
//! The registry is a catalog of writable vector formats keyed by a short
//! format name. Each entry describes the format (display name, file glob,
//! default extension), the typed creation options the driver understands at
//! dataset and layer level, and an optional encoding the format imposes.
//!
//! The catalog is built on first use and never mutated afterwards. It lives
//! inside a [`DriverRegistry`] value so that callers can inject their own
//! catalog instead of relying on process-wide state.
//!
//! # Examples
//!
//! ```
//! use geowriter_core::drivers::{DriverRegistry, OptionScope};
//!
//! let registry = DriverRegistry::new();
//!
//! // Lookups match on key or long-name prefix.
//! let shapefile = registry.lookup("ESRI Shapefile").expect("shapefile metadata");
//! assert_eq!(shapefile.ext, "shp");
//!
//! // Default option strings for the layer scope.
//! let options = registry.default_options("GeoJSON", OptionScope::Layer);
//! assert_eq!(options, vec!["COORDINATE_PRECISION=15".to_string()]);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use geowriter_core_common::DriverService;
use log::debug;
use once_cell::sync::OnceCell;

/// Name of the scratch dataset used to probe SpatiaLite support.
const SPATIALITE_PROBE: &str = "geowriter-spatialite-probe.sqlite";

/// A typed driver creation option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverOption {
    /// Yes/no switch
    Bool {
        /// Option documentation
        docs: String,
        /// Default value
        default: bool,
    },
    /// Integer value
    Int {
        /// Option documentation
        docs: String,
        /// Default value
        default: i64,
    },
    /// Free-form text
    String {
        /// Option documentation
        docs: String,
        /// Default value
        default: String,
    },
    /// One value out of an enumerated set
    Set {
        /// Option documentation
        docs: String,
        /// Accepted values
        values: Vec<String>,
        /// Default value, empty when unset
        default: String,
        /// Whether leaving the option unset is allowed
        allow_none: bool,
    },
    /// Fixed value not exposed to users
    Hidden {
        /// Value always passed to the driver
        value: String,
    },
}

impl DriverOption {
    /// Creates a [`DriverOption::Bool`].
    #[must_use]
    pub fn bool(docs: &str, default: bool) -> Self {
        DriverOption::Bool {
            docs: docs.to_string(),
            default,
        }
    }

    /// Creates a [`DriverOption::Int`].
    #[must_use]
    pub fn int(docs: &str, default: i64) -> Self {
        DriverOption::Int {
            docs: docs.to_string(),
            default,
        }
    }

    /// Creates a [`DriverOption::String`].
    #[must_use]
    pub fn string(docs: &str, default: &str) -> Self {
        DriverOption::String {
            docs: docs.to_string(),
            default: default.to_string(),
        }
    }

    /// Creates a [`DriverOption::Set`].
    #[must_use]
    pub fn set(docs: &str, values: &[&str], default: &str, allow_none: bool) -> Self {
        DriverOption::Set {
            docs: docs.to_string(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
            default: default.to_string(),
            allow_none,
        }
    }

    /// Creates a [`DriverOption::Hidden`].
    #[must_use]
    pub fn hidden(value: &str) -> Self {
        DriverOption::Hidden {
            value: value.to_string(),
        }
    }

    /// Name of the option kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            DriverOption::Bool { .. } => "Bool",
            DriverOption::Int { .. } => "Int",
            DriverOption::String { .. } => "String",
            DriverOption::Set { .. } => "Set",
            DriverOption::Hidden { .. } => "Hidden",
        }
    }

    /// Documentation text; empty for hidden options.
    #[must_use]
    pub fn docs(&self) -> &str {
        match self {
            DriverOption::Bool { docs, .. }
            | DriverOption::Int { docs, .. }
            | DriverOption::String { docs, .. }
            | DriverOption::Set { docs, .. } => docs,
            DriverOption::Hidden { .. } => "",
        }
    }

    /// Value emitted into the default option list, if any.
    ///
    /// Integer, string and hidden options always emit; sets emit only with a
    /// non-empty default; booleans never emit.
    #[must_use]
    pub fn default_value(&self) -> Option<String> {
        match self {
            DriverOption::Bool { .. } => None,
            DriverOption::Int { default, .. } => Some(default.to_string()),
            DriverOption::String { default, .. } => Some(default.clone()),
            DriverOption::Set { default, .. } if default.is_empty() => None,
            DriverOption::Set { default, .. } => Some(default.clone()),
            DriverOption::Hidden { value } => Some(value.clone()),
        }
    }
}

impl fmt::Display for DriverOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverOption::Bool { default, .. } => f.write_str(if *default { "YES" } else { "NO" }),
            DriverOption::Int { default, .. } => write!(f, "{default}"),
            DriverOption::String { default, .. } => f.write_str(default),
            DriverOption::Set {
                values,
                default,
                allow_none,
                ..
            } => {
                write!(f, "{default} [{}]", values.join("|"))?;
                if *allow_none {
                    f.write_str(" (optional)")?;
                }
                Ok(())
            },
            DriverOption::Hidden { value } => f.write_str(value),
        }
    }
}

/// Scope of a creation option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    /// Options passed when creating the dataset
    Dataset,
    /// Options passed when creating the layer
    Layer,
}

/// Metadata describing one writable format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverMetadata {
    /// Long name, used for prefix matching
    pub long_name: String,
    /// Display name
    pub tr_long_name: String,
    /// File glob(s) used in file dialogs, e.g. `"*.shp"`
    pub glob: String,
    /// Default file extension without the dot
    pub ext: String,
    /// Dataset creation options, by key
    pub driver_options: BTreeMap<String, DriverOption>,
    /// Layer creation options, by key
    pub layer_options: BTreeMap<String, DriverOption>,
    /// Encoding the format requires regardless of the caller's choice
    pub compulsory_encoding: Option<String>,
}

impl DriverMetadata {
    /// Creates metadata with no options.
    #[must_use]
    pub fn new(long_name: &str, tr_long_name: &str, glob: &str, ext: &str) -> Self {
        Self {
            long_name: long_name.to_string(),
            tr_long_name: tr_long_name.to_string(),
            glob: glob.to_string(),
            ext: ext.to_string(),
            driver_options: BTreeMap::new(),
            layer_options: BTreeMap::new(),
            compulsory_encoding: None,
        }
    }

    /// Adds a dataset creation option.
    #[must_use]
    pub fn with_dataset_option(mut self, key: &str, option: DriverOption) -> Self {
        self.driver_options.insert(key.to_string(), option);
        self
    }

    /// Adds a layer creation option.
    #[must_use]
    pub fn with_layer_option(mut self, key: &str, option: DriverOption) -> Self {
        self.layer_options.insert(key.to_string(), option);
        self
    }

    /// Sets the compulsory encoding.
    #[must_use]
    pub fn with_compulsory_encoding(mut self, encoding: &str) -> Self {
        self.compulsory_encoding = Some(encoding.to_string());
        self
    }

    /// Options of the given scope.
    #[must_use]
    pub fn options(&self, scope: OptionScope) -> &BTreeMap<String, DriverOption> {
        match scope {
            OptionScope::Dataset => &self.driver_options,
            OptionScope::Layer => &self.layer_options,
        }
    }

    /// Extensions accepted by this format, lower-cased, from the glob.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        self.glob
            .split_whitespace()
            .filter_map(|pattern| pattern.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase())
            .collect()
    }
}

/// Catalog of writable formats, built on first use.
///
/// Entries are visited in key order (byte-wise, so upper-case keys sort
/// before lower-case ones) which is the tie-break for prefix lookups.
pub struct DriverRegistry {
    catalog: OnceCell<BTreeMap<String, DriverMetadata>>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("initialized", &self.catalog.get().is_some())
            .finish()
    }
}

impl DriverRegistry {
    /// Creates a registry backed by the built-in catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: OnceCell::new(),
        }
    }

    /// Creates a registry backed by a caller-supplied catalog.
    #[must_use]
    pub fn from_catalog(catalog: BTreeMap<String, DriverMetadata>) -> Self {
        Self {
            catalog: OnceCell::with_value(catalog),
        }
    }

    fn catalog(&self) -> &BTreeMap<String, DriverMetadata> {
        self.catalog.get_or_init(|| {
            debug!("Building driver metadata catalog");
            builtin_catalog()
        })
    }

    /// Iterates every catalog entry in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &DriverMetadata)> {
        self.catalog().iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Finds the first entry whose key or long name starts with `name`.
    ///
    /// Matching is case-sensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use geowriter_core::drivers::DriverRegistry;
    ///
    /// let registry = DriverRegistry::new();
    /// assert_eq!(registry.lookup("GeoJ"), registry.lookup("GeoJSON"));
    /// assert!(registry.lookup("geojson").is_none());
    /// ```
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&DriverMetadata> {
        self.catalog()
            .iter()
            .find(|(key, meta)| key.starts_with(name) || meta.long_name.starts_with(name))
            .map(|(_, meta)| meta)
    }

    /// Default `KEY=value` option strings of `name` for `scope`.
    ///
    /// Unknown formats yield an empty list.
    #[must_use]
    pub fn default_options(&self, name: &str, scope: OptionScope) -> Vec<String> {
        self.lookup(name)
            .map(|meta| concatenate_options(meta.options(scope)))
            .unwrap_or_default()
    }

    /// Default dataset creation options of `name`.
    #[must_use]
    pub fn default_dataset_options(&self, name: &str) -> Vec<String> {
        self.default_options(name, OptionScope::Dataset)
    }

    /// Default layer creation options of `name`.
    #[must_use]
    pub fn default_layer_options(&self, name: &str) -> Vec<String> {
        self.default_options(name, OptionScope::Layer)
    }

    /// File dialog filter for a driver, e.g. `"GeoJSON [OGR] (*.geojson *.GEOJSON)"`.
    ///
    /// Returns an empty string when the driver has no metadata, display name
    /// or glob.
    #[must_use]
    pub fn filter_for_driver(&self, name: &str) -> String {
        match self.lookup(name) {
            Some(meta) if !meta.tr_long_name.is_empty() && !meta.glob.is_empty() => format!(
                "{} [OGR] ({} {})",
                meta.tr_long_name,
                meta.glob.to_lowercase(),
                meta.glob.to_uppercase()
            ),
            _ => String::new(),
        }
    }

    /// Maps file filters to driver names for every driver of `service` that
    /// can create datasets.
    #[must_use]
    pub fn supported_filters_and_formats(&self, service: &dyn DriverService) -> BTreeMap<String, String> {
        let mut result = BTreeMap::new();
        for name in service.driver_names() {
            let Ok(driver) = service.find_driver(&name) else {
                continue;
            };
            if !driver.can_create_datasource() {
                continue;
            }
            let filter = self.filter_for_driver(&name);
            if !filter.is_empty() {
                result.insert(filter, name);
            }
        }
        result
    }

    /// All file filters of `service`, sorted and joined with `;;`.
    #[must_use]
    pub fn file_filter_string(&self, service: &dyn DriverService) -> String {
        self.supported_filters_and_formats(service)
            .into_keys()
            .collect::<Vec<_>>()
            .join(";;")
    }

    /// Maps display names to format names for every writable format of
    /// `service`, including the `MapInfo MIF`, `DBF file` and `SpatiaLite`
    /// aliases.
    ///
    /// SpatiaLite is only listed when the SQLite driver accepts
    /// `SPATIALITE=YES`; support is probed with a scratch dataset in the
    /// system temporary directory.
    #[must_use]
    pub fn writable_formats(&self, service: &dyn DriverService) -> BTreeMap<String, String> {
        let mut writable = Vec::new();
        for name in service.driver_names() {
            let Ok(driver) = service.find_driver(&name) else {
                continue;
            };
            if !driver.can_create_datasource() {
                continue;
            }
            match name.as_str() {
                "MapInfo File" => writable.push("MapInfo MIF".to_string()),
                "SQLite" => {
                    let probe = std::env::temp_dir().join(SPATIALITE_PROBE);
                    let options = ["SPATIALITE=YES".to_string()];
                    if let Ok(mut dataset) = driver.create_dataset(&probe, &options) {
                        if let Err(e) = dataset.close() {
                            debug!("Closing SpatiaLite probe failed: {e}");
                        }
                        if let Err(e) = driver.delete_dataset(&probe) {
                            debug!("Removing SpatiaLite probe failed: {e}");
                        }
                        writable.push("SpatiaLite".to_string());
                    }
                },
                "ESRI Shapefile" => writable.push("DBF file".to_string()),
                _ => {},
            }
            writable.push(name);
        }

        writable
            .into_iter()
            .filter_map(|name| {
                let meta = self.lookup(&name)?;
                (!meta.tr_long_name.is_empty()).then(|| (meta.tr_long_name.clone(), name))
            })
            .collect()
    }
}

fn concatenate_options(options: &BTreeMap<String, DriverOption>) -> Vec<String> {
    options
        .iter()
        .filter_map(|(key, option)| option.default_value().map(|value| format!("{key}={value}")))
        .collect()
}

const LINEFORMAT_DOCS: &str = "By default files are created with the line termination conventions \
     of the local platform (CR/LF on Win32 or LF on all other systems). This may be overridden \
     with CRLF (DOS format) or LF (Unix format).";

const SQLITE_METADATA_DOCS: &str = "Can be used to avoid creating the geometry_columns and \
     spatial_ref_sys tables in a new database. By default these metadata tables are created \
     when a new database is created.";

const SQLITE_LAUNDER_DOCS: &str = "Controls whether layer and field names will be laundered for \
     easier use in SQLite. Laundered names will be converted to lower case and some special \
     characters(' - #) will be changed to underscores.";

const SQLITE_COMPRESS_COLUMNS_DOCS: &str = "column_name1[,column_name2, ...] A list of (String) \
     columns that must be compressed with ZLib DEFLATE algorithm. Such columns cannot be \
     (easily) queried with an attribute filter or WHERE clause.";

const SPREADSHEET_FIELD_TYPES_DOCS: &str = "By default, the driver will try to detect the data \
     type of fields. If set to STRING, all fields will be of String type.";

#[allow(clippy::too_many_lines)]
fn builtin_catalog() -> BTreeMap<String, DriverMetadata> {
    let entries = vec![
        (
            "AVCE00",
            DriverMetadata::new("Arc/Info ASCII Coverage", "Arc/Info ASCII Coverage", "*.e00", "e00"),
        ),
        (
            "BNA",
            DriverMetadata::new("Atlas BNA", "Atlas BNA", "*.bna", "bna")
                .with_dataset_option(
                    "LINEFORMAT",
                    DriverOption::set(LINEFORMAT_DOCS, &["CRLF", "LF"], "", true),
                )
                .with_dataset_option(
                    "MULTILINE",
                    DriverOption::bool(
                        "By default, BNA files are created in multi-line format. For each record, \
                         the first line contains the identifiers and the type/number of \
                         coordinates to follow.",
                        true,
                    ),
                )
                .with_dataset_option(
                    "NB_IDS",
                    DriverOption::set(
                        "BNA records may contain from 2 to 4 identifiers per record.",
                        &["2", "3", "4", "NB_SOURCE_FIELDS"],
                        "2",
                        false,
                    ),
                )
                .with_dataset_option(
                    "ELLIPSES_AS_ELLIPSES",
                    DriverOption::bool(
                        "The BNA writer will try to recognize ellipses and circles when writing \
                         a polygon.",
                        true,
                    ),
                )
                .with_dataset_option(
                    "NB_PAIRS_PER_LINE",
                    DriverOption::int(
                        "Limit the number of coordinate pairs per line in multiline format.",
                        2,
                    ),
                )
                .with_dataset_option(
                    "COORDINATE_PRECISION",
                    DriverOption::int(
                        "Set the number of decimal for coordinates. Default value is 10.",
                        10,
                    ),
                ),
        ),
        (
            "CSV",
            DriverMetadata::new(
                "Comma Separated Value [CSV]",
                "Comma Separated Value [CSV]",
                "*.csv",
                "csv",
            )
            .with_layer_option(
                "LINEFORMAT",
                DriverOption::set(LINEFORMAT_DOCS, &["CRLF", "LF"], "", true),
            )
            .with_layer_option(
                "GEOMETRY",
                DriverOption::set(
                    "By default, the geometry of a feature written to a .csv file is discarded. \
                     It can be exported as WKT or, for points, as X,Y,Z components.",
                    &["AS_WKT", "AS_XYZ", "AS_XY", "AS_YX"],
                    "AS_XY",
                    true,
                ),
            )
            .with_layer_option(
                "CREATE_CSVT",
                DriverOption::bool(
                    "Create the associated .csvt file to describe the type of each column of \
                     the layer and its optional width and precision.",
                    false,
                ),
            )
            .with_layer_option(
                "SEPARATOR",
                DriverOption::set(
                    "Field separator character.",
                    &["COMMA", "SEMICOLON", "TAB"],
                    "COMMA",
                    false,
                ),
            )
            .with_layer_option(
                "WRITE_BOM",
                DriverOption::bool(
                    "Write a UTF-8 Byte Order Mark (BOM) at the start of the file.",
                    false,
                ),
            ),
        ),
        (
            "ESRI",
            DriverMetadata::new("ESRI Shapefile", "ESRI Shapefile", "*.shp", "shp")
                .with_layer_option(
                    "SHPT",
                    DriverOption::set(
                        "Override the type of shapefile created. NULL creates a simple .dbf file \
                         with no .shp file. Shapefiles with measure values are not supported, \
                         nor are MULTIPATCH files.",
                        &[
                            "NULL",
                            "POINT",
                            "ARC",
                            "POLYGON",
                            "MULTIPOINT",
                            "POINTZ",
                            "ARCZ",
                            "POLYGONZ",
                            "MULTIPOINTZ",
                        ],
                        "",
                        true,
                    ),
                )
                .with_layer_option(
                    "RESIZE",
                    DriverOption::bool("Set to YES to resize fields to their optimal size.", false),
                ),
        ),
        (
            "DBF File",
            DriverMetadata::new("DBF File", "DBF File", "*.dbf", "dbf"),
        ),
        (
            "FMEObjects Gateway",
            DriverMetadata::new("FMEObjects Gateway", "FMEObjects Gateway", "*.fdd", "fdd"),
        ),
        (
            "GeoJSON",
            DriverMetadata::new("GeoJSON", "GeoJSON", "*.geojson", "geojson")
                .with_layer_option(
                    "WRITE_BBOX",
                    DriverOption::bool(
                        "Set to YES to write a bbox property with the bounding box of the \
                         geometries at the feature and feature collection level.",
                        false,
                    ),
                )
                .with_layer_option(
                    "COORDINATE_PRECISION",
                    DriverOption::int(
                        "Maximum number of figures after decimal separator to write in \
                         coordinates. Truncation will occur to remove trailing zeros.",
                        15,
                    ),
                )
                .with_compulsory_encoding("UTF-8"),
        ),
        (
            "GeoRSS",
            DriverMetadata::new("GeoRSS", "GeoRSS", "*.xml", "xml")
                .with_dataset_option(
                    "FORMAT",
                    DriverOption::set(
                        "Whether the document must be in RSS 2.0 or Atom 1.0 format.",
                        &["RSS", "ATOM"],
                        "RSS",
                        false,
                    ),
                )
                .with_dataset_option(
                    "GEOM_DIALECT",
                    DriverOption::set(
                        "The encoding of location information. W3C_GEO only supports point \
                         geometries.",
                        &["SIMPLE", "GML", "W3C_GEO"],
                        "SIMPLE",
                        false,
                    ),
                )
                .with_dataset_option(
                    "USE_EXTENSIONS",
                    DriverOption::bool("If defined to YES, extension fields will be written.", true),
                )
                .with_dataset_option(
                    "WRITE_HEADER_AND_FOOTER",
                    DriverOption::bool(
                        "If defined to NO, only <entry> or <item> elements will be written.",
                        true,
                    ),
                )
                .with_dataset_option(
                    "HEADER",
                    DriverOption::string(
                        "XML content put between the <channel> element and the first <item> \
                         element for RSS, or between the xml tag and the first <entry> for Atom.",
                        "",
                    ),
                )
                .with_dataset_option(
                    "TITLE",
                    DriverOption::string("Value put inside the <title> element in the header.", ""),
                )
                .with_dataset_option(
                    "DESCRIPTION",
                    DriverOption::string(
                        "Value put inside the <description> element in the header.",
                        "",
                    ),
                )
                .with_dataset_option(
                    "LINK",
                    DriverOption::string("Value put inside the <link> element in the header.", ""),
                )
                .with_dataset_option(
                    "UPDATED",
                    DriverOption::string(
                        "Value put inside the <updated> element in the header, as an XML \
                         datetime.",
                        "",
                    ),
                )
                .with_dataset_option(
                    "AUTHOR_NAME",
                    DriverOption::string(
                        "Value put inside the <author><name> element in the header.",
                        "",
                    ),
                )
                .with_dataset_option(
                    "ID",
                    DriverOption::string("Value put inside the <id> element in the header.", ""),
                )
                .with_compulsory_encoding("UTF-8"),
        ),
        (
            "GML",
            DriverMetadata::new(
                "Geography Markup Language [GML]",
                "Geography Markup Language [GML]",
                "*.gml",
                "gml",
            )
            .with_dataset_option(
                "XSISCHEMAURI",
                DriverOption::string(
                    "If provided, this URI will be inserted as the schema location.",
                    "",
                ),
            )
            .with_dataset_option(
                "XSISCHEMA",
                DriverOption::set(
                    "Writes a GML application schema file to a corresponding .xsd file. \
                     INTERNAL writes it within the GML file; OFF disables schema generation.",
                    &["EXTERNAL", "INTERNAL", "OFF"],
                    "EXTERNAL",
                    false,
                ),
            )
            .with_dataset_option(
                "PREFIX",
                DriverOption::string("Prefix for the application target namespace.", "ogr"),
            )
            .with_dataset_option(
                "STRIP_PREFIX",
                DriverOption::bool(
                    "Avoid writing the prefix of the application target namespace.",
                    false,
                ),
            )
            .with_dataset_option(
                "TARGET_NAMESPACE",
                DriverOption::string(
                    "The application target namespace.",
                    "http://ogr.maptools.org/",
                ),
            )
            .with_dataset_option(
                "FORMAT",
                DriverOption::set(
                    "If not specified, GML2 will be used.",
                    &["GML3", "GML3Deegree", "GML3.2"],
                    "",
                    true,
                ),
            )
            .with_dataset_option(
                "GML3_LONGSRS",
                DriverOption::bool(
                    "Only valid for GML3 formats. If YES, SRS with EPSG authority are written \
                     with the 'urn:ogc:def:crs:EPSG::' prefix.",
                    true,
                ),
            )
            .with_dataset_option(
                "WRITE_FEATURE_BOUNDED_BY",
                DriverOption::bool(
                    "Only valid for GML3 formats. If NO, the <gml:boundedBy> element is not \
                     written for each feature.",
                    true,
                ),
            )
            .with_dataset_option(
                "SPACE_INDENTATION",
                DriverOption::bool("If YES, the output will be indented with spaces.", true),
            )
            .with_compulsory_encoding("UTF-8"),
        ),
        (
            "GPKG",
            DriverMetadata::new("GeoPackage", "GeoPackage", "*.gpkg", "gpkg")
                .with_layer_option(
                    "IDENTIFIER",
                    DriverOption::string(
                        "Human-readable identifier (e.g. short name) for the layer content",
                        "",
                    ),
                )
                .with_layer_option(
                    "DESCRIPTION",
                    DriverOption::string("Human-readable description for the layer content", ""),
                )
                .with_layer_option(
                    "FID",
                    DriverOption::string("Name for the feature identifier column", "fid"),
                )
                .with_layer_option(
                    "GEOMETRY_NAME",
                    DriverOption::string("Name for the geometry column", "geometry"),
                )
                .with_layer_option(
                    "SPATIAL_INDEX",
                    DriverOption::bool("If a spatial index must be created.", true),
                )
                .with_compulsory_encoding("UTF-8"),
        ),
        (
            "GMT",
            DriverMetadata::new(
                "Generic Mapping Tools [GMT]",
                "Generic Mapping Tools [GMT]",
                "*.gmt",
                "gmt",
            ),
        ),
        (
            "GPX",
            DriverMetadata::new(
                "GPS eXchange Format [GPX]",
                "GPS eXchange Format [GPX]",
                "*.gpx",
                "gpx",
            )
            .with_layer_option(
                "FORCE_GPX_TRACK",
                DriverOption::bool("Write line strings as tracks instead of routes.", false),
            )
            .with_layer_option(
                "FORCE_GPX_ROUTE",
                DriverOption::bool(
                    "Write single-line multi line strings as routes instead of tracks.",
                    false,
                ),
            )
            .with_dataset_option(
                "GPX_USE_EXTENSIONS",
                DriverOption::bool(
                    "Extra fields will be written inside the <extensions> tag.",
                    true,
                ),
            )
            .with_dataset_option(
                "GPX_EXTENSIONS_NS",
                DriverOption::string("The namespace value used for extension tags.", "ogr"),
            )
            .with_dataset_option(
                "GPX_EXTENSIONS_NS_URL",
                DriverOption::string("The namespace URI.", "http://osgeo.org/gdal"),
            )
            .with_dataset_option(
                "LINEFORMAT",
                DriverOption::set(LINEFORMAT_DOCS, &["CRLF", "LF"], "", true),
            )
            .with_compulsory_encoding("UTF-8"),
        ),
        (
            "Interlis 1",
            DriverMetadata::new("INTERLIS 1", "INTERLIS 1", "*.itf *.xml *.ili", "ili"),
        ),
        (
            "Interlis 2",
            DriverMetadata::new("INTERLIS 2", "INTERLIS 2", "*.itf *.xml *.ili", "ili"),
        ),
        (
            "KML",
            DriverMetadata::new(
                "Keyhole Markup Language [KML]",
                "Keyhole Markup Language [KML]",
                "*.kml",
                "kml",
            )
            .with_dataset_option(
                "NameField",
                DriverOption::string("Field to use for the KML <name> element.", "Name"),
            )
            .with_dataset_option(
                "DescriptionField",
                DriverOption::string(
                    "Field to use for the KML <description> element.",
                    "Description",
                ),
            )
            .with_dataset_option(
                "AltitudeMode",
                DriverOption::set(
                    "AltitudeMode to use for KML geometries. Only affects 3D geometries.",
                    &["clampToGround", "relativeToGround", "absolute"],
                    "clampToGround",
                    false,
                ),
            )
            .with_compulsory_encoding("UTF-8"),
        ),
        (
            "MapInfo File",
            DriverMetadata::new("Mapinfo", "Mapinfo TAB", "*.tab", "tab").with_layer_option(
                "SPATIAL_INDEX_MODE",
                DriverOption::set(
                    "Turn on 'quick spatial index mode': faster writes, slower spatial queries.",
                    &["QUICK"],
                    "",
                    true,
                ),
            ),
        ),
        (
            "MapInfo MIF",
            DriverMetadata::new("Mapinfo", "Mapinfo MIF", "*.mif", "mif").with_layer_option(
                "SPATIAL_INDEX_MODE",
                DriverOption::set(
                    "Turn on 'quick spatial index mode': faster writes, slower spatial queries.",
                    &["QUICK"],
                    "",
                    true,
                ),
            ),
        ),
        (
            "DGN",
            DriverMetadata::new("Microstation DGN", "Microstation DGN", "*.dgn", "dgn")
                .with_dataset_option(
                    "3D",
                    DriverOption::bool(
                        "Use the 3D seed file instead of the 2D one. Ignored if SEED is given.",
                        false,
                    ),
                )
                .with_dataset_option("SEED", DriverOption::string("Override the seed file to use.", ""))
                .with_dataset_option(
                    "COPY_WHOLE_SEED_FILE",
                    DriverOption::bool("Copy the whole seed file.", false),
                )
                .with_dataset_option(
                    "COPY_SEED_FILE_COLOR_TABLEE",
                    DriverOption::bool("Copy the color table from the seed file.", false),
                )
                .with_dataset_option(
                    "MASTER_UNIT_NAME",
                    DriverOption::string("Override the master unit name from the seed file.", ""),
                )
                .with_dataset_option(
                    "SUB_UNIT_NAME",
                    DriverOption::string("Override the sub unit name from the seed file.", ""),
                )
                .with_dataset_option(
                    "SUB_UNITS_PER_MASTER_UNIT",
                    DriverOption::int("Override the number of subunits per master unit.", 0),
                )
                .with_dataset_option(
                    "UOR_PER_SUB_UNIT",
                    DriverOption::int("Override the number of UORs per sub unit.", 0),
                )
                .with_dataset_option(
                    "ORIGIN",
                    DriverOption::string("ORIGIN=x,y,z: Override the origin of the design plane.", ""),
                ),
        ),
        (
            "S57",
            DriverMetadata::new("S-57 Base file", "S-57 Base file", "*.000", "000")
                .with_dataset_option(
                    "UPDATES",
                    DriverOption::set(
                        "Should update files be incorporated into the base data on the fly.",
                        &["APPLY", "IGNORE"],
                        "APPLY",
                        false,
                    ),
                )
                .with_dataset_option(
                    "SPLIT_MULTIPOINT",
                    DriverOption::bool(
                        "Split multipoint soundings into single point features.",
                        false,
                    ),
                )
                .with_dataset_option(
                    "ADD_SOUNDG_DEPTH",
                    DriverOption::bool("Add a DEPTH attribute on SOUNDG features.", false),
                )
                .with_dataset_option(
                    "RETURN_PRIMITIVES",
                    DriverOption::bool("Return low level geometry primitives as layers.", true),
                )
                .with_dataset_option(
                    "PRESERVE_EMPTY_NUMBERS",
                    DriverOption::bool(
                        "Preserve numeric attributes assigned an empty string.",
                        false,
                    ),
                )
                .with_dataset_option(
                    "LNAM_REFS",
                    DriverOption::bool("Attach LNAM and LNAM_REFS fields to features.", true),
                )
                .with_dataset_option(
                    "RETURN_LINKAGES",
                    DriverOption::bool(
                        "Attach attributes relating features to their geometric primitives.",
                        true,
                    ),
                )
                .with_dataset_option(
                    "RECODE_BY_DSSI",
                    DriverOption::bool(
                        "Recode attribute values to UTF-8 from the DSSI record encoding.",
                        false,
                    ),
                ),
        ),
        (
            "SDTS",
            DriverMetadata::new(
                "Spatial Data Transfer Standard [SDTS]",
                "Spatial Data Transfer Standard [SDTS]",
                "*catd.ddf",
                "ddf",
            ),
        ),
        (
            "SQLite",
            DriverMetadata::new("SQLite", "SQLite", "*.sqlite", "sqlite")
                .with_dataset_option("METADATA", DriverOption::bool(SQLITE_METADATA_DOCS, true))
                .with_dataset_option("SPATIALITE", DriverOption::hidden("NO"))
                .with_dataset_option("INIT_WITH_EPSG", DriverOption::hidden("NO"))
                .with_layer_option(
                    "FORMAT",
                    DriverOption::set(
                        "Controls the format used for the geometry column. Defaults to WKB.",
                        &["WKB", "WKT"],
                        "WKB",
                        false,
                    ),
                )
                .with_layer_option("LAUNDER", DriverOption::bool(SQLITE_LAUNDER_DOCS, true))
                .with_layer_option("SPATIAL_INDEX", DriverOption::hidden("NO"))
                .with_layer_option("COMPRESS_GEOM", DriverOption::hidden("NO"))
                .with_layer_option("SRID", DriverOption::hidden(""))
                .with_layer_option(
                    "COMPRESS_COLUMNS",
                    DriverOption::string(SQLITE_COMPRESS_COLUMNS_DOCS, ""),
                )
                .with_compulsory_encoding("UTF-8"),
        ),
        (
            "SpatiaLite",
            DriverMetadata::new("SpatiaLite", "SpatiaLite", "*.sqlite", "sqlite")
                .with_dataset_option("METADATA", DriverOption::bool(SQLITE_METADATA_DOCS, true))
                .with_dataset_option("SPATIALITE", DriverOption::hidden("YES"))
                .with_dataset_option(
                    "INIT_WITH_EPSG",
                    DriverOption::bool(
                        "Insert the content of the EPSG CSV files into the spatial_ref_sys table.",
                        true,
                    ),
                )
                .with_layer_option("FORMAT", DriverOption::hidden("SPATIALITE"))
                .with_layer_option("LAUNDER", DriverOption::bool(SQLITE_LAUNDER_DOCS, true))
                .with_layer_option(
                    "SPATIAL_INDEX",
                    DriverOption::bool("Control if a spatial index must be created.", true),
                )
                .with_layer_option(
                    "COMPRESS_GEOM",
                    DriverOption::bool(
                        "Use the compressed format for LINESTRING and POLYGON geometries.",
                        false,
                    ),
                )
                .with_layer_option(
                    "SRID",
                    DriverOption::string(
                        "Force the SRID number of the SRS associated with the layer.",
                        "",
                    ),
                )
                .with_layer_option(
                    "COMPRESS_COLUMNS",
                    DriverOption::string(SQLITE_COMPRESS_COLUMNS_DOCS, ""),
                )
                .with_compulsory_encoding("UTF-8"),
        ),
        (
            "DXF",
            DriverMetadata::new("AutoCAD DXF", "AutoCAD DXF", "*.dxf", "dxf"),
        ),
        (
            "Geoconcept",
            DriverMetadata::new("Geoconcept", "Geoconcept", "*.gxt *.txt", "gxt").with_dataset_option(
                "EXTENSION",
                DriverOption::set(
                    "GeoConcept export file extension. TXT was used by earlier releases.",
                    &["GXT", "TXT"],
                    "GXT",
                    false,
                ),
            ),
        ),
        (
            "FileGDB",
            DriverMetadata::new("ESRI FileGDB", "ESRI FileGDB", "*.gdb", "gdb")
                .with_layer_option(
                    "FEATURE_DATASET",
                    DriverOption::string(
                        "Create the new layer inside the named FeatureDataset folder.",
                        "",
                    ),
                )
                .with_layer_option(
                    "GEOMETRY_NAME",
                    DriverOption::string("Name of the geometry column in the new layer.", "SHAPE"),
                )
                .with_layer_option(
                    "OID_NAME",
                    DriverOption::string("Name of the OID column to create.", "OBJECTID"),
                )
                .with_compulsory_encoding("UTF-8"),
        ),
        (
            "XLSX",
            DriverMetadata::new(
                "MS Office Open XML spreadsheet",
                "MS Office Open XML spreadsheet",
                "*.xlsx",
                "xlsx",
            )
            .with_layer_option(
                "OGR_XLSX_FIELD_TYPES",
                DriverOption::set(SPREADSHEET_FIELD_TYPES_DOCS, &["AUTO", "STRING"], "AUTO", false),
            )
            .with_compulsory_encoding("UTF-8"),
        ),
        (
            "ODS",
            DriverMetadata::new(
                "Open Document Spreadsheet",
                "Open Document Spreadsheet",
                "*.ods",
                "ods",
            )
            .with_layer_option(
                "OGR_ODS_FIELD_TYPES",
                DriverOption::set(SPREADSHEET_FIELD_TYPES_DOCS, &["AUTO", "STRING"], "AUTO", false),
            )
            .with_compulsory_encoding("UTF-8"),
        ),
    ];

    entries
        .into_iter()
        .map(|(key, meta)| (key.to_string(), meta))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_key_and_long_name() {
        let registry = DriverRegistry::new();
        assert_eq!(registry.lookup("ESRI"), registry.lookup("ESRI Shapefile"));
        assert_eq!(registry.lookup("GeoJ"), registry.lookup("GeoJSON"));
        assert_eq!(registry.lookup("KML").map(|m| m.ext.as_str()), Some("kml"));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = DriverRegistry::new();
        assert!(registry.lookup("esri").is_none());
        assert!(registry.lookup("DBF file").is_none());
        assert!(registry.lookup("DBF File").is_some());
    }

    #[test]
    fn test_lookup_table_order_tie_break() {
        // GML sorts before GeoJSON and its long name starts with "Geo".
        let registry = DriverRegistry::new();
        let meta = registry.lookup("Geo").unwrap();
        assert_eq!(meta.ext, "gml");
    }

    #[test]
    fn test_lookup_unknown_format() {
        let registry = DriverRegistry::new();
        assert!(registry.lookup("NoSuchFormat").is_none());
        assert!(registry.default_layer_options("NoSuchFormat").is_empty());
    }

    #[test]
    fn test_default_options_by_kind() {
        let registry = DriverRegistry::new();

        // Set with default, set without default, bools skipped.
        assert_eq!(
            registry.default_layer_options("CSV"),
            vec!["GEOMETRY=AS_XY".to_string(), "SEPARATOR=COMMA".to_string()]
        );

        // Strings always emit, even empty ones.
        assert_eq!(
            registry.default_layer_options("GPKG"),
            vec![
                "DESCRIPTION=".to_string(),
                "FID=fid".to_string(),
                "GEOMETRY_NAME=geometry".to_string(),
                "IDENTIFIER=".to_string(),
            ]
        );

        // Hidden options always emit their value.
        assert_eq!(
            registry.default_dataset_options("SQLite"),
            vec!["INIT_WITH_EPSG=NO".to_string(), "SPATIALITE=NO".to_string()]
        );
    }

    #[test]
    fn test_default_options_int() {
        let registry = DriverRegistry::new();
        assert_eq!(
            registry.default_dataset_options("BNA"),
            vec![
                "COORDINATE_PRECISION=10".to_string(),
                "NB_IDS=2".to_string(),
                "NB_PAIRS_PER_LINE=2".to_string(),
            ]
        );
    }

    #[test]
    fn test_compulsory_encoding() {
        let registry = DriverRegistry::new();
        assert_eq!(
            registry.lookup("GeoJSON").and_then(|m| m.compulsory_encoding.as_deref()),
            Some("UTF-8")
        );
        assert_eq!(
            registry.lookup("ESRI").and_then(|m| m.compulsory_encoding.as_deref()),
            None
        );
    }

    #[test]
    fn test_filter_for_driver() {
        let registry = DriverRegistry::new();
        assert_eq!(
            registry.filter_for_driver("GeoJSON"),
            "GeoJSON [OGR] (*.geojson *.GEOJSON)"
        );
        assert_eq!(
            registry.filter_for_driver("Geoconcept"),
            "Geoconcept [OGR] (*.gxt *.txt *.GXT *.TXT)"
        );
        assert_eq!(registry.filter_for_driver("Nope"), "");
    }

    #[test]
    fn test_extensions_from_glob() {
        let registry = DriverRegistry::new();
        let interlis = registry.lookup("Interlis 1").unwrap();
        assert_eq!(interlis.extensions(), vec!["itf", "xml", "ili"]);
    }

    #[test]
    fn test_injected_catalog() {
        let mut catalog = BTreeMap::new();
        catalog.insert(
            "Toy".to_string(),
            DriverMetadata::new("Toy Format", "Toy Format", "*.toy", "toy")
                .with_layer_option("LEVEL", DriverOption::int("Level", 3)),
        );
        let registry = DriverRegistry::from_catalog(catalog);
        assert_eq!(registry.default_layer_options("Toy F"), vec!["LEVEL=3".to_string()]);
        assert!(registry.lookup("GeoJSON").is_none());
    }

    #[test]
    fn test_option_display() {
        assert_eq!(DriverOption::bool("", true).to_string(), "YES");
        assert_eq!(
            DriverOption::set("", &["A", "B"], "A", true).to_string(),
            "A [A|B] (optional)"
        );
    }
}
