//! Display utilities for formatting CLI output.
//!
//! Row builders are kept separate from printing so the tables can be
//! checked without capturing standard output.

use std::collections::BTreeSet;

use tabled::{Table, Tabled};

use geowriter_core::drivers::{DriverMetadata, DriverRegistry, OptionScope};

/// Table row representation for displaying format metadata.
#[derive(Tabled)]
pub struct DriverRow {
    /// Catalog key of the format (e.g. `GeoJSON`, `ESRI`).
    #[tabled(rename = "Key")]
    pub key: String,
    /// Driver long name passed to the driver service.
    #[tabled(rename = "Long Name")]
    pub long_name: String,
    /// Space-separated list of file extensions.
    #[tabled(rename = "Extensions")]
    pub extensions: String,
    /// Encoding every dataset of this format is written with.
    #[tabled(rename = "Encoding")]
    pub encoding: String,
    /// Whether the built-in driver service can write this format.
    #[tabled(rename = "Write")]
    pub write: String,
}

/// Table row representation for displaying a creation option.
#[derive(Tabled)]
pub struct OptionRow {
    /// Option key.
    #[tabled(rename = "Option")]
    pub key: String,
    /// `Dataset` or `Layer`.
    #[tabled(rename = "Scope")]
    pub scope: String,
    /// Option kind (`Bool`, `Int`, `String`, `Set`, `Hidden`).
    #[tabled(rename = "Kind")]
    pub kind: String,
    /// Default value; sets also list their allowed values.
    #[tabled(rename = "Default")]
    pub default: String,
    /// Documentation text.
    #[tabled(rename = "Description")]
    pub docs: String,
}

/// Table row representation for displaying a file filter.
#[derive(Tabled)]
pub struct FilterRow {
    /// File dialog filter.
    #[tabled(rename = "Filter")]
    pub filter: String,
    /// Driver the filter selects.
    #[tabled(rename = "Driver")]
    pub driver: String,
}

/// Builds one row per catalog entry. `writable` holds the long names of the
/// formats the driver service can create.
pub fn driver_rows(registry: &DriverRegistry, writable: &BTreeSet<String>) -> Vec<DriverRow> {
    registry
        .entries()
        .map(|(key, meta)| DriverRow {
            key: key.to_string(),
            long_name: meta.long_name.clone(),
            extensions: meta.ext.clone(),
            encoding: meta
                .compulsory_encoding
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            write: if writable.contains(&meta.long_name) { "Yes" } else { "No" }.to_string(),
        })
        .collect()
}

/// Builds one row per creation option of `meta`, dataset options first.
pub fn option_rows(meta: &DriverMetadata) -> Vec<OptionRow> {
    [(OptionScope::Dataset, "Dataset"), (OptionScope::Layer, "Layer")]
        .into_iter()
        .flat_map(|(scope, label)| {
            meta.options(scope).iter().map(move |(key, option)| OptionRow {
                key: key.clone(),
                scope: label.to_string(),
                kind: option.kind_name().to_string(),
                default: option.to_string(),
                docs: option.docs().to_string(),
            })
        })
        .collect()
}

/// Prints the format catalog.
pub fn display_drivers(registry: &DriverRegistry, writable: &BTreeSet<String>) {
    let rows = driver_rows(registry, writable);
    println!("\nSupported Formats ({} total):\n", rows.len());
    println!("{}", Table::new(rows));
}

/// Prints the creation options of one format along with the default option
/// strings handed to the driver.
pub fn display_options(name: &str, meta: &DriverMetadata, dataset_defaults: &[String], layer_defaults: &[String]) {
    println!("\nFormat: {} ({name})", meta.tr_long_name);

    let rows = option_rows(meta);
    if rows.is_empty() {
        println!("\nNo creation options.");
    } else {
        println!("\n=== Creation Options ===");
        println!("{}", Table::new(rows));
    }

    println!("\nDefault dataset options: {}", dataset_defaults.join(" "));
    println!("Default layer options: {}", layer_defaults.join(" "));
}

/// Prints file filters and the combined filter string.
pub fn display_filters(rows: Vec<FilterRow>, filter_string: &str) {
    if rows.is_empty() {
        println!("\nNo writable formats.");
        return;
    }
    println!("\n{}", Table::new(rows));
    println!("\n{filter_string}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_rows_mark_writable_formats() {
        let registry = DriverRegistry::new();
        let writable = BTreeSet::from(["GeoJSON".to_string()]);
        let rows = driver_rows(&registry, &writable);

        let geojson = rows.iter().find(|row| row.key == "GeoJSON").unwrap();
        assert_eq!(geojson.write, "Yes");
        assert_eq!(geojson.encoding, "UTF-8");

        let csv = rows.iter().find(|row| row.key == "CSV").unwrap();
        assert_eq!(csv.write, "No");
        assert_eq!(csv.encoding, "-");
    }

    #[test]
    fn test_option_rows_list_dataset_then_layer() {
        let registry = DriverRegistry::new();
        let meta = registry.lookup("GeoJSON").unwrap();
        let rows = option_rows(meta);

        let precision = rows
            .iter()
            .find(|row| row.key == "COORDINATE_PRECISION")
            .unwrap();
        assert_eq!(precision.scope, "Layer");
        assert_eq!(precision.kind, "Int");
        assert_eq!(precision.default, "15");

        let first_layer = rows.iter().position(|row| row.scope == "Layer");
        let last_dataset = rows.iter().rposition(|row| row.scope == "Dataset");
        if let (Some(first_layer), Some(last_dataset)) = (first_layer, last_dataset) {
            assert!(last_dataset < first_layer);
        }
    }

    #[test]
    fn test_display_functions_run() {
        let registry = DriverRegistry::new();
        display_drivers(&registry, &BTreeSet::new());
        let meta = registry.lookup("CSV").unwrap();
        display_options("CSV", meta, &[], &[]);
        display_filters(Vec::new(), "");
    }
}
