use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use geo_types::{Point, Rect, coord};
use geojson::{FeatureCollection, GeoJson};
use geowriter_core::{ExportOptions, Exporter};
use geowriter_core_common::{
    DistanceUnit, Feature, Field, FieldType, Geometry, GeometryKind, GeometryType, MemoryLayer,
    SpatialRef, Value,
};
use geowriter_driver_geojson::{DRIVER_NAME, GeoJsonDriverService};
use serde_json::json;
use tempfile::TempDir;

fn stations() -> MemoryLayer {
    let rows = [
        (1, "Basel SBB", 7.589_563_2, 47.547_412_1, Some(1854)),
        (2, "Olten", 7.907_532_9, 47.351_931_4, None),
        (3, "Luzern", 8.310_173_4, 47.050_168_7, Some(1856)),
    ];
    let features = rows
        .iter()
        .map(|&(id, name, x, y, opened)| {
            let opened = opened.map_or(Value::Null, |year| {
                Value::Date(NaiveDate::from_ymd_opt(year, 6, 19).unwrap())
            });
            Feature::new(id)
                .with_attributes(vec![Value::String(name.to_string()), opened])
                .with_geometry(Geometry::from_geo(&Point::new(x, y).into()).unwrap())
        })
        .collect();

    MemoryLayer::new("stations", GeometryType::xy(GeometryKind::Point))
        .with_fields(
            vec![
                Field::new("name", FieldType::String),
                Field::new("opened", FieldType::Date),
            ]
            .into(),
        )
        .with_crs(SpatialRef::from_wkt("GEOGCS[\"WGS 84\"]", DistanceUnit::Degrees).with_auth_id("EPSG:4326"))
        .with_features(features)
}

fn read_collection(path: &Path) -> FeatureCollection {
    let text = fs::read_to_string(path).unwrap();
    FeatureCollection::try_from(text.parse::<GeoJson>().unwrap()).unwrap()
}

fn exporter() -> Exporter {
    Exporter::new(Arc::new(GeoJsonDriverService::new()))
}

#[test]
fn test_export_layer_to_geojson() {
    let dir = TempDir::new().unwrap();
    let report = exporter()
        .write_as_vector_format(&stations(), &dir.path().join("stations"), &ExportOptions::new(DRIVER_NAME))
        .unwrap();

    assert_eq!(report.output_path, dir.path().join("stations.geojson"));
    assert_eq!(report.features_written, 3);

    let collection = read_collection(&report.output_path);
    assert_eq!(collection.features.len(), 3);
    assert!(collection.foreign_members.as_ref().unwrap().get("crs").is_none());

    let basel = &collection.features[0];
    assert_eq!(basel.property("name"), Some(&json!("Basel SBB")));
    assert_eq!(basel.property("opened"), Some(&json!("1854-06-19")));
    assert_eq!(
        basel.geometry.as_ref().unwrap().value,
        geojson::Value::Point(vec![7.589_563_2, 47.547_412_1])
    );

    let olten = &collection.features[1];
    assert_eq!(olten.property("opened"), Some(&serde_json::Value::Null));
}

#[test]
fn test_layer_options_reach_driver() {
    let dir = TempDir::new().unwrap();
    let options = ExportOptions::new(DRIVER_NAME).with_layer_options(vec![
        "COORDINATE_PRECISION=2".to_string(),
        "WRITE_BBOX=YES".to_string(),
    ]);
    let report = exporter()
        .write_as_vector_format(&stations(), &dir.path().join("rounded.geojson"), &options)
        .unwrap();

    let collection = read_collection(&report.output_path);
    let luzern = &collection.features[2];
    assert_eq!(
        luzern.geometry.as_ref().unwrap().value,
        geojson::Value::Point(vec![8.31, 47.05])
    );
    assert_eq!(luzern.bbox, Some(vec![8.31, 47.05, 8.31, 47.05]));
}

#[test]
fn test_existing_file_is_replaced() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stations.geojson");
    fs::write(&path, "stale").unwrap();

    let extent = Rect::new(coord! { x: 7.5, y: 47.3 }, coord! { x: 8.0, y: 47.6 });
    let options = ExportOptions::new(DRIVER_NAME)
        .with_filter_extent(extent)
        .with_attributes(vec![0]);
    let report = exporter()
        .write_as_vector_format(&stations(), &path, &options)
        .unwrap();

    assert_eq!(report.features_written, 2);
    assert_eq!(report.features_filtered, 1);
    let collection = read_collection(&path);
    assert_eq!(collection.features.len(), 2);
    assert!(collection.features[0].property("opened").is_none());
}

#[test]
fn test_unknown_driver_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = exporter()
        .write_as_vector_format(&stations(), &dir.path().join("s.csv"), &ExportOptions::new("CSV"))
        .unwrap_err();
    assert_eq!(err.kind(), geowriter_core::ErrorKind::DriverNotFound);
}
