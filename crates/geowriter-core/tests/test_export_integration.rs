use std::fs;
use std::path::Path;
use std::sync::Arc;

use geo_types::{Rect, coord, polygon};
use geowriter_core::error::ErrorKind;
use geowriter_core::symbology::{
    CategorizedRenderer, Color, SimpleFillSymbolLayer, SimpleLineSymbolLayer, SymbologyExport,
};
use geowriter_core::{ExportOptions, Exporter};
use geowriter_core_common::{
    CoordinateTransform, DistanceUnit, Feature, Field, FieldType, FieldValue, Geometry,
    GeometryKind, GeometryType, MemoryLayer, OutputFieldType, ProviderKind, RenderUnit,
    SourceInfo, SpatialRef, Symbol, TransformError, Value,
};
use geowriter_driver_memory::{MemoryDriverConfig, MemoryDriverService};
use tempfile::TempDir;

fn square(x: f64, y: f64) -> Geometry {
    let polygon = polygon![
        (x: x, y: y),
        (x: x + 1.0, y: y),
        (x: x + 1.0, y: y + 1.0),
        (x: x, y: y + 1.0),
    ];
    Geometry::from_geo(&polygon.into()).unwrap()
}

fn parcels(count: i64) -> MemoryLayer {
    let features = (1..=count)
        .map(|id| {
            Feature::new(id)
                .with_attributes(vec![
                    Value::Int64(id * 10_000_000_000),
                    Value::String(format!("parcel {id}")),
                    Value::String(if id % 2 == 0 { "farm" } else { "forest" }.to_string()),
                ])
                .with_geometry(square(id as f64 * 10.0, 0.0))
        })
        .collect();

    MemoryLayer::new("parcels", GeometryType::xy(GeometryKind::Polygon))
        .with_fields(
            vec![
                Field::new("big", FieldType::Int64),
                Field::new("name", FieldType::String),
                Field::new("landuse", FieldType::String),
            ]
            .into(),
        )
        .with_crs(SpatialRef::from_wkt("PROJCS[\"local\"]", DistanceUnit::Meters))
        .with_features(features)
}

fn exporter(service: &MemoryDriverService) -> Exporter {
    Exporter::new(Arc::new(service.clone()))
}

struct FailOnFeature {
    destination: SpatialRef,
    bad_x: f64,
}

impl CoordinateTransform for FailOnFeature {
    fn destination_crs(&self) -> &SpatialRef {
        &self.destination
    }

    fn transform(&self, geometry: &Geometry) -> Result<Geometry, TransformError> {
        let rect = geometry.bounding_rect().unwrap();
        if (rect.min().x - self.bad_x).abs() < f64::EPSILON {
            return Err(TransformError::new("latitude or longitude exceeded limits"));
        }
        Ok(geometry.clone())
    }
}

#[test]
fn test_export_int64_round_trip() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let report = exporter(&service)
        .write_as_vector_format(&parcels(3), &dir.path().join("parcels"), &ExportOptions::new("GPKG"))
        .unwrap();

    assert_eq!(report.output_path, dir.path().join("parcels.gpkg"));
    assert_eq!(report.features_written, 3);

    let dataset = service.dataset(&report.output_path).unwrap();
    let layer = &dataset.layers[0];
    assert_eq!(layer.fields[0].field_type, OutputFieldType::Integer64);
    assert_eq!(layer.features[2].fields.get(&0), Some(&FieldValue::Integer64(30_000_000_000)));
    assert_eq!(layer.transactions_started, 1);
    assert_eq!(layer.transactions_committed, 1);
    assert!(dataset.closed);
}

#[test]
fn test_null_attribute_is_not_written() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let layer = MemoryLayer::new("t", GeometryType::NO_GEOMETRY)
        .with_fields(vec![Field::new("a", FieldType::Int), Field::new("b", FieldType::Int)].into())
        .with_features(vec![Feature::new(1).with_attributes(vec![Value::Null, Value::Int(2)])]);

    let report = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("t.csv"), &ExportOptions::new("CSV"))
        .unwrap();

    let features = service.features(&report.output_path);
    assert!(!features[0].fields.contains_key(&0));
    assert_eq!(features[0].fields.get(&1), Some(&FieldValue::Integer(2)));
    assert!(features[0].geometry.is_none());
}

#[test]
fn test_polygon_into_multipolygon_output() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let options = ExportOptions::new("GPKG").with_force_multi(true);
    let report = exporter(&service)
        .write_as_vector_format(&parcels(1), &dir.path().join("multi.gpkg"), &options)
        .unwrap();

    assert_eq!(report.geometry_type, GeometryType::xy(GeometryKind::MultiPolygon));
    let geometry = service.features(&report.output_path)[0].geometry.clone().unwrap();
    let stored = Geometry::from_wkb(geometry.wkb).unwrap();
    assert_eq!(stored.geometry_type(), GeometryType::xy(GeometryKind::MultiPolygon));
    match stored.to_geo().unwrap() {
        geo_types::Geometry::MultiPolygon(multi) => assert_eq!(multi.0.len(), 1),
        other => panic!("unexpected geometry {other:?}"),
    }
}

#[test]
fn test_error_cutoff_stops_export() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::new()
        .with_driver(MemoryDriverConfig::new("GPKG").with_fail_commit_when(|_| true));
    let layer = MemoryLayer::new("t", GeometryType::NO_GEOMETRY)
        .with_features((0..1100).map(Feature::new).collect());

    let err = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("t"), &ExportOptions::new("GPKG"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FeatureWriteFailed);
    let message = err.message();
    assert!(message.starts_with("Feature write errors:\nFeature creation error (OGR error: record rejected)"));
    assert!(message.ends_with("Stopping after 1001 errors"));
    assert!(!message.contains("Only"));
    assert_eq!(message.matches("record rejected").count(), 1001);
}

#[test]
fn test_partial_failure_summary() {
    let dir = TempDir::new().unwrap();
    let rejected = FieldValue::String(b"parcel 2".to_vec());
    let service = MemoryDriverService::new().with_driver(
        MemoryDriverConfig::new("GPKG")
            .with_transactions(true)
            .with_fail_commit_when(move |record| record.fields.get(&1) == Some(&rejected)),
    );

    let err = exporter(&service)
        .write_as_vector_format(&parcels(3), &dir.path().join("p"), &ExportOptions::new("GPKG"))
        .unwrap_err();

    assert_eq!(
        err.message(),
        "Feature write errors:\nFeature creation error (OGR error: record rejected)\nOnly 2 of 3 features written."
    );
    let dataset = service.dataset(&dir.path().join("p.gpkg")).unwrap();
    assert_eq!(dataset.layers[0].features.len(), 2);
    assert_eq!(dataset.layers[0].transactions_committed, 1);
}

#[test]
fn test_transform_failure_aborts_export() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let transform = FailOnFeature {
        destination: SpatialRef::from_wkt("GEOGCS[\"WGS 84\"]", DistanceUnit::Degrees),
        bad_x: 30.0,
    };
    let options = ExportOptions::new("GPKG").with_transform(Arc::new(transform));

    let err = exporter(&service)
        .write_as_vector_format(&parcels(5), &dir.path().join("p"), &options)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Projection);
    assert_eq!(
        err.message(),
        "Failed to transform a point while drawing a feature with ID '3'. Writing stopped. \
         (Exception: latitude or longitude exceeded limits)"
    );

    let dataset = service.dataset(&dir.path().join("p.gpkg")).unwrap();
    let layer = &dataset.layers[0];
    assert_eq!(layer.features.len(), 2);
    assert_eq!(layer.transactions_committed, 0);
    assert_eq!(layer.srs.as_ref().unwrap().wkt, "GEOGCS[\"WGS 84\"]");
    assert!(dataset.closed);
}

#[test]
fn test_sqlite_reserved_field_renamed() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let layer = MemoryLayer::new("t", GeometryType::NO_GEOMETRY)
        .with_fields(
            vec![
                Field::new("OGC_FID", FieldType::Int),
                Field::new("ogc_fid0", FieldType::Int),
            ]
            .into(),
        )
        .with_features(vec![
            Feature::new(1).with_attributes(vec![Value::Int(1), Value::Int(2)]),
            Feature::new(2).with_attributes(vec![Value::Int(3), Value::Int(4)]),
        ]);

    let report = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("t"), &ExportOptions::new("SQLite"))
        .unwrap();

    let dataset = service.dataset(&report.output_path).unwrap();
    let names: Vec<&str> = dataset.layers[0].fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["ogc_fid1", "ogc_fid0"]);
    assert_eq!(dataset.layers[0].features.len(), 2);
}

#[test]
fn test_refuses_to_overwrite_source() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("roads.gpkg");
    fs::write(&source, b"source").unwrap();

    let service = MemoryDriverService::standard();
    let layer = parcels(1).with_source(SourceInfo {
        provider: ProviderKind::Ogr,
        path: Some(source.clone()),
        storage_type: "GPKG".to_string(),
    });

    let aliased = dir.path().join(".").join("roads.gpkg");
    let err = exporter(&service)
        .write_as_vector_format(&layer, &aliased, &ExportOptions::new("GPKG"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CreateDataSource);
    assert_eq!(err.message(), "Cannot overwrite a OGR layer in place");
    assert!(service.dataset_paths().is_empty());
    assert_eq!(fs::read(&source).unwrap(), b"source");
}

#[test]
fn test_extent_filter_and_selection() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let extent = Rect::new(coord! { x: 15.0, y: -1.0 }, coord! { x: 35.0, y: 2.0 });

    let report = exporter(&service)
        .write_as_vector_format(
            &parcels(5),
            &dir.path().join("a"),
            &ExportOptions::new("GPKG").with_filter_extent(extent),
        )
        .unwrap();
    assert_eq!(report.features_written, 2);
    assert_eq!(report.features_filtered, 3);

    let selected = parcels(5).with_selection([1, 4]);
    let report = exporter(&service)
        .write_as_vector_format(
            &selected,
            &dir.path().join("b"),
            &ExportOptions::new("GPKG").with_only_selected(true),
        )
        .unwrap();
    let names: Vec<Option<FieldValue>> = service
        .features(&report.output_path)
        .into_iter()
        .map(|f| f.fields.get(&1).cloned())
        .collect();
    assert_eq!(
        names,
        vec![
            Some(FieldValue::String(b"parcel 1".to_vec())),
            Some(FieldValue::String(b"parcel 4".to_vec())),
        ]
    );
}

#[test]
fn test_attribute_subset_and_skip() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();

    let report = exporter(&service)
        .write_as_vector_format(
            &parcels(2),
            &dir.path().join("subset"),
            &ExportOptions::new("GPKG").with_attributes(vec![2, 1]),
        )
        .unwrap();
    let dataset = service.dataset(&report.output_path).unwrap();
    let names: Vec<&str> = dataset.layers[0].fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["landuse", "name"]);
    assert_eq!(
        dataset.layers[0].features[0].fields.get(&0),
        Some(&FieldValue::String(b"forest".to_vec()))
    );

    let report = exporter(&service)
        .write_as_vector_format(
            &parcels(2),
            &dir.path().join("bare"),
            &ExportOptions::new("GPKG").with_skip_attribute_creation(true),
        )
        .unwrap();
    let dataset = service.dataset(&report.output_path).unwrap();
    assert!(dataset.layers[0].fields.is_empty());
    assert!(dataset.layers[0].features.iter().all(|f| f.fields.is_empty()));
}

#[test]
fn test_shapefile_source_with_multi_parts() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let mut layer = parcels(2).with_source(SourceInfo {
        provider: ProviderKind::Ogr,
        path: None,
        storage_type: "ESRI Shapefile".to_string(),
    });
    layer.push(Feature::new(3).with_geometry(square(50.0, 0.0).to_multi()));

    let report = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("mixed"), &ExportOptions::new("ESRI Shapefile"))
        .unwrap();

    assert_eq!(report.output_path, dir.path().join("mixed.shp"));
    assert_eq!(report.geometry_type, GeometryType::xy(GeometryKind::MultiPolygon));
    let features = service.features(&report.output_path);
    assert_eq!(features.len(), 3);
    assert!(
        features
            .iter()
            .all(|f| f.geometry.as_ref().unwrap().geometry_type.kind == GeometryKind::MultiPolygon)
    );
    assert!(dir.path().join("mixed.qpj").exists());
}

#[test]
fn test_shapefile_storage_without_ogr_provider_is_not_scanned() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let mut layer = parcels(2).with_source(SourceInfo {
        provider: ProviderKind::Memory,
        path: None,
        storage_type: "ESRI Shapefile".to_string(),
    });
    layer.push(Feature::new(3).with_geometry(square(50.0, 0.0).to_multi()));

    let report = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("single"), &ExportOptions::new("ESRI Shapefile"))
        .unwrap();

    assert_eq!(report.geometry_type, GeometryType::xy(GeometryKind::Polygon));
    let dataset = service.dataset(&report.output_path).unwrap();
    assert_eq!(dataset.layers[0].geometry_type, GeometryType::xy(GeometryKind::Polygon));
}

#[test]
fn test_spatialite_int64_downgrade() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let source = SourceInfo {
        provider: ProviderKind::Spatialite,
        path: None,
        storage_type: "SQLite".to_string(),
    };
    let layer = MemoryLayer::new("t", GeometryType::NO_GEOMETRY)
        .with_fields(vec![Field::new("small", FieldType::Int64), Field::new("large", FieldType::Int64)].into())
        .with_source(source)
        .with_features(vec![
            Feature::new(1).with_attributes(vec![Value::Int64(-5), Value::Int64(1)]),
            Feature::new(2).with_attributes(vec![Value::Int64(70_000), Value::Int64(i64::from(i32::MAX))]),
        ]);

    let report = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("t"), &ExportOptions::new("GPKG"))
        .unwrap();

    let dataset = service.dataset(&report.output_path).unwrap();
    let types: Vec<OutputFieldType> = dataset.layers[0].fields.iter().map(|f| f.field_type).collect();
    assert_eq!(types, [OutputFieldType::Integer, OutputFieldType::Integer64]);
}

fn landuse_renderer(levels: bool) -> CategorizedRenderer {
    let farm = Symbol::new("farm", RenderUnit::Millimeters)
        .with_layer(Arc::new(
            SimpleFillSymbolLayer::new(Color::rgb(255, 255, 0), Color::rgb(0, 0, 0), 0.26).with_rendering_pass(1),
        ))
        .with_layer(Arc::new(
            SimpleLineSymbolLayer::new(Color::rgb(255, 0, 0), 0.5).with_rendering_pass(2),
        ));
    let forest = Symbol::new("forest", RenderUnit::Millimeters).with_layer(Arc::new(
        SimpleFillSymbolLayer::new(Color::rgb(0, 128, 0), Color::rgb(0, 0, 0), 0.26),
    ));

    CategorizedRenderer::new("landuse")
        .with_category(Value::String("farm".to_string()), farm)
        .with_category(Value::String("forest".to_string()), forest)
        .with_symbol_levels(levels)
}

fn styles(service: &MemoryDriverService, path: &Path) -> Vec<String> {
    service
        .features(path)
        .into_iter()
        .map(|f| f.style.unwrap_or_default())
        .collect()
}

#[test]
fn test_feature_symbology_adds_renderer_attributes() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let layer = parcels(2).with_renderer(Arc::new(landuse_renderer(false)));
    let options = ExportOptions::new("GPKG")
        .with_attributes(vec![1])
        .with_symbology(SymbologyExport::FeatureSymbology, 1.0);

    let report = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("styled"), &options)
        .unwrap();

    let dataset = service.dataset(&report.output_path).unwrap();
    let names: Vec<&str> = dataset.layers[0].fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["name", "landuse"]);
    assert_eq!(
        styles(&service, &report.output_path),
        [
            "BRUSH(fc:#008000);PEN(c:#000000,w:0.26mm)",
            "BRUSH(fc:#ffff00);PEN(c:#000000,w:0.26mm);PEN(c:#ff0000,w:0.5mm)",
        ]
    );
}

#[test]
fn test_symbol_layer_symbology_writes_one_record_per_layer() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let layer = parcels(2).with_renderer(Arc::new(landuse_renderer(false)));
    let options = ExportOptions::new("GPKG").with_symbology(SymbologyExport::SymbolLayerSymbology, 1.0);

    let report = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("layers"), &options)
        .unwrap();

    assert_eq!(report.features_written, 2);
    assert_eq!(
        styles(&service, &report.output_path),
        [
            "BRUSH(fc:#008000);PEN(c:#000000,w:0.26mm)",
            "BRUSH(fc:#ffff00);PEN(c:#000000,w:0.26mm)",
            "PEN(c:#ff0000,w:0.5mm)",
        ]
    );
}

#[test]
fn test_symbol_levels_write_in_level_order() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let layer = parcels(4).with_renderer(Arc::new(landuse_renderer(true)));
    let options = ExportOptions::new("GPKG").with_symbology(SymbologyExport::SymbolLayerSymbology, 1.0);

    let report = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("levels"), &options)
        .unwrap();

    assert_eq!(report.features_written, 6);
    let records = service.features(&report.output_path);
    let order: Vec<(String, String)> = records
        .iter()
        .map(|f| {
            let name = match f.fields.get(&1) {
                Some(FieldValue::String(bytes)) => String::from_utf8(bytes.clone()).unwrap(),
                _ => String::new(),
            };
            (name, f.style.clone().unwrap_or_default())
        })
        .collect();

    let forest = "BRUSH(fc:#008000);PEN(c:#000000,w:0.26mm)".to_string();
    let farm_fill = "BRUSH(fc:#ffff00);PEN(c:#000000,w:0.26mm)".to_string();
    let farm_line = "PEN(c:#ff0000,w:0.5mm)".to_string();
    assert_eq!(
        order,
        vec![
            ("parcel 1".to_string(), forest.clone()),
            ("parcel 3".to_string(), forest),
            ("parcel 2".to_string(), farm_fill.clone()),
            ("parcel 4".to_string(), farm_fill),
            ("parcel 2".to_string(), farm_line.clone()),
            ("parcel 4".to_string(), farm_line),
        ]
    );
}

#[test]
fn test_symbol_levels_skip_symbols_without_features() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let layer = parcels(1).with_renderer(Arc::new(landuse_renderer(true)));
    let options = ExportOptions::new("GPKG").with_symbology(SymbologyExport::SymbolLayerSymbology, 1.0);

    let report = exporter(&service)
        .write_as_vector_format(&layer, &dir.path().join("forest_only"), &options)
        .unwrap();

    assert_eq!(report.features_written, 1);
    assert_eq!(
        styles(&service, &report.output_path),
        ["BRUSH(fc:#008000);PEN(c:#000000,w:0.26mm)"]
    );
}

#[test]
fn test_missing_driver_is_reported() {
    let dir = TempDir::new().unwrap();
    let service = MemoryDriverService::standard();
    let err = exporter(&service)
        .write_as_vector_format(&parcels(1), &dir.path().join("x"), &ExportOptions::new("KML"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DriverNotFound);
    assert!(err.message().starts_with("OGR driver for 'KML' not found (OGR error: "));
}
