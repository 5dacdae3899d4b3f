//! Serialization of output records into `GeoJSON` features.

use geo::{BoundingRect, MapCoordsInPlace};
use geo_types::Coord;
use geojson::feature::Id;
use geojson::{Feature, JsonObject, JsonValue};
use geowriter_core_common::{
    DateTimeParts, DriverError, FieldDefinition, FieldValue, Geometry, OutputFeature,
    OutputFieldType, OutputGeometry, SpatialRef,
};
use serde_json::Number;

/// Layer creation options understood by the `GeoJSON` driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoJsonWriterOptions {
    /// Maximum number of decimals written per coordinate
    pub coordinate_precision: Option<usize>,
    /// Write a `bbox` member on every feature
    pub write_bbox: bool,
}

impl GeoJsonWriterOptions {
    /// Create new writer options with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coordinate precision
    #[must_use]
    pub fn with_coordinate_precision(mut self, precision: usize) -> Self {
        self.coordinate_precision = Some(precision);
        self
    }

    /// Set whether bounding boxes are written
    #[must_use]
    pub fn with_write_bbox(mut self, write_bbox: bool) -> Self {
        self.write_bbox = write_bbox;
        self
    }

    /// Parses `KEY=value` layer creation options. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error for values that do not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use geowriter_driver_geojson::GeoJsonWriterOptions;
    ///
    /// let options = GeoJsonWriterOptions::from_layer_options(&[
    ///     "COORDINATE_PRECISION=3".to_string(),
    ///     "write_bbox=yes".to_string(),
    /// ])
    /// .unwrap();
    /// assert_eq!(options.coordinate_precision, Some(3));
    /// assert!(options.write_bbox);
    /// ```
    pub fn from_layer_options(options: &[String]) -> Result<Self, DriverError> {
        let mut parsed = Self::default();
        for option in options {
            let Some((key, value)) = option.split_once('=') else {
                continue;
            };
            match key.to_ascii_uppercase().as_str() {
                "COORDINATE_PRECISION" => {
                    let precision = value.trim().parse::<usize>().map_err(|e| {
                        DriverError::failed(format!("invalid COORDINATE_PRECISION '{value}': {e}"))
                    })?;
                    parsed.coordinate_precision = Some(precision);
                },
                "WRITE_BBOX" => {
                    parsed.write_bbox = parse_bool(value).ok_or_else(|| {
                        DriverError::failed(format!("invalid WRITE_BBOX '{value}'"))
                    })?;
                },
                _ => {},
            }
        }
        Ok(parsed)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_uppercase().as_str() {
        "YES" | "TRUE" | "ON" | "1" => Some(true),
        "NO" | "FALSE" | "OFF" | "0" => Some(false),
        _ => None,
    }
}

/// Legacy `crs` member for references other than WGS 84.
///
/// Only references with an `AUTHORITY:CODE` identifier are described.
#[must_use]
pub fn crs_member(srs: &SpatialRef) -> Option<JsonValue> {
    let auth_id = srs.auth_id.as_deref()?;
    if auth_id.eq_ignore_ascii_case("EPSG:4326") {
        return None;
    }
    let (authority, code) = auth_id.split_once(':')?;
    Some(serde_json::json!({
        "type": "name",
        "properties": { "name": format!("urn:ogc:def:crs:{authority}::{code}") },
    }))
}

/// Converts a field value into its JSON property value.
///
/// Text is decoded as UTF-8, replacing invalid sequences. Non-finite reals
/// become `null`.
#[must_use]
pub fn field_value_to_json(field_type: OutputFieldType, value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Integer(v) => JsonValue::from(*v),
        FieldValue::Integer64(v) => JsonValue::from(*v),
        FieldValue::Real(v) => Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
        FieldValue::String(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        FieldValue::DateTime(parts) => JsonValue::String(format_parts(field_type, parts)),
    }
}

fn format_parts(field_type: OutputFieldType, parts: &DateTimeParts) -> String {
    let date = format!("{:04}-{:02}-{:02}", parts.year, parts.month, parts.day);
    let time = format!("{:02}:{:02}:{:02}", parts.hour, parts.minute, parts.second);
    match field_type {
        OutputFieldType::Date => date,
        OutputFieldType::Time => time,
        _ => format!("{date}T{time}"),
    }
}

/// An empty point carries NaN ordinates; any other empty geometry a zero
/// member count right after the header.
fn is_empty_wkb(wkb: &[u8]) -> bool {
    let body = wkb.get(5..).unwrap_or_default();
    if body.len() == 4 {
        return body == [0, 0, 0, 0];
    }
    let little_endian = wkb.first() == Some(&1);
    body.len() % 8 == 0
        && !body.is_empty()
        && body.chunks_exact(8).all(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            let value = if little_endian {
                f64::from_le_bytes(bytes)
            } else {
                f64::from_be_bytes(bytes)
            };
            value.is_nan()
        })
}

fn round_to(value: f64, precision: usize) -> f64 {
    format!("{value:.precision$}").parse().unwrap_or(value)
}

/// Converts an imported geometry. Empty geometries become `None`.
///
/// # Errors
///
/// Returns an error when the WKB cannot be decoded.
pub fn geometry_to_json(
    geometry: &OutputGeometry,
    options: &GeoJsonWriterOptions,
) -> Result<Option<(geojson::Geometry, Option<Vec<f64>>)>, DriverError> {
    let parsed = Geometry::from_wkb(geometry.wkb.clone()).map_err(|e| DriverError::failed(e.to_string()))?;
    if is_empty_wkb(parsed.wkb()) {
        return Ok(None);
    }

    let mut decoded = parsed.to_geo().map_err(|e| DriverError::failed(e.to_string()))?;
    if let Some(precision) = options.coordinate_precision {
        decoded.map_coords_in_place(|c| Coord {
            x: round_to(c.x, precision),
            y: round_to(c.y, precision),
        });
    }

    let bbox = if options.write_bbox {
        decoded
            .bounding_rect()
            .map(|rect| vec![rect.min().x, rect.min().y, rect.max().x, rect.max().y])
    } else {
        None
    };

    Ok(Some((geojson::Geometry::new(geojson::Value::from(&decoded)), bbox)))
}

/// Builds the `GeoJSON` feature for `record` using the layer schema `fields`.
///
/// # Errors
///
/// Returns an error when a value refers to an unknown field or the geometry
/// cannot be decoded.
pub fn record_to_feature(
    record: &OutputFeature,
    fields: &[FieldDefinition],
    options: &GeoJsonWriterOptions,
) -> Result<Feature, DriverError> {
    let mut properties = JsonObject::new();
    for field in fields {
        properties.insert(field.name.clone(), JsonValue::Null);
    }
    for (&index, value) in &record.fields {
        let field = fields
            .get(index)
            .ok_or_else(|| DriverError::failed(format!("no field at index {index}")))?;
        properties.insert(field.name.clone(), field_value_to_json(field.field_type, value));
    }

    let (geometry, bbox) = match &record.geometry {
        Some(geometry) => geometry_to_json(geometry, options)?.map_or((None, None), |(g, b)| (Some(g), b)),
        None => (None, None),
    };

    Ok(Feature {
        bbox,
        geometry,
        id: record.fid.map(|fid| Id::Number(Number::from(fid))),
        properties: Some(properties),
        foreign_members: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geowriter_core_common::{DistanceUnit, GeometryKind, GeometryType};

    fn definition(name: &str, field_type: OutputFieldType) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            field_type,
            width: None,
            precision: None,
        }
    }

    fn point(x: f64, y: f64) -> OutputGeometry {
        let geometry = Geometry::from_geo(&geo_types::Point::new(x, y).into()).unwrap();
        OutputGeometry {
            geometry_type: geometry.geometry_type(),
            wkb: geometry.into_wkb(),
        }
    }

    #[test]
    fn test_invalid_options() {
        assert!(GeoJsonWriterOptions::from_layer_options(&["COORDINATE_PRECISION=x".to_string()]).is_err());
        assert!(GeoJsonWriterOptions::from_layer_options(&["WRITE_BBOX=maybe".to_string()]).is_err());
        assert_eq!(
            GeoJsonWriterOptions::from_layer_options(&["FOO=1".to_string(), "BARE".to_string()]).unwrap(),
            GeoJsonWriterOptions::default()
        );
    }

    #[test]
    fn test_crs_member() {
        let wgs84 = SpatialRef::from_wkt("GEOGCS[...]", DistanceUnit::Degrees).with_auth_id("EPSG:4326");
        assert!(crs_member(&wgs84).is_none());

        let mercator = SpatialRef::from_wkt("PROJCS[...]", DistanceUnit::Meters).with_auth_id("EPSG:3857");
        assert_eq!(
            crs_member(&mercator).unwrap()["properties"]["name"],
            "urn:ogc:def:crs:EPSG::3857"
        );
    }

    #[test]
    fn test_temporal_values() {
        let parts = DateTimeParts {
            year: 2016,
            month: 3,
            day: 7,
            hour: 9,
            minute: 5,
            second: 1,
        };
        let value = FieldValue::DateTime(parts);
        assert_eq!(field_value_to_json(OutputFieldType::Date, &value), "2016-03-07");
        assert_eq!(field_value_to_json(OutputFieldType::Time, &value), "09:05:01");
        assert_eq!(
            field_value_to_json(OutputFieldType::DateTime, &value),
            "2016-03-07T09:05:01"
        );
        assert_eq!(
            field_value_to_json(OutputFieldType::Real, &FieldValue::Real(f64::NAN)),
            JsonValue::Null
        );
    }

    #[test]
    fn test_record_to_feature() {
        let fields = vec![
            definition("name", OutputFieldType::String),
            definition("pop", OutputFieldType::Integer64),
            definition("area", OutputFieldType::Real),
        ];
        let mut record = OutputFeature::new();
        record.set_field(0, FieldValue::String("Zürich".as_bytes().to_vec()));
        record.set_field(1, FieldValue::Integer64(421_878));
        record.geometry = Some(point(8.541_694_1, 47.376_887_3));
        record.fid = Some(3_000_000_000);

        let options = GeoJsonWriterOptions::new()
            .with_coordinate_precision(3)
            .with_write_bbox(true);
        let feature = record_to_feature(&record, &fields, &options).unwrap();

        let properties = feature.properties.as_ref().unwrap();
        assert_eq!(properties["name"], "Zürich");
        assert_eq!(properties["pop"], 421_878);
        assert_eq!(properties["area"], JsonValue::Null);
        assert_eq!(feature.bbox, Some(vec![8.542, 47.377, 8.542, 47.377]));
        assert_eq!(feature.id, Some(Id::Number(Number::from(3_000_000_000_i64))));
        assert_eq!(
            feature.geometry.unwrap().value,
            geojson::Value::Point(vec![8.542, 47.377])
        );
    }

    #[test]
    fn test_empty_geometry_is_null() {
        let empty = Geometry::empty(GeometryType::xy(GeometryKind::Polygon));
        let geometry = OutputGeometry {
            geometry_type: empty.geometry_type(),
            wkb: empty.into_wkb(),
        };
        assert!(geometry_to_json(&geometry, &GeoJsonWriterOptions::default()).unwrap().is_none());

        let empty_point = Geometry::empty(GeometryType::xy(GeometryKind::Point));
        assert!(is_empty_wkb(empty_point.wkb()));
        assert!(!is_empty_wkb(point(1.0, 2.0).wkb.as_slice()));
    }
}
