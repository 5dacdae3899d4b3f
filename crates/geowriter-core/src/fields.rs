//! Field/type mapping between layer schemas and driver field definitions.
//!
//! Each input [`Field`] is mapped onto an [`OutputFieldType`] with width and
//! precision adjusted to what OGR-style drivers accept. The mapping depends
//! on the driver: 64-bit integers are downgraded when the driver cannot store
//! them, and shapefiles store times as text.

use std::collections::{BTreeMap, BTreeSet};

use geowriter_core_common::{
    Dataset, Driver, Field, FieldDefinition, FieldType, Fields, LayerId, OutputFieldType, Value,
};
use log::{debug, info};

use crate::error::{Result, WriterError};

/// Driver name of the shapefile family.
pub const SHAPEFILE_DRIVER: &str = "ESRI Shapefile";

/// Driver name of SQLite and SpatiaLite outputs.
pub const SQLITE_DRIVER: &str = "SQLite";

/// Name SQLite reserves for its feature id column.
const RESERVED_FID_NAME: &str = "ogc_fid";

/// Hook that rewrites field definitions and values during export.
///
/// The converter sees every field before its output definition is derived,
/// and every non-null value before it is handed to the driver.
pub trait FieldValueConverter: Send + Sync {
    /// Returns the definition to export in place of `field`.
    fn field_definition(&self, field: &Field) -> Field {
        field.clone()
    }

    /// Converts the value of the input field at `field_index`.
    fn convert(&self, _field_index: usize, value: &Value) -> Value {
        value.clone()
    }
}

/// Derives the driver field definition for `field`.
///
/// The width starts at the field length, plus one when the precision is
/// positive, and is then clamped per type.
///
/// # Errors
///
/// Returns [`WriterError::AttributeTypeUnsupported`] for types that have no
/// output equivalent.
///
/// # Examples
///
/// ```
/// use geowriter_core::fields::target_definition;
/// use geowriter_core_common::{Field, FieldType, OutputFieldType};
///
/// let name = Field::new("name", FieldType::String).with_length(300);
/// let definition = target_definition(&name, "ESRI Shapefile", &OutputFieldType::ALL).unwrap();
/// assert_eq!(definition.field_type, OutputFieldType::String);
/// assert_eq!(definition.width, Some(255));
/// ```
pub fn target_definition(
    field: &Field,
    driver_name: &str,
    creation_types: &[OutputFieldType],
) -> Result<FieldDefinition> {
    let mut width = field.length;
    let mut precision = field.precision;
    if precision > 0 {
        width += 1;
    }
    let shapefile = driver_name == SHAPEFILE_DRIVER;

    let field_type = match field.field_type {
        FieldType::Int64 => {
            if creation_types.contains(&OutputFieldType::Integer64) {
                width = clamp_width(width, 20);
                precision = 0;
                OutputFieldType::Integer64
            } else if creation_types.contains(&OutputFieldType::Real) {
                width = clamp_width(width, 20);
                precision = 0;
                OutputFieldType::Real
            } else {
                width = clamp_width(width, 21);
                precision = -1;
                OutputFieldType::String
            }
        },
        FieldType::String => {
            width = clamp_width(width, 255);
            OutputFieldType::String
        },
        FieldType::Int => {
            width = clamp_width(width, 10);
            precision = 0;
            OutputFieldType::Integer
        },
        FieldType::Double => OutputFieldType::Real,
        FieldType::Date => OutputFieldType::Date,
        FieldType::Time if shapefile => {
            width = 12;
            OutputFieldType::String
        },
        FieldType::Time => OutputFieldType::Time,
        FieldType::DateTime if shapefile => {
            width = 24;
            OutputFieldType::String
        },
        FieldType::DateTime => OutputFieldType::DateTime,
        FieldType::Bool | FieldType::Binary => {
            return Err(WriterError::AttributeTypeUnsupported {
                message: format!("unsupported type for field {}", field.name),
            });
        },
    };

    Ok(FieldDefinition {
        name: field.name.clone(),
        field_type,
        width: u32::try_from(width).ok().filter(|w| *w > 0),
        precision: u32::try_from(precision).ok(),
    })
}

fn clamp_width(width: i32, max: i32) -> i32 {
    if width > 0 && width <= max { width } else { max }
}

/// Renames the SQLite reserved `ogc_fid` column.
///
/// For the SQLite driver a field called `ogc_fid` (in any case) becomes the
/// first of `ogc_fid0` to `ogc_fid9` that no field of `schema` uses. Other
/// names and drivers pass through unchanged.
///
/// # Errors
///
/// Returns [`WriterError::AttributeCreationFailed`] when all ten
/// replacements are taken.
pub fn replace_reserved_name(name: &str, driver_name: &str, schema: &Fields) -> Result<String> {
    if driver_name != SQLITE_DRIVER || !name.eq_ignore_ascii_case(RESERVED_FID_NAME) {
        return Ok(name.to_string());
    }

    let replacement = (0..10)
        .map(|i| format!("{RESERVED_FID_NAME}{i}"))
        .find(|candidate| {
            !schema
                .iter()
                .any(|field| field.name.eq_ignore_ascii_case(candidate))
        })
        .ok_or_else(|| WriterError::AttributeCreationFailed {
            message: "no available replacement for internal fieldname ogc_fid found".to_string(),
        })?;

    info!("Reserved attribute name ogc_fid replaced with {replacement}");
    Ok(replacement)
}

/// Creates every field of `fields` on `layer` and returns the mapping from
/// input field index to output field index.
///
/// Drivers may launder or truncate names, so the created field is looked up
/// by name and, when that fails or hits an index already claimed by an
/// earlier field, assumed to be the last field of the layer.
///
/// # Errors
///
/// * [`WriterError::AttributeTypeUnsupported`] for unmappable types
/// * [`WriterError::AttributeCreationFailed`] when the driver rejects a
///   field, no `ogc_fid` replacement is free, or the created field cannot
///   be located
pub fn create_fields(
    dataset: &mut dyn Dataset,
    layer: LayerId,
    driver: &dyn Driver,
    fields: &Fields,
    converter: Option<&dyn FieldValueConverter>,
) -> Result<BTreeMap<usize, usize>> {
    debug!("Creating {} fields", fields.len());

    let mut mapping = BTreeMap::new();
    let mut claimed = BTreeSet::new();

    for (index, original) in fields.iter().enumerate() {
        let field = match converter {
            Some(converter) => converter.field_definition(original),
            None => original.clone(),
        };

        let mut definition = target_definition(&field, driver.name(), driver.creation_field_types())?;
        definition.name = replace_reserved_name(&field.name, driver.name(), fields)?;

        debug!(
            "Creating field {} type {} width {:?} precision {:?}",
            field.name, definition.field_type, definition.width, definition.precision
        );
        dataset
            .create_field(layer, &definition)
            .map_err(|e| WriterError::AttributeCreationFailed {
                message: format!("creation of field {} failed (OGR error: {e})", field.name),
            })?;

        let output_index = match dataset.field_index(layer, &definition.name) {
            Some(found) if !claimed.contains(&found) => found,
            _ => dataset.field_count(layer).checked_sub(1).ok_or_else(|| {
                WriterError::AttributeCreationFailed {
                    message: format!(
                        "created field {} not found (OGR error: no fields in layer)",
                        field.name
                    ),
                }
            })?,
        };
        debug!("Returned field index for {}: {output_index}", definition.name);

        claimed.insert(output_index);
        mapping.insert(index, output_index);
    }

    debug!("Done creating fields");
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn define(field: Field, driver: &str) -> FieldDefinition {
        target_definition(&field, driver, &OutputFieldType::ALL).unwrap()
    }

    #[test]
    fn test_int64_downgrades() {
        let field = Field::new("big", FieldType::Int64).with_length(25);
        let with_int64 = define(field.clone(), "GPKG");
        assert_eq!(with_int64.field_type, OutputFieldType::Integer64);
        assert_eq!(with_int64.width, Some(20));
        assert_eq!(with_int64.precision, Some(0));

        let real_only = target_definition(&field, "MapInfo File", &[OutputFieldType::Real]).unwrap();
        assert_eq!(real_only.field_type, OutputFieldType::Real);
        assert_eq!(real_only.width, Some(20));

        let string_only = target_definition(&field, "X", &[OutputFieldType::String]).unwrap();
        assert_eq!(string_only.field_type, OutputFieldType::String);
        assert_eq!(string_only.width, Some(21));
        assert_eq!(string_only.precision, None);
    }

    #[test]
    fn test_widths_and_precisions() {
        let int = define(Field::new("n", FieldType::Int).with_length(12), "GPKG");
        assert_eq!((int.width, int.precision), (Some(10), Some(0)));

        let int = define(Field::new("n", FieldType::Int).with_length(4), "GPKG");
        assert_eq!(int.width, Some(4));

        let text = define(Field::new("s", FieldType::String), "GPKG");
        assert_eq!(text.width, Some(255));

        let real = define(
            Field::new("d", FieldType::Double).with_length(10).with_precision(3),
            "GPKG",
        );
        assert_eq!(real.field_type, OutputFieldType::Real);
        assert_eq!((real.width, real.precision), (Some(11), Some(3)));

        let unset = define(Field::new("d", FieldType::Double).with_precision(-1), "GPKG");
        assert_eq!((unset.width, unset.precision), (None, None));
    }

    #[test]
    fn test_temporal_types_on_shapefiles() {
        let time = define(Field::new("t", FieldType::Time), SHAPEFILE_DRIVER);
        assert_eq!((time.field_type, time.width), (OutputFieldType::String, Some(12)));

        let datetime = define(Field::new("t", FieldType::DateTime), SHAPEFILE_DRIVER);
        assert_eq!(
            (datetime.field_type, datetime.width),
            (OutputFieldType::String, Some(24))
        );

        assert_eq!(
            define(Field::new("t", FieldType::Time), "GPKG").field_type,
            OutputFieldType::Time
        );
        assert_eq!(
            define(Field::new("d", FieldType::Date), SHAPEFILE_DRIVER).field_type,
            OutputFieldType::Date
        );
    }

    #[test]
    fn test_unsupported_types() {
        let err = target_definition(&Field::new("flag", FieldType::Bool), "GPKG", &OutputFieldType::ALL)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeTypeUnsupported);
        assert_eq!(err.message(), "unsupported type for field flag");
    }

    #[test]
    fn test_reserved_name_replacement() {
        let schema: Fields = vec![
            Field::new("OGC_FID", FieldType::Int),
            Field::new("ogc_fid0", FieldType::Int),
            Field::new("OGC_FID1", FieldType::Int),
        ]
        .into();
        assert_eq!(
            replace_reserved_name("OGC_FID", SQLITE_DRIVER, &schema).unwrap(),
            "ogc_fid2"
        );
        assert_eq!(replace_reserved_name("OGC_FID", "GPKG", &schema).unwrap(), "OGC_FID");
        assert_eq!(replace_reserved_name("name", SQLITE_DRIVER, &schema).unwrap(), "name");
    }

    #[test]
    fn test_reserved_name_exhausted() {
        let mut schema: Fields = (0..10)
            .map(|i| Field::new(format!("ogc_fid{i}"), FieldType::Int))
            .collect();
        schema.push(Field::new("ogc_fid", FieldType::Int));
        let err = replace_reserved_name("ogc_fid", SQLITE_DRIVER, &schema).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeCreationFailed);
    }
}
