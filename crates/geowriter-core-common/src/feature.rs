//! Attribute schema, attribute values and features.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::geometry::Geometry;

/// Semantic type of an attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Int64,
    /// Double precision float
    Double,
    /// Text
    String,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time of day
    DateTime,
    /// Boolean flag
    Bool,
    /// Opaque byte blob
    Binary,
}

impl FieldType {
    /// Returns the display name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FieldType::Int => "Int",
            FieldType::Int64 => "Int64",
            FieldType::Double => "Double",
            FieldType::String => "String",
            FieldType::Date => "Date",
            FieldType::Time => "Time",
            FieldType::DateTime => "DateTime",
            FieldType::Bool => "Bool",
            FieldType::Binary => "Binary",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attribute field of a layer schema.
///
/// `length` and `precision` follow the usual provider conventions: zero or a
/// negative value means "unspecified".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Semantic type
    pub field_type: FieldType,
    /// Display width
    pub length: i32,
    /// Decimal precision
    pub precision: i32,
    /// Provider-specific type name (e.g. `"SDO_GEOMETRY"`)
    pub type_name: String,
}

impl Field {
    /// Creates a field with unspecified width and precision.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: 0,
            precision: 0,
            type_name: field_type.as_str().to_string(),
        }
    }

    /// Sets the display width.
    #[must_use]
    pub fn with_length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    /// Sets the decimal precision.
    #[must_use]
    pub fn with_precision(mut self, precision: i32) -> Self {
        self.precision = precision;
        self
    }

    /// Sets the provider type name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }
}

/// Ordered collection of fields. The position of a field is its index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<Field>);

impl Fields {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn push(&mut self, field: Field) {
        self.0.push(field);
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Field> {
        self.0.get(index)
    }

    /// Index of the field called `name` (exact match).
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|f| f.name == name)
    }

    /// Iterates over the fields in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.0.iter()
    }
}

impl From<Vec<Field>> for Fields {
    fn from(fields: Vec<Field>) -> Self {
        Self(fields)
    }
}

impl FromIterator<Field> for Fields {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value
    Null,
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Int64(i64),
    /// Double precision float
    Double(f64),
    /// Text
    String(String),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Date and time of day
    DateTime(NaiveDateTime),
    /// Boolean flag
    Bool(bool),
    /// Byte blob
    Binary(Vec<u8>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the runtime type carried by this value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Int(_) => "Int",
            Value::Int64(_) => "Int64",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::DateTime(_) => "DateTime",
            Value::Bool(_) => "Bool",
            Value::Binary(_) => "Binary",
        }
    }

    /// Numeric value widened to `i64`, for integer variants only.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Binary(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// One record of a vector layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Source-assigned identifier
    pub id: i64,
    /// Attribute values keyed by field index. May be shorter than the schema.
    pub attributes: Vec<Value>,
    /// Optional geometry
    pub geometry: Option<Geometry>,
}

impl Feature {
    /// Creates a feature without attributes or geometry.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            attributes: Vec::new(),
            geometry: None,
        }
    }

    /// Sets the attribute values.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Value at `index`; `None` when the index is past the attribute vector.
    #[must_use]
    pub fn attribute(&self, index: usize) -> Option<&Value> {
        self.attributes.get(index)
    }

    /// Drops every attribute value.
    pub fn clear_attributes(&mut self) {
        self.attributes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_index_of() {
        let fields: Fields = vec![
            Field::new("id", FieldType::Int),
            Field::new("name", FieldType::String).with_length(40),
        ]
        .into();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.index_of("name"), Some(1));
        assert_eq!(fields.index_of("NAME"), None);
        assert_eq!(fields.get(1).map(|f| f.length), Some(40));
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Int64(3).type_name(), "Int64");
        assert_eq!(Value::Bool(true).type_name(), "Bool");
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_value_as_i64() {
        assert_eq!(Value::Int(-4).as_i64(), Some(-4));
        assert_eq!(Value::Int64(1 << 40).as_i64(), Some(1 << 40));
        assert_eq!(Value::Double(1.0).as_i64(), None);
    }

    #[test]
    fn test_feature_attribute_past_end() {
        let feature = Feature::new(1).with_attributes(vec![Value::Int(1)]);
        assert_eq!(feature.attribute(0), Some(&Value::Int(1)));
        assert_eq!(feature.attribute(3), None);
    }
}
