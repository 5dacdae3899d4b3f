//! Geometry subtypes and well-known-binary geometries.
//!
//! Geometries travel through the export pipeline as ISO/OGR well-known binary
//! (WKB). The header of every buffer is parsed into a [`GeometryType`] so the
//! writer can reason about subtypes (plain vs. multi, 2D vs. 3D vs. measured)
//! without decoding coordinates. Decoding into `geo-types` is only needed for
//! spatial predicates and is delegated to `geozero`.

use std::fmt;

use geo::{BoundingRect, Intersects};
use geo_types::Rect;
use geozero::wkb::Wkb;
use geozero::{CoordDimensions, ToGeo, ToWkb, ToWkt};
use thiserror::Error;

/// OGR's legacy flag marking a 2.5D geometry type code.
const FLAG_25D: u32 = 0x8000_0000;

/// WKB type code used by OGR for layers without geometry.
const NO_GEOMETRY_CODE: u32 = 100;

/// Errors raised while parsing or converting WKB geometries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The buffer is too short to hold a WKB header.
    #[error("WKB buffer too short ({len} bytes)")]
    Truncated {
        /// Length of the rejected buffer
        len: usize,
    },

    /// The first byte is neither `0` (big endian) nor `1` (little endian).
    #[error("invalid WKB byte order marker {marker}")]
    ByteOrder {
        /// The offending marker byte
        marker: u8,
    },

    /// The header carries a type code this crate does not know.
    #[error("unknown WKB geometry type code {code}")]
    UnknownTypeCode {
        /// The raw type code
        code: u32,
    },

    /// Conversion to or from `geo-types` failed.
    #[error("geometry conversion failed: {message}")]
    Conversion {
        /// Message reported by the codec
        message: String,
    },
}

/// Shape kind of a geometry, independent of its dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryKind {
    /// Any geometry (OGR `wkbUnknown`).
    Unknown,
    /// Single point.
    Point,
    /// Single line string.
    LineString,
    /// Single polygon.
    Polygon,
    /// Collection of points.
    MultiPoint,
    /// Collection of line strings.
    MultiLineString,
    /// Collection of polygons.
    MultiPolygon,
    /// Heterogeneous collection.
    GeometryCollection,
    /// Attribute-only layer.
    NoGeometry,
}

impl GeometryKind {
    const fn base_code(self) -> u32 {
        match self {
            GeometryKind::Unknown => 0,
            GeometryKind::Point => 1,
            GeometryKind::LineString => 2,
            GeometryKind::Polygon => 3,
            GeometryKind::MultiPoint => 4,
            GeometryKind::MultiLineString => 5,
            GeometryKind::MultiPolygon => 6,
            GeometryKind::GeometryCollection => 7,
            GeometryKind::NoGeometry => NO_GEOMETRY_CODE,
        }
    }

    const fn from_base_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(GeometryKind::Unknown),
            1 => Some(GeometryKind::Point),
            2 => Some(GeometryKind::LineString),
            3 => Some(GeometryKind::Polygon),
            4 => Some(GeometryKind::MultiPoint),
            5 => Some(GeometryKind::MultiLineString),
            6 => Some(GeometryKind::MultiPolygon),
            7 => Some(GeometryKind::GeometryCollection),
            _ => None,
        }
    }

    /// Returns `true` for collection kinds, geometry collections included.
    #[must_use]
    pub const fn is_multi(self) -> bool {
        matches!(
            self,
            GeometryKind::MultiPoint
                | GeometryKind::MultiLineString
                | GeometryKind::MultiPolygon
                | GeometryKind::GeometryCollection
        )
    }

    /// Returns the single-part counterpart of a collection kind.
    #[must_use]
    pub const fn single(self) -> Self {
        match self {
            GeometryKind::MultiPoint => GeometryKind::Point,
            GeometryKind::MultiLineString => GeometryKind::LineString,
            GeometryKind::MultiPolygon => GeometryKind::Polygon,
            other => other,
        }
    }

    /// Returns the collection counterpart of a single-part kind.
    #[must_use]
    pub const fn multi(self) -> Self {
        match self {
            GeometryKind::Point => GeometryKind::MultiPoint,
            GeometryKind::LineString => GeometryKind::MultiLineString,
            GeometryKind::Polygon => GeometryKind::MultiPolygon,
            other => other,
        }
    }

    /// Returns `true` for the kinds that have a 2.5D variant.
    #[must_use]
    pub const fn has_25d_variant(self) -> bool {
        matches!(
            self,
            GeometryKind::Point
                | GeometryKind::LineString
                | GeometryKind::Polygon
                | GeometryKind::MultiPoint
                | GeometryKind::MultiLineString
                | GeometryKind::MultiPolygon
        )
    }

    /// Returns the display name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Unknown => "Unknown",
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
            GeometryKind::NoGeometry => "NoGeometry",
        }
    }
}

/// Coordinate dimensionality of a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimensions {
    /// Planar coordinates.
    Xy,
    /// Planar coordinates with elevation (ISO `Z`).
    Xyz,
    /// Planar coordinates with a measure.
    Xym,
    /// Elevation and measure.
    Xyzm,
    /// OGR's legacy 2.5D flavour of `Xyz`.
    Xyz25D,
}

impl Dimensions {
    /// Returns `true` when coordinates carry an elevation.
    #[must_use]
    pub const fn has_z(self) -> bool {
        matches!(self, Dimensions::Xyz | Dimensions::Xyzm | Dimensions::Xyz25D)
    }

    /// Returns `true` when coordinates carry a measure.
    #[must_use]
    pub const fn has_m(self) -> bool {
        matches!(self, Dimensions::Xym | Dimensions::Xyzm)
    }

    /// Number of ordinates per coordinate.
    #[must_use]
    pub const fn ordinate_count(self) -> usize {
        match self {
            Dimensions::Xy => 2,
            Dimensions::Xyz | Dimensions::Xym | Dimensions::Xyz25D => 3,
            Dimensions::Xyzm => 4,
        }
    }
}

/// Precise geometry subtype: a [`GeometryKind`] paired with its [`Dimensions`].
///
/// # Examples
///
/// ```
/// use geowriter_core_common::geometry::{Dimensions, GeometryKind, GeometryType};
///
/// let polygon_z = GeometryType::new(GeometryKind::Polygon, Dimensions::Xyz);
/// assert_eq!(polygon_z.wkb_code(), 1003);
/// assert_eq!(polygon_z.multi().to_string(), "MultiPolygonZ");
/// assert_eq!(polygon_z.driver_type().wkb_code(), 0x8000_0003);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryType {
    /// Shape kind
    pub kind: GeometryKind,
    /// Coordinate dimensionality
    pub dimensions: Dimensions,
}

impl GeometryType {
    /// Type of attribute-only layers.
    pub const NO_GEOMETRY: Self = Self::new(GeometryKind::NoGeometry, Dimensions::Xy);

    /// Generic geometry type.
    pub const UNKNOWN: Self = Self::new(GeometryKind::Unknown, Dimensions::Xy);

    /// Creates a geometry type from its parts.
    #[must_use]
    pub const fn new(kind: GeometryKind, dimensions: Dimensions) -> Self {
        Self { kind, dimensions }
    }

    /// Creates a planar geometry type.
    #[must_use]
    pub const fn xy(kind: GeometryKind) -> Self {
        Self::new(kind, Dimensions::Xy)
    }

    /// Strips elevation and measure.
    #[must_use]
    pub const fn flat(self) -> Self {
        Self::new(self.kind, Dimensions::Xy)
    }

    /// Returns `true` for collection types.
    #[must_use]
    pub const fn is_multi(self) -> bool {
        self.kind.is_multi()
    }

    /// Returns the single-part variant, keeping dimensionality.
    #[must_use]
    pub const fn single(self) -> Self {
        Self::new(self.kind.single(), self.dimensions)
    }

    /// Returns the collection variant, keeping dimensionality.
    #[must_use]
    pub const fn multi(self) -> Self {
        Self::new(self.kind.multi(), self.dimensions)
    }

    /// Returns `true` when the type carries an elevation.
    #[must_use]
    pub const fn has_z(self) -> bool {
        self.dimensions.has_z()
    }

    /// Returns `true` when the type carries a measure.
    #[must_use]
    pub const fn has_m(self) -> bool {
        self.dimensions.has_m()
    }

    /// Returns `true` for the 2.5D point through multipolygon types.
    #[must_use]
    pub const fn is_25d(self) -> bool {
        matches!(self.dimensions, Dimensions::Xyz25D) && self.kind.has_25d_variant()
    }

    /// Adds an elevation. Types that already have one are returned unchanged.
    #[must_use]
    pub const fn add_z(self) -> Self {
        if matches!(self.kind, GeometryKind::NoGeometry | GeometryKind::Unknown) {
            return self;
        }
        match self.dimensions {
            Dimensions::Xy => Self::new(self.kind, Dimensions::Xyz),
            Dimensions::Xym => Self::new(self.kind, Dimensions::Xyzm),
            _ => self,
        }
    }

    /// Drops the measure.
    #[must_use]
    pub const fn drop_m(self) -> Self {
        match self.dimensions {
            Dimensions::Xym => Self::new(self.kind, Dimensions::Xy),
            Dimensions::Xyzm => Self::new(self.kind, Dimensions::Xyz),
            _ => self,
        }
    }

    /// Returns the 2.5D variant.
    ///
    /// Only point through multipolygon have one; geometry collections map to
    /// [`GeometryType::UNKNOWN`].
    #[must_use]
    pub const fn to_25d(self) -> Self {
        match self.kind {
            GeometryKind::NoGeometry => Self::NO_GEOMETRY,
            kind if kind.has_25d_variant() => Self::new(kind, Dimensions::Xyz25D),
            _ => Self::UNKNOWN,
        }
    }

    /// Type handed to drivers when creating a layer: measures are dropped and
    /// elevations are expressed in the legacy 2.5D form.
    #[must_use]
    pub const fn driver_type(self) -> Self {
        let dropped = self.drop_m();
        if matches!(dropped.dimensions, Dimensions::Xyz) {
            dropped.to_25d()
        } else {
            dropped
        }
    }

    /// Returns the ISO (or OGR 2.5D) WKB type code.
    #[must_use]
    pub const fn wkb_code(self) -> u32 {
        let base = self.kind.base_code();
        if matches!(self.kind, GeometryKind::NoGeometry) {
            return base;
        }
        match self.dimensions {
            Dimensions::Xy => base,
            Dimensions::Xyz => base + 1000,
            Dimensions::Xym => base + 2000,
            Dimensions::Xyzm => base + 3000,
            Dimensions::Xyz25D => base | FLAG_25D,
        }
    }

    /// Parses an ISO or OGR 2.5D WKB type code.
    #[must_use]
    pub const fn from_wkb_code(code: u32) -> Option<Self> {
        if code == NO_GEOMETRY_CODE {
            return Some(Self::NO_GEOMETRY);
        }
        if code & FLAG_25D != 0 {
            return match GeometryKind::from_base_code(code & !FLAG_25D) {
                Some(kind) => Some(Self::new(kind, Dimensions::Xyz25D)),
                None => None,
            };
        }
        let dimensions = match code / 1000 {
            0 => Dimensions::Xy,
            1 => Dimensions::Xyz,
            2 => Dimensions::Xym,
            3 => Dimensions::Xyzm,
            _ => return None,
        };
        match GeometryKind::from_base_code(code % 1000) {
            Some(kind) => Some(Self::new(kind, dimensions)),
            None => None,
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.dimensions {
            Dimensions::Xy => "",
            Dimensions::Xyz => "Z",
            Dimensions::Xym => "M",
            Dimensions::Xyzm => "ZM",
            Dimensions::Xyz25D => "25D",
        };
        write!(f, "{}{suffix}", self.kind.as_str())
    }
}

/// A geometry held as well-known binary together with its parsed subtype.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    wkb: Vec<u8>,
    geometry_type: GeometryType,
}

impl Geometry {
    /// Wraps a WKB buffer, validating its header.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short, has an invalid byte
    /// order marker or carries an unknown type code.
    pub fn from_wkb(wkb: impl Into<Vec<u8>>) -> Result<Self, GeometryError> {
        let wkb = wkb.into();
        let geometry_type = read_header(&wkb)?;
        Ok(Self { wkb, geometry_type })
    }

    /// Encodes a `geo-types` geometry as planar WKB.
    ///
    /// # Errors
    ///
    /// Returns an error if `geozero` cannot encode the geometry.
    pub fn from_geo(geometry: &geo_types::Geometry<f64>) -> Result<Self, GeometryError> {
        let wkb = geometry
            .to_wkb(CoordDimensions::xy())
            .map_err(|e| GeometryError::Conversion {
                message: e.to_string(),
            })?;
        Self::from_wkb(wkb)
    }

    /// Returns an empty geometry of the given type.
    ///
    /// Empty points are encoded with NaN ordinates; every other kind carries
    /// a zero member count. `NoGeometry` and `Unknown` become an empty
    /// geometry collection.
    #[must_use]
    pub fn empty(geometry_type: GeometryType) -> Self {
        let geometry_type = match geometry_type.kind {
            GeometryKind::NoGeometry | GeometryKind::Unknown => GeometryType::new(
                GeometryKind::GeometryCollection,
                geometry_type.dimensions,
            ),
            _ => geometry_type,
        };
        let mut wkb = vec![1u8];
        put_u32(&mut wkb, geometry_type.wkb_code(), true);
        if geometry_type.kind == GeometryKind::Point {
            for _ in 0..geometry_type.dimensions.ordinate_count() {
                wkb.extend_from_slice(&f64::NAN.to_le_bytes());
            }
        } else {
            put_u32(&mut wkb, 0, true);
        }
        Self { wkb, geometry_type }
    }

    /// Raw WKB bytes.
    #[must_use]
    pub fn wkb(&self) -> &[u8] {
        &self.wkb
    }

    /// Consumes the geometry and returns its WKB bytes.
    #[must_use]
    pub fn into_wkb(self) -> Vec<u8> {
        self.wkb
    }

    /// Parsed geometry subtype.
    #[must_use]
    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    /// Promotes a single-part geometry to a one-member collection.
    ///
    /// Collections, `Unknown` and `NoGeometry` are returned unchanged. The
    /// original buffer becomes the sole member, so the result keeps the byte
    /// order of the input.
    #[must_use]
    pub fn to_multi(&self) -> Self {
        let target = self.geometry_type.multi();
        if target == self.geometry_type {
            return self.clone();
        }
        let little_endian = self.wkb.first() == Some(&1);
        let mut wkb = Vec::with_capacity(self.wkb.len() + 9);
        wkb.push(u8::from(little_endian));
        put_u32(&mut wkb, target.wkb_code(), little_endian);
        put_u32(&mut wkb, 1, little_endian);
        wkb.extend_from_slice(&self.wkb);
        Self {
            wkb,
            geometry_type: target,
        }
    }

    /// Decodes into a `geo-types` geometry. Elevations and measures are lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the WKB body is malformed.
    pub fn to_geo(&self) -> Result<geo_types::Geometry<f64>, GeometryError> {
        Wkb(self.wkb.clone())
            .to_geo()
            .map_err(|e| GeometryError::Conversion {
                message: e.to_string(),
            })
    }

    /// Renders the geometry as WKT.
    ///
    /// # Errors
    ///
    /// Returns an error if the WKB body is malformed.
    pub fn to_wkt(&self) -> Result<String, GeometryError> {
        Wkb(self.wkb.clone())
            .to_wkt()
            .map_err(|e| GeometryError::Conversion {
                message: e.to_string(),
            })
    }

    /// Planar bounding rectangle, `None` for empty or undecodable geometries.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.to_geo().ok()?.bounding_rect()
    }

    /// Returns `true` if the geometry intersects `rect`.
    ///
    /// Undecodable geometries never intersect.
    #[must_use]
    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        self.to_geo()
            .is_ok_and(|geometry| geometry.intersects(&rect.to_polygon()))
    }
}

fn read_header(wkb: &[u8]) -> Result<GeometryType, GeometryError> {
    if wkb.len() < 5 {
        return Err(GeometryError::Truncated { len: wkb.len() });
    }
    let code_bytes = [wkb[1], wkb[2], wkb[3], wkb[4]];
    let code = match wkb[0] {
        0 => u32::from_be_bytes(code_bytes),
        1 => u32::from_le_bytes(code_bytes),
        marker => return Err(GeometryError::ByteOrder { marker }),
    };
    GeometryType::from_wkb_code(code).ok_or(GeometryError::UnknownTypeCode { code })
}

fn put_u32(buffer: &mut Vec<u8>, value: u32, little_endian: bool) {
    if little_endian {
        buffer.extend_from_slice(&value.to_le_bytes());
    } else {
        buffer.extend_from_slice(&value.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Point, Polygon, coord, line_string, polygon};

    fn square() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]
    }

    #[test]
    fn test_wkb_codes() {
        assert_eq!(GeometryType::xy(GeometryKind::Point).wkb_code(), 1);
        assert_eq!(
            GeometryType::new(GeometryKind::MultiPolygon, Dimensions::Xyzm).wkb_code(),
            3006
        );
        assert_eq!(GeometryType::NO_GEOMETRY.wkb_code(), 100);
        assert_eq!(
            GeometryType::new(GeometryKind::LineString, Dimensions::Xyz25D).wkb_code(),
            0x8000_0002
        );
    }

    #[test]
    fn test_from_wkb_code() {
        assert_eq!(
            GeometryType::from_wkb_code(2003),
            Some(GeometryType::new(GeometryKind::Polygon, Dimensions::Xym))
        );
        assert_eq!(
            GeometryType::from_wkb_code(0x8000_0004),
            Some(GeometryType::new(GeometryKind::MultiPoint, Dimensions::Xyz25D))
        );
        assert_eq!(GeometryType::from_wkb_code(17), None);
        assert_eq!(GeometryType::from_wkb_code(4001), None);
    }

    #[test]
    fn test_single_multi() {
        let point = GeometryType::new(GeometryKind::Point, Dimensions::Xyz);
        assert_eq!(point.multi().kind, GeometryKind::MultiPoint);
        assert_eq!(point.multi().single(), point);
        assert!(GeometryType::xy(GeometryKind::GeometryCollection).is_multi());
        assert_eq!(
            GeometryType::xy(GeometryKind::GeometryCollection).single().kind,
            GeometryKind::GeometryCollection
        );
    }

    #[test]
    fn test_driver_type() {
        let measured = GeometryType::new(GeometryKind::LineString, Dimensions::Xym);
        assert_eq!(measured.driver_type(), GeometryType::xy(GeometryKind::LineString));

        let zm = GeometryType::new(GeometryKind::Polygon, Dimensions::Xyzm);
        assert_eq!(
            zm.driver_type(),
            GeometryType::new(GeometryKind::Polygon, Dimensions::Xyz25D)
        );

        let collection = GeometryType::new(GeometryKind::GeometryCollection, Dimensions::Xyz);
        assert_eq!(collection.driver_type(), GeometryType::UNKNOWN);
    }

    #[test]
    fn test_add_z() {
        assert_eq!(
            GeometryType::xy(GeometryKind::Point).add_z().dimensions,
            Dimensions::Xyz
        );
        assert_eq!(
            GeometryType::new(GeometryKind::Point, Dimensions::Xym).add_z().dimensions,
            Dimensions::Xyzm
        );
        assert_eq!(GeometryType::NO_GEOMETRY.add_z(), GeometryType::NO_GEOMETRY);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            GeometryType::new(GeometryKind::MultiLineString, Dimensions::Xyz25D).to_string(),
            "MultiLineString25D"
        );
        assert_eq!(GeometryType::xy(GeometryKind::Point).to_string(), "Point");
    }

    #[test]
    fn test_from_geo_reads_header() {
        let geometry = Geometry::from_geo(&square().into()).unwrap();
        assert_eq!(
            geometry.geometry_type(),
            GeometryType::xy(GeometryKind::Polygon)
        );
    }

    #[test]
    fn test_from_wkb_rejects_garbage() {
        assert_eq!(
            Geometry::from_wkb(vec![1, 2]),
            Err(GeometryError::Truncated { len: 2 })
        );
        assert_eq!(
            Geometry::from_wkb(vec![7, 1, 0, 0, 0]),
            Err(GeometryError::ByteOrder { marker: 7 })
        );
        assert_eq!(
            Geometry::from_wkb(vec![1, 9, 0, 0, 0]),
            Err(GeometryError::UnknownTypeCode { code: 9 })
        );
    }

    #[test]
    fn test_to_multi_wraps_single_polygon() {
        let polygon = Geometry::from_geo(&square().into()).unwrap();
        let multi = polygon.to_multi();

        assert_eq!(multi.geometry_type(), GeometryType::xy(GeometryKind::MultiPolygon));
        match multi.to_geo().unwrap() {
            geo_types::Geometry::MultiPolygon(mp) => {
                assert_eq!(mp.0.len(), 1);
                assert_eq!(mp.0[0], square());
            },
            other => panic!("expected multipolygon, got {other:?}"),
        }
    }

    #[test]
    fn test_to_multi_keeps_collections() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0)];
        let multi = Geometry::from_geo(&geo_types::MultiLineString(vec![line]).into()).unwrap();
        assert_eq!(multi.to_multi(), multi);
    }

    #[test]
    fn test_empty_geometry() {
        let empty = Geometry::empty(GeometryType::xy(GeometryKind::MultiPolygon));
        assert_eq!(empty.wkb(), &[1, 6, 0, 0, 0, 0, 0, 0, 0]);

        let point = Geometry::empty(GeometryType::new(GeometryKind::Point, Dimensions::Xyz));
        assert_eq!(point.wkb().len(), 5 + 3 * 8);
        assert_eq!(point.geometry_type().wkb_code(), 1001);
    }

    #[test]
    fn test_intersects_rect() {
        let point = Geometry::from_geo(&Point::new(5.0, 5.0).into()).unwrap();
        let inside = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 });
        let outside = Rect::new(coord! { x: 20.0, y: 20.0 }, coord! { x: 30.0, y: 30.0 });

        assert!(point.intersects_rect(&inside));
        assert!(!point.intersects_rect(&outside));
    }

    #[test]
    fn test_bounding_rect() {
        let polygon = Geometry::from_geo(&square().into()).unwrap();
        let rect = polygon.bounding_rect().unwrap();
        assert_eq!(rect.min(), coord! { x: 0.0, y: 0.0 });
        assert_eq!(rect.max(), coord! { x: 1.0, y: 1.0 });
    }
}
