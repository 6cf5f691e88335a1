//! Dynamic values exchanged between the index engine, projections and callers.
//!
//! Every native field value decoded from a segment, every intermediate result and
//! every finished projection result is expressed as a [`Value`]. Projections that
//! produce structured results (composites, objects, loaded entities) nest values
//! through [`Value::List`] and [`Value::Map`].

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{Result, error::Error};

/// Mean earth radius used by [`GeoPoint::distance_meters`].
pub const EARTH_MEAN_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    GeoPoint(GeoPoint),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Reference(DocumentReference),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type of this value, or `None` for `Value::Null`.
    pub fn value_type(&self) -> Option<ValueType> {
        let value_type = match self {
            Value::Null => return None,
            Value::Bool(_) => ValueType::Bool,
            Value::I64(_) => ValueType::I64,
            Value::F64(_) => ValueType::F64,
            Value::String(_) => ValueType::String,
            Value::GeoPoint(_) => ValueType::GeoPoint,
            Value::List(_) => ValueType::List,
            Value::Map(_) => ValueType::Map,
            Value::Reference(_) => ValueType::Reference,
        };
        Some(value_type)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            Value::I64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_geo_point(&self) -> Option<GeoPoint> {
        match self {
            Value::GeoPoint(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Extracts a string value, failing with a conversion error for any other type.
    pub fn try_into_string(self, context: &str) -> Result<String> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(Error::conversion(
                context,
                format!("expected a string, got {other}"),
            )),
        }
    }

    /// Extracts a geo point, failing with a conversion error for any other type.
    pub fn try_into_geo_point(self, context: &str) -> Result<GeoPoint> {
        match self {
            Value::GeoPoint(p) => Ok(p),
            other => Err(Error::conversion(
                context,
                format!("expected a geo point, got {other}"),
            )),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
            Value::GeoPoint(p) => write!(f, "{p}"),
            Value::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Reference(r) => write!(f, "{r}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I64(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<GeoPoint> for Value {
    fn from(p: GeoPoint) -> Self {
        Value::GeoPoint(p)
    }
}

impl From<DocumentReference> for Value {
    fn from(r: DocumentReference) -> Self {
        Value::Reference(r)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Result types a projection converter may be asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    I64,
    F64,
    String,
    GeoPoint,
    List,
    Map,
    Reference,
    /// Accepts whatever the converter produces.
    Any,
}

/// A point on the earth surface, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> GeoPoint {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` using the haversine formula.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_MEAN_RADIUS_METERS * h.sqrt().min(1.0).asin()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Identifies an indexed document independently of any segment: the mapped type
/// the document was indexed as, and its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentReference {
    pub type_name: String,
    pub id: String,
}

impl DocumentReference {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> DocumentReference {
        DocumentReference {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_distance() {
        let paris = GeoPoint::new(48.8566, 2.3522);
        let london = GeoPoint::new(51.5074, -0.1278);
        let distance = paris.distance_meters(&london);
        assert!((distance - 343_500.0).abs() < 2_000.0, "{distance}");
        assert_eq!(paris.distance_meters(&paris), 0.0);
    }

    #[test]
    fn test_value_display_and_types() {
        let value = Value::List(vec!["a".into(), 1i64.into(), Value::Null]);
        assert_eq!(value.to_string(), "[\"a\", 1, null]");
        assert_eq!(value.value_type(), Some(ValueType::List));
        assert_eq!(Value::Null.value_type(), None);
        assert_eq!(Value::from(Some(2.5)), Value::F64(2.5));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_value_serde_shape() {
        let value = Value::Reference(DocumentReference::new("Book", "42"));
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_try_into_string_mismatch() {
        let err = Value::I64(3).try_into_string("title").unwrap_err();
        assert!(err.to_string().contains("title"));
    }
}
