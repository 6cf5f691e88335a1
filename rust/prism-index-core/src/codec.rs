//! Native field codecs: translation between stored field representations and
//! native [`Value`]s.

use std::fmt::Debug;

use prism_common::{GeoPoint, Result, Value, ValueType, error::Error};

use crate::segment::StoredValue;

/// Decodes the stored representation of a field into its native value.
///
/// Codecs are owned by the schema and shared by every projection on the field.
pub trait FieldCodec: Send + Sync + Debug + 'static {
    /// Name of the codec, used in diagnostics and compatibility checks.
    fn name(&self) -> &str;

    /// The native type produced by [`decode_stored`](Self::decode_stored).
    fn value_type(&self) -> ValueType;

    /// Decodes one stored occurrence of the field.
    fn decode_stored(&self, value: &StoredValue) -> Result<Value>;

    /// Encodes a native value into its stored representation.
    fn encode(&self, value: &Value) -> Result<StoredValue>;

    /// Returns `true` if values decoded by `other` can be handled as values decoded
    /// by this codec. Used to validate multi-index projections.
    fn is_compatible_with(&self, other: &dyn FieldCodec) -> bool {
        self.name() == other.name() && self.value_type() == other.value_type()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl FieldCodec for StringCodec {
    fn name(&self) -> &str {
        "string"
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn decode_stored(&self, value: &StoredValue) -> Result<Value> {
        match value {
            StoredValue::Str(s) => Ok(Value::String(s.clone())),
            other => Err(mismatch(self.name(), other)),
        }
    }

    fn encode(&self, value: &Value) -> Result<StoredValue> {
        match value {
            Value::String(s) => Ok(StoredValue::Str(s.clone())),
            other => Err(unexpected(self.name(), other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct I64Codec;

impl FieldCodec for I64Codec {
    fn name(&self) -> &str {
        "i64"
    }

    fn value_type(&self) -> ValueType {
        ValueType::I64
    }

    fn decode_stored(&self, value: &StoredValue) -> Result<Value> {
        match value {
            StoredValue::Long(v) => Ok(Value::I64(*v)),
            other => Err(mismatch(self.name(), other)),
        }
    }

    fn encode(&self, value: &Value) -> Result<StoredValue> {
        match value {
            Value::I64(v) => Ok(StoredValue::Long(*v)),
            other => Err(unexpected(self.name(), other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct F64Codec;

impl FieldCodec for F64Codec {
    fn name(&self) -> &str {
        "f64"
    }

    fn value_type(&self) -> ValueType {
        ValueType::F64
    }

    fn decode_stored(&self, value: &StoredValue) -> Result<Value> {
        match value {
            StoredValue::Double(v) => Ok(Value::F64(*v)),
            other => Err(mismatch(self.name(), other)),
        }
    }

    fn encode(&self, value: &Value) -> Result<StoredValue> {
        match value {
            Value::F64(v) => Ok(StoredValue::Double(*v)),
            Value::I64(v) => Ok(StoredValue::Double(*v as f64)),
            other => Err(unexpected(self.name(), other)),
        }
    }
}

/// Booleans are stored as `0`/`1` longs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl FieldCodec for BoolCodec {
    fn name(&self) -> &str {
        "bool"
    }

    fn value_type(&self) -> ValueType {
        ValueType::Bool
    }

    fn decode_stored(&self, value: &StoredValue) -> Result<Value> {
        match value {
            StoredValue::Long(v) => Ok(Value::Bool(*v != 0)),
            other => Err(mismatch(self.name(), other)),
        }
    }

    fn encode(&self, value: &Value) -> Result<StoredValue> {
        match value {
            Value::Bool(v) => Ok(StoredValue::Long(*v as i64)),
            other => Err(unexpected(self.name(), other)),
        }
    }
}

/// Geo points are stored as 16 bytes: little-endian latitude then longitude.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoPointCodec;

impl FieldCodec for GeoPointCodec {
    fn name(&self) -> &str {
        "geo_point"
    }

    fn value_type(&self) -> ValueType {
        ValueType::GeoPoint
    }

    fn decode_stored(&self, value: &StoredValue) -> Result<Value> {
        match value {
            StoredValue::Bytes(bytes) if bytes.len() == 16 => {
                let mut lat = [0u8; 8];
                let mut lon = [0u8; 8];
                lat.copy_from_slice(&bytes[..8]);
                lon.copy_from_slice(&bytes[8..]);
                Ok(Value::GeoPoint(GeoPoint::new(
                    f64::from_le_bytes(lat),
                    f64::from_le_bytes(lon),
                )))
            }
            other => Err(mismatch(self.name(), other)),
        }
    }

    fn encode(&self, value: &Value) -> Result<StoredValue> {
        match value {
            Value::GeoPoint(p) => {
                let mut bytes = Vec::with_capacity(16);
                bytes.extend_from_slice(&p.latitude.to_le_bytes());
                bytes.extend_from_slice(&p.longitude.to_le_bytes());
                Ok(StoredValue::Bytes(bytes))
            }
            other => Err(unexpected(self.name(), other)),
        }
    }
}

#[cold]
fn mismatch(codec: &str, value: &StoredValue) -> Error {
    Error::conversion(codec, format!("unexpected stored value {value:?}"))
}

#[cold]
fn unexpected(codec: &str, value: &Value) -> Error {
    Error::conversion(codec, format!("cannot encode {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_codec() {
        let point = Value::GeoPoint(GeoPoint::new(45.5, -73.25));
        let stored = GeoPointCodec.encode(&point).unwrap();
        assert_eq!(GeoPointCodec.decode_stored(&stored).unwrap(), point);
        assert!(
            GeoPointCodec
                .decode_stored(&StoredValue::Bytes(vec![0; 3]))
                .is_err()
        );
    }

    #[test]
    fn test_codec_compatibility() {
        assert!(StringCodec.is_compatible_with(&StringCodec));
        assert!(!StringCodec.is_compatible_with(&I64Codec));
        assert_eq!(
            BoolCodec.decode_stored(&StoredValue::Long(1)).unwrap(),
            Value::Bool(true)
        );
        assert!(I64Codec.decode_stored(&StoredValue::Str("1".into())).is_err());
    }
}
