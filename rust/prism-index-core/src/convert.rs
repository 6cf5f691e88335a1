//! Projection converters: translation of native values into the domain values
//! returned to callers.

use std::{fmt, sync::Arc};

use prism_common::{Result, Value, ValueType, error::Error};

/// Converts one native value into a domain value, without changing cardinality.
pub trait ProjectionConverter: Send + Sync + fmt::Debug + 'static {
    /// The type of the values produced by [`convert`](Self::convert).
    fn value_type(&self) -> ValueType;

    fn convert(&self, value: Value) -> Result<Value>;

    /// Returns `true` if a projection may target values of type `requested`.
    fn supports(&self, requested: ValueType) -> bool {
        requested == ValueType::Any || requested == self.value_type()
    }

    /// Returns `true` if this converter produces the same values as `other`, so
    /// that one projection can be shared between indexes using either of them.
    fn is_compatible_with(&self, other: &dyn ProjectionConverter) -> bool {
        self.value_type() == other.value_type() && self.name() == other.name()
    }

    fn name(&self) -> &str;
}

/// Returns native values unchanged.
#[derive(Debug, Clone, Copy)]
pub struct IdentityConverter(pub ValueType);

impl ProjectionConverter for IdentityConverter {
    fn value_type(&self) -> ValueType {
        self.0
    }

    fn convert(&self, value: Value) -> Result<Value> {
        Ok(value)
    }

    fn name(&self) -> &str {
        "identity"
    }
}

/// Parses string values (typically document identifiers) into integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseI64Converter;

impl ProjectionConverter for ParseI64Converter {
    fn value_type(&self) -> ValueType {
        ValueType::I64
    }

    fn convert(&self, value: Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::I64(v) => Ok(Value::I64(v)),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::I64)
                .map_err(|e| Error::conversion("parse-i64", format!("'{s}': {e}"))),
            other => Err(Error::conversion(
                "parse-i64",
                format!("unsupported value {other}"),
            )),
        }
    }

    fn name(&self) -> &str {
        "parse-i64"
    }
}

/// A converter backed by a closure.
pub struct FnConverter {
    name: String,
    value_type: ValueType,
    f: Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>,
}

impl FnConverter {
    pub fn new(
        name: impl Into<String>,
        value_type: ValueType,
        f: impl Fn(Value) -> Result<Value> + Send + Sync + 'static,
    ) -> FnConverter {
        FnConverter {
            name: name.into(),
            value_type,
            f: Arc::new(f),
        }
    }
}

impl fmt::Debug for FnConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .finish()
    }
}

impl ProjectionConverter for FnConverter {
    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn convert(&self, value: Value) -> Result<Value> {
        (self.f)(value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
