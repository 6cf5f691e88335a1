//! Core definitions relied upon by all prism-* crates: the error type and the dynamic
//! value model that flows through projections.

pub mod error;
pub mod result;
pub mod value;

pub use result::Result;
pub use value::{DocumentReference, GeoPoint, Value, ValueType};
