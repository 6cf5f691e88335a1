//! Folding of zero or more raw values into the public shape of a projection result.
//!
//! An [`Accumulator`] decides the cardinality of a projection: whether the caller
//! receives one value, an optional value, or a list. The intermediate state,
//! [`Accumulated`], is opaque and only turned into a caller-facing [`Value`] by
//! [`Accumulator::finish`].
//!
//! Cardinality violations (several values reaching a single-valued accumulator)
//! are prevented at request time through schema checks; at accumulation time a
//! single-valued accumulator simply keeps the first value it receives.

use prism_common::{Result, Value};

/// The cardinality of a projection result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accumulator {
    /// Exactly one value is expected; absent values finish as `Value::Null`.
    Single,
    /// Zero or one value; absent values finish as `Value::Null`.
    Optional,
    /// All values, in the order they were accumulated.
    List,
    /// All values, as a multiset: the order of the resulting list is unspecified.
    UnorderedList,
}

/// Intermediate state of one accumulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulated<T> {
    values: Vec<T>,
}

impl<T> Accumulated<T> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }
}

impl Accumulator {
    pub fn is_single_valued(self) -> bool {
        matches!(self, Accumulator::Single | Accumulator::Optional)
    }

    /// Whether the values must reach the caller in their original order.
    pub fn preserves_order(self) -> bool {
        self == Accumulator::List
    }

    pub fn create_initial<T>(self) -> Accumulated<T> {
        let capacity = if self.is_single_valued() { 1 } else { 0 };
        Accumulated {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn accumulate<T>(self, accumulated: &mut Accumulated<T>, value: T) {
        if self.is_single_valued() && !accumulated.values.is_empty() {
            return;
        }
        accumulated.values.push(value);
    }

    pub fn accumulate_all<T>(
        self,
        accumulated: &mut Accumulated<T>,
        values: impl IntoIterator<Item = T>,
    ) {
        if self.is_single_valued() {
            if let Some(value) = values.into_iter().next() {
                self.accumulate(accumulated, value);
            }
        } else {
            accumulated.values.extend(values);
        }
    }

    /// Applies `convert` to every accumulated value, preserving cardinality and
    /// order.
    pub fn transform_all<T, U>(
        self,
        accumulated: Accumulated<T>,
        mut convert: impl FnMut(T) -> Result<U>,
    ) -> Result<Accumulated<U>> {
        let values = accumulated
            .values
            .into_iter()
            .map(&mut convert)
            .collect::<Result<Vec<_>>>()?;
        Ok(Accumulated { values })
    }

    pub fn finish(self, accumulated: Accumulated<Value>) -> Value {
        match self {
            Accumulator::Single | Accumulator::Optional => {
                accumulated.values.into_iter().next().unwrap_or(Value::Null)
            }
            Accumulator::List | Accumulator::UnorderedList => Value::List(accumulated.values),
        }
    }

    /// The finished result of an accumulation that received no value.
    pub fn empty_result(self) -> Value {
        self.finish(self.create_initial())
    }
}
