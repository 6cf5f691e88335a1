//! Raw per-hit data produced by the extraction phase.

use prism_common::Value;

use crate::{accumulator::Accumulated, loading::LoadHandle};

/// The data extracted for one hit by one projection, before transformation.
///
/// `Extracted` never carries loaded entities: entity projections only record the
/// [`LoadHandle`] of the load they planned, which the transform phase resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Nothing was extracted (the projection does not apply to this hit).
    Null,
    /// One raw value.
    Value(Value),
    /// Raw field values accumulated for this hit.
    Values(Accumulated<Value>),
    /// Per-object leaf data accumulated by an object projection.
    Objects(Accumulated<Vec<Extracted>>),
    /// A planned entity load.
    Handle(LoadHandle),
    /// The leaf data of an extractor tree, in leaf order.
    Leaves(Vec<Extracted>),
    /// Data extracted by one of several alternative extractors, identified by slot.
    Dispatched { slot: usize, data: Box<Extracted> },
}
