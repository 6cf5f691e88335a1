//! Field values read from doc-value columns.

use std::sync::Arc;

use prism_common::{Result, Value};
use prism_index_core::{DocId, DocValues};

use super::{SegmentContext, nested::DocumentValueSource};
use crate::{
    accumulator::{Accumulated, Accumulator},
    extracted::Extracted,
};

/// Reads one field from its per-segment doc-value column.
///
/// Columns may reorder the values of multi-valued fields; segments without a
/// column for the field yield no values.
pub struct DocValuesSource {
    path: String,
    column: Option<Arc<dyn DocValues>>,
}

impl DocValuesSource {
    pub fn new(path: impl Into<String>) -> DocValuesSource {
        DocValuesSource {
            path: path.into(),
            column: None,
        }
    }
}

impl DocumentValueSource for DocValuesSource {
    type Item = Value;

    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.column = segment.segment().doc_values(&self.path)?;
        Ok(())
    }

    fn collect(
        &mut self,
        doc: DocId,
        accumulator: Accumulator,
        accumulated: &mut Accumulated<Value>,
    ) -> Result<()> {
        if let Some(column) = self.column.as_ref() {
            accumulator.accumulate_all(accumulated, column.values(doc)?);
        }
        Ok(())
    }

    fn wrap(&self, accumulated: Accumulated<Value>) -> Extracted {
        Extracted::Values(accumulated)
    }
}
