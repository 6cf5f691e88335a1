//! Field values read from stored documents.
//!
//! Stored fields keep every occurrence in its original order, which makes them
//! the only source able to honor order-preserving projections of multi-valued
//! fields.

use std::sync::Arc;

use prism_common::{Result, Value};
use prism_index_core::{DocId, FieldCodec};

use super::{SegmentContext, bound, nested::DocumentValueSource};
use crate::{
    accumulator::{Accumulated, Accumulator},
    extracted::Extracted,
};

/// Decodes the stored occurrences of one field with its native codec.
pub struct StoredFieldSource {
    path: String,
    codec: Arc<dyn FieldCodec>,
    segment: Option<Arc<SegmentContext>>,
}

impl StoredFieldSource {
    pub fn new(path: impl Into<String>, codec: Arc<dyn FieldCodec>) -> StoredFieldSource {
        StoredFieldSource {
            path: path.into(),
            codec,
            segment: None,
        }
    }

    /// Decodes every stored occurrence of the field in `doc`.
    pub fn read(&self, doc: DocId) -> Result<Vec<Value>> {
        let document = bound(&self.segment)?.stored_document(doc)?;
        document
            .values(&self.path)
            .map(|value| self.codec.decode_stored(value))
            .collect()
    }
}

impl DocumentValueSource for StoredFieldSource {
    type Item = Value;

    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.segment = Some(segment.clone());
        Ok(())
    }

    fn collect(
        &mut self,
        doc: DocId,
        accumulator: Accumulator,
        accumulated: &mut Accumulated<Value>,
    ) -> Result<()> {
        accumulator.accumulate_all(accumulated, self.read(doc)?);
        Ok(())
    }

    fn wrap(&self, accumulated: Accumulated<Value>) -> Extracted {
        Extracted::Values(accumulated)
    }
}
