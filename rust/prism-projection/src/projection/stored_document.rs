//! Projection of the whole stored document.

use std::{collections::BTreeMap, sync::Arc};

use prism_common::{Result, Value};
use prism_index_core::{DocId, IndexSchema, StoredValue};

use super::{SearchProjection, unexpected};
use crate::{
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    scope::ProjectionScope,
    values::{SegmentContext, Values, bound},
};

/// Projects every stored field of the hit as a `Value::Map` keyed by field path.
///
/// Values are decoded with the codec the index declares for their field;
/// multi-valued fields map to a `Value::List` in indexing order.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredDocumentProjection;

impl SearchProjection for StoredDocumentProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_not_nested(
            "stored document",
            "wrap the projection in a root projection to project the root document",
        )?;
        requirements.require_all_stored_fields();
        Ok(ExtractorTree::leaf(StoredDocumentExtractor {
            scope: context.scope().clone(),
        }))
    }
}

struct StoredDocumentExtractor {
    scope: Arc<ProjectionScope>,
}

impl Extractor for StoredDocumentExtractor {
    fn values(&self, _context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(Box::new(StoredDocumentValues {
            scope: self.scope.clone(),
            schema: None,
            segment: None,
        }))
    }

    fn transform(
        &self,
        _loaded: &LoadedEntities,
        data: Extracted,
        _context: &mut TransformContext,
    ) -> Result<Value> {
        match data {
            Extracted::Value(document) => Ok(document),
            other => Err(unexpected("stored document projection", &other)),
        }
    }
}

struct StoredDocumentValues {
    scope: Arc<ProjectionScope>,
    schema: Option<Arc<IndexSchema>>,
    segment: Option<Arc<SegmentContext>>,
}

impl StoredDocumentValues {
    fn decode(&self, path: &str, value: &StoredValue) -> Result<(Value, bool)> {
        let node = self.schema.as_ref().and_then(|schema| {
            schema
                .field(path)
                .map(|node| (node, schema.is_multi_valued_relative_to(node, None)))
        });
        match node.and_then(|(node, multi)| node.codec().map(|codec| (codec, multi))) {
            Some((codec, multi)) => Ok((codec.decode_stored(value)?, multi)),
            None => Ok((raw_value(value), false)),
        }
    }
}

impl Values for StoredDocumentValues {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.schema = self.scope.index(segment.index_name()).cloned();
        self.segment = Some(segment.clone());
        Ok(())
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        let document = bound(&self.segment)?.stored_document(doc)?;
        let mut fields = BTreeMap::<String, Value>::new();
        for (path, stored) in document.fields() {
            let (value, multi_valued) = self.decode(path, stored)?;
            match fields.get_mut(path) {
                Some(Value::List(values)) => values.push(value),
                Some(previous) => {
                    let first = std::mem::take(previous);
                    *previous = Value::List(vec![first, value]);
                }
                None if multi_valued => {
                    fields.insert(path.to_string(), Value::List(vec![value]));
                }
                None => {
                    fields.insert(path.to_string(), value);
                }
            }
        }
        Ok(Extracted::Value(Value::Map(fields)))
    }
}

fn raw_value(value: &StoredValue) -> Value {
    match value {
        StoredValue::Str(s) => Value::String(s.clone()),
        StoredValue::Long(v) => Value::I64(*v),
        StoredValue::Double(v) => Value::F64(*v),
        StoredValue::Bytes(bytes) => {
            Value::List(bytes.iter().map(|b| Value::I64(i64::from(*b))).collect())
        }
    }
}
