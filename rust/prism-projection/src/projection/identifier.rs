//! Projection of document identifiers.

use std::sync::Arc;

use prism_common::{Result, Value, error::Error};
use prism_index_core::{DocId, ProjectionConverter};

use super::{SearchProjection, unexpected};
use crate::{
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    values::{SegmentContext, Values, bound},
};

/// Pseudo field path used to report identifier configuration errors.
const ID_PATH: &str = "_id";

/// Projects the identifier of the hit, converted with the identifier converter
/// of its index.
#[derive(Debug, Clone, Default)]
pub struct IdentifierProjection {
    value_convert: bool,
}

impl IdentifierProjection {
    pub fn new() -> IdentifierProjection {
        IdentifierProjection {
            value_convert: true,
        }
    }

    /// Returns the raw identifier string instead of its converted value.
    pub fn raw() -> IdentifierProjection {
        IdentifierProjection {
            value_convert: false,
        }
    }
}

impl SearchProjection for IdentifierProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        _requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_not_nested(
            "identifier",
            "wrap the projection in a root projection to project the root document identifier",
        )?;
        let converter = if self.value_convert {
            let scope = context.scope();
            let mut converters = scope.indexes().iter().map(|s| s.identifier_converter());
            let first = converters.next().cloned();
            if let Some(first) = &first {
                if let Some(other) = converters.find(|c| !first.is_compatible_with(c.as_ref())) {
                    return Err(Error::cross_index_schema_conflict(
                        ID_PATH,
                        &scope.index_names(),
                        format!(
                            "identifier converters '{}' and '{}' are incompatible",
                            first.name(),
                            other.name()
                        ),
                    ));
                }
            }
            first
        } else {
            None
        };
        Ok(ExtractorTree::leaf(IdentifierExtractor { converter }))
    }
}

struct IdentifierExtractor {
    converter: Option<Arc<dyn ProjectionConverter>>,
}

impl Extractor for IdentifierExtractor {
    fn values(&self, _context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(Box::new(IdentifierValues { segment: None }))
    }

    fn transform(
        &self,
        _loaded: &LoadedEntities,
        data: Extracted,
        _context: &mut TransformContext,
    ) -> Result<Value> {
        match (data, &self.converter) {
            (Extracted::Value(id), Some(converter)) => converter.convert(id),
            (Extracted::Value(id), None) => Ok(id),
            (other, _) => Err(unexpected("identifier projection", &other)),
        }
    }
}

struct IdentifierValues {
    segment: Option<Arc<SegmentContext>>,
}

impl Values for IdentifierValues {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.segment = Some(segment.clone());
        Ok(())
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        let id = bound(&self.segment)?.segment().document_id(doc)?;
        Ok(Extracted::Value(Value::String(id)))
    }
}
