//! Projection of a fixed value.

use prism_common::{Result, Value};
use prism_index_core::DocId;

use super::SearchProjection;
use crate::{
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    values::{SegmentContext, Values},
};

/// Returns the same value for every hit, without reading anything.
#[derive(Debug, Clone)]
pub struct ConstantProjection(pub Value);

impl SearchProjection for ConstantProjection {
    fn request(
        &self,
        _context: &ProjectionRequestContext,
        _requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        Ok(ExtractorTree::leaf(ConstantExtractor(self.0.clone())))
    }
}

struct ConstantExtractor(Value);

impl Extractor for ConstantExtractor {
    fn values(&self, _context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(Box::new(NoValues))
    }

    fn transform(
        &self,
        _loaded: &LoadedEntities,
        _data: Extracted,
        _context: &mut TransformContext,
    ) -> Result<Value> {
        Ok(self.0.clone())
    }
}

struct NoValues;

impl Values for NoValues {
    fn context(&mut self, _segment: &std::sync::Arc<SegmentContext>) -> Result<()> {
        Ok(())
    }

    fn get(&mut self, _doc: DocId) -> Result<Extracted> {
        Ok(Extracted::Null)
    }
}
