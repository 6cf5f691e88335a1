//! Projection of the rank score.

use std::sync::Arc;

use prism_common::{Result, Value};
use prism_index_core::DocId;

use super::{SearchProjection, unexpected};
use crate::{
    collector::ScoreCollector,
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    values::{SegmentContext, Values, bound},
};

/// Projects the score the engine computed for the hit, as `Value::F64`.
///
/// Engine scores are `f32`; the projected value is that score widened to `f64`,
/// so a score of `1.37f32` projects as `f64::from(1.37f32)`, not `1.37`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreProjection;

impl SearchProjection for ScoreProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_not_nested(
            "score",
            "wrap the projection in a root projection to project the root document score",
        )?;
        requirements.require_score();
        Ok(ExtractorTree::leaf(ScoreExtractor))
    }
}

struct ScoreExtractor;

impl Extractor for ScoreExtractor {
    fn values(&self, _context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(Box::new(ScoreValues { segment: None }))
    }

    fn transform(
        &self,
        _loaded: &LoadedEntities,
        data: Extracted,
        _context: &mut TransformContext,
    ) -> Result<Value> {
        match data {
            Extracted::Value(score) => Ok(score),
            Extracted::Null => Ok(Value::Null),
            other => Err(unexpected("score projection", &other)),
        }
    }
}

struct ScoreValues {
    segment: Option<Arc<SegmentContext>>,
}

impl Values for ScoreValues {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.segment = Some(segment.clone());
        Ok(())
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        let segment = bound(&self.segment)?;
        let score = segment
            .collectors()
            .get::<ScoreCollector>(&ScoreCollector::key())?
            .score(segment.position(), doc);
        Ok(match score {
            Some(score) => Extracted::Value(Value::F64(f64::from(score))),
            None => Extracted::Null,
        })
    }
}
