//! Projections of document references and loaded entities.
//!
//! All three projections read the same per-hit metadata, the mapped type and the
//! identifier of the root document, and differ in what the transform phase does
//! with it.

use std::sync::Arc;

use prism_common::{DocumentReference, Result, Value};
use prism_index_core::DocId;

use super::{SearchProjection, unexpected};
use crate::{
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    values::{SegmentContext, Values, bound},
};

const ROOT_HINT: &str = "wrap the projection in a root projection to reference the root document";

/// Projects a [`DocumentReference`] to the hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentReferenceProjection;

impl SearchProjection for DocumentReferenceProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        _requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_not_nested("document reference", ROOT_HINT)?;
        Ok(ExtractorTree::leaf(ReferenceExtractor {
            mode: ReferenceMode::Document,
        }))
    }
}

/// Projects the caller-facing entity reference of the hit, as converted by the
/// entity loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityReferenceProjection;

impl SearchProjection for EntityReferenceProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        _requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_not_nested("entity reference", ROOT_HINT)?;
        Ok(ExtractorTree::leaf(ReferenceExtractor {
            mode: ReferenceMode::EntityReference,
        }))
    }
}

/// Projects the entity the hit was indexed from, as materialized by the entity
/// loader after the scan.
///
/// Entities that cannot be loaded transform to `Value::Null` and are reported
/// through [`TransformContext::has_failed_load`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityProjection;

impl SearchProjection for EntityProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        _requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_not_nested("entity", ROOT_HINT)?;
        Ok(ExtractorTree::leaf(ReferenceExtractor {
            mode: ReferenceMode::Entity,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceMode {
    Document,
    EntityReference,
    Entity,
}

struct ReferenceExtractor {
    mode: ReferenceMode,
}

impl Extractor for ReferenceExtractor {
    fn values(&self, context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(Box::new(ReferenceValues {
            plan: (self.mode == ReferenceMode::Entity).then(|| context.clone()),
            segment: None,
        }))
    }

    fn transform(
        &self,
        loaded: &LoadedEntities,
        data: Extracted,
        context: &mut TransformContext,
    ) -> Result<Value> {
        match (self.mode, data) {
            (ReferenceMode::Document, Extracted::Value(reference)) => Ok(reference),
            (ReferenceMode::EntityReference, Extracted::Value(Value::Reference(reference))) => {
                loaded.convert_reference(&reference)
            }
            (ReferenceMode::Entity, Extracted::Handle(handle)) => match loaded.get(handle) {
                Some(entity) => Ok(entity.clone()),
                None => {
                    context.report_failed_load();
                    Ok(Value::Null)
                }
            },
            (_, other) => Err(unexpected("reference projection", &other)),
        }
    }
}

struct ReferenceValues {
    /// Set for entity projections, which plan a load per hit.
    plan: Option<ExtractionContext>,
    segment: Option<Arc<SegmentContext>>,
}

impl Values for ReferenceValues {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.segment = Some(segment.clone());
        Ok(())
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        let segment = bound(&self.segment)?.segment();
        let reference =
            DocumentReference::new(segment.mapped_type_name(doc)?, segment.document_id(doc)?);
        match &self.plan {
            Some(plan) => Ok(Extracted::Handle(plan.plan_loading(reference)?)),
            None => Ok(Extracted::Value(Value::Reference(reference))),
        }
    }
}
