//! Evaluation of a projection at the root document from within nested objects.

use std::sync::Arc;

use prism_common::{Result, Value, error::Error};
use prism_index_core::DocId;
use roaring::RoaringBitmap;

use super::SearchProjection;
use crate::{
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    values::{SegmentContext, Values},
};

/// Evaluates `inner` against the root document of the current document.
///
/// At the root this is the inner projection itself. Inside object projections,
/// every document is mapped to its root, the closest preceding root document in
/// the parent-first layout.
pub struct RootContextProjection {
    inner: Arc<dyn SearchProjection>,
}

impl RootContextProjection {
    pub fn new(inner: impl SearchProjection + 'static) -> RootContextProjection {
        RootContextProjection {
            inner: Arc::new(inner),
        }
    }
}

impl SearchProjection for RootContextProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        if context.is_root() {
            return self.inner.request(context, requirements);
        }
        let inner = self.inner.request(&context.root(), requirements)?;
        Ok(ExtractorTree::leaf(RootRemapExtractor { inner }))
    }
}

struct RootRemapExtractor {
    inner: ExtractorTree,
}

impl Extractor for RootRemapExtractor {
    fn values(&self, context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(Box::new(RootRemapValues {
            inner: self.inner.values(context)?,
            roots: None,
        }))
    }

    fn transform(
        &self,
        loaded: &LoadedEntities,
        data: Extracted,
        context: &mut TransformContext,
    ) -> Result<Value> {
        self.inner.transform(loaded, data, context)
    }
}

struct RootRemapValues {
    inner: Box<dyn Values>,
    roots: Option<Arc<RoaringBitmap>>,
}

impl Values for RootRemapValues {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.roots = Some(segment.segment().documents_at_path(None)?);
        self.inner.context(segment)
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        let roots = self
            .roots
            .as_ref()
            .ok_or_else(|| Error::invalid_operation("Values::get called before Values::context"))?;
        let root = root_of(roots, doc)
            .ok_or_else(|| Error::invalid_operation(format!("document {doc} has no root")))?;
        self.inner.get(root)
    }
}

/// The greatest root document id lower than or equal to `doc`.
fn root_of(roots: &RoaringBitmap, doc: DocId) -> Option<DocId> {
    match roots.rank(doc) {
        0 => None,
        rank => u32::try_from(rank - 1).ok().and_then(|i| roots.select(i)),
    }
}
