//! Projection evaluated once per object of an object field.

use std::sync::Arc;

use prism_common::{Result, Value, error::Error};
use prism_index_core::DocId;

use super::{SearchProjection, unexpected};
use crate::{
    accumulator::{Accumulated, Accumulator},
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree, TreeValues},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    values::{
        SegmentContext, Values,
        nested::{DocumentValueSource, NestedAccumulatingValues, NestedDocsProvider},
    },
};

/// Evaluates `inner` for every object of the object field at `path` and
/// accumulates the results.
///
/// `inner` is requested in the context of the object field, so its field
/// projections use paths below `path` and may be single-valued whenever the
/// field is single-valued within one object.
pub struct ObjectProjection {
    path: String,
    inner: Arc<dyn SearchProjection>,
    accumulator: Accumulator,
}

impl ObjectProjection {
    pub fn new(
        path: impl Into<String>,
        inner: impl SearchProjection + 'static,
        accumulator: Accumulator,
    ) -> ObjectProjection {
        ObjectProjection {
            path: path.into(),
            inner: Arc::new(inner),
            accumulator,
        }
    }
}

impl SearchProjection for ObjectProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_valid_field(&self.path)?;
        let field = context.scope().resolve_field(&self.path)?;
        let node = field.node();
        if !node.is_object() {
            return Err(Error::type_incompatibility(
                &self.path,
                &field.index_names(),
                "object projections require an object field",
            ));
        }
        context.check_cardinality(&field, self.accumulator)?;

        let (inner_context, nested) = if node.is_nested_object() {
            (
                context.for_field(&self.path, true),
                context.nested_docs(Some(&self.path), requirements),
            )
        } else {
            // Values of a flattened object cannot be told apart once several
            // objects share a document.
            if field.is_multi_valued_relative_to(field.nested_path()) {
                return Err(Error::invalid_nesting_context(
                    &self.path,
                    &field.index_names(),
                    "a multi-valued object field must be declared nested to be projected per object",
                ));
            }
            let enclosing = match field.nested_path() {
                Some(nested) if context.current_nested_field_path() != Some(nested) => {
                    context.for_field(nested, true)
                }
                _ => context.clone(),
            };
            (
                enclosing.for_field(&self.path, false),
                context.nested_docs(field.nested_path(), requirements),
            )
        };

        let inner = self.inner.request(&inner_context, requirements)?;
        Ok(ExtractorTree::leaf(ObjectExtractor {
            inner,
            accumulator: self.accumulator,
            nested,
        }))
    }
}

struct ObjectExtractor {
    inner: ExtractorTree,
    accumulator: Accumulator,
    nested: Option<NestedDocsProvider>,
}

impl Extractor for ObjectExtractor {
    fn values(&self, context: &ExtractionContext) -> Result<Box<dyn Values>> {
        let source = ObjectSource {
            leaves: TreeValues::new(self.inner.leaf_values(context)?),
        };
        Ok(Box::new(NestedAccumulatingValues::new(
            source,
            self.accumulator,
            self.nested.clone(),
        )))
    }

    fn transform(
        &self,
        loaded: &LoadedEntities,
        data: Extracted,
        context: &mut TransformContext,
    ) -> Result<Value> {
        match data {
            Extracted::Objects(objects) => {
                let objects = self.accumulator.transform_all(objects, |leaves| {
                    self.inner.transform_leaves(loaded, leaves, context)
                })?;
                Ok(self.accumulator.finish(objects))
            }
            Extracted::Null => Ok(self.accumulator.empty_result()),
            other => Err(unexpected("object projection", &other)),
        }
    }
}

/// Extracts the leaves of the inner tree for each object document.
struct ObjectSource {
    leaves: TreeValues,
}

impl DocumentValueSource for ObjectSource {
    type Item = Vec<Extracted>;

    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.leaves.context(segment)
    }

    fn collect(
        &mut self,
        doc: DocId,
        accumulator: Accumulator,
        accumulated: &mut Accumulated<Vec<Extracted>>,
    ) -> Result<()> {
        if accumulator.is_single_valued() && !accumulated.is_empty() {
            return Ok(());
        }
        accumulator.accumulate(accumulated, self.leaves.get_leaves(doc)?);
        Ok(())
    }

    fn wrap(&self, accumulated: Accumulated<Vec<Extracted>>) -> Extracted {
        Extracted::Objects(accumulated)
    }
}
