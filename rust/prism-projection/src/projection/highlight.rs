//! Projection of highlighted fragments of text fields.

use std::sync::Arc;

use prism_common::{Result, Value, ValueType, error::Error};
use prism_index_core::{DocId, FieldCodec, Highlighter};

use super::{SearchProjection, dispatch, unexpected};
use crate::{
    accumulator::{Accumulated, Accumulator},
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    values::{
        SegmentContext, Values,
        nested::{DocumentValueSource, NestedAccumulatingValues, NestedDocsProvider},
        stored::StoredFieldSource,
    },
};

#[derive(Clone)]
pub struct HighlightProjectionBuilder {
    path: String,
    highlighter: Option<Arc<dyn Highlighter>>,
}

impl HighlightProjectionBuilder {
    pub fn new(path: impl Into<String>) -> HighlightProjectionBuilder {
        HighlightProjectionBuilder {
            path: path.into(),
            highlighter: None,
        }
    }

    pub fn highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    pub fn build(self, accumulator: Accumulator) -> HighlightProjection {
        HighlightProjection {
            path: self.path,
            highlighter: self.highlighter,
            accumulator,
        }
    }
}

/// Projects the fragments of a stored text field that match the query, as
/// `Value::String`s.
#[derive(Clone)]
pub struct HighlightProjection {
    path: String,
    highlighter: Option<Arc<dyn Highlighter>>,
    accumulator: Accumulator,
}

impl SearchProjection for HighlightProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_valid_field(&self.path)?;
        let highlighter = self.highlighter.clone().ok_or_else(|| {
            Error::invalid_arg("highlighter", "highlight projections need a highlighter")
        })?;
        let highlighter_type = highlighter.highlighter_type();
        let field = context.scope().resolve_field(&self.path)?;
        for (schema, node) in field.nodes() {
            if node.codec().map(|c| c.value_type()) != Some(ValueType::String) {
                return Err(Error::highlighter_incompatible(
                    &self.path,
                    &[schema.name()],
                    "only text fields can be highlighted",
                ));
            }
            if !node.supports_highlighter(highlighter_type) {
                return Err(Error::highlighter_incompatible(
                    &self.path,
                    &[schema.name()],
                    format!("field does not support the {highlighter_type:?} highlighter"),
                ));
            }
            if !node.is_stored() {
                return Err(Error::field_not_projectable(
                    &self.path,
                    &[schema.name()],
                    "highlighting requires stored values",
                ));
            }
        }
        if self.accumulator.is_single_valued() && highlighter.max_fragments() != Some(1) {
            return Err(Error::highlighter_incompatible(
                &self.path,
                &field.index_names(),
                "a single-valued highlight projection needs a highlighter returning a single fragment",
            ));
        }
        context.check_cardinality(&field, self.accumulator)?;

        let nested = context.nested_docs(field.nested_path(), requirements);
        requirements.require_stored_field(&self.path, field.nested_path());
        let mut per_index = Vec::with_capacity(field.nodes().len());
        for (schema, node) in field.nodes() {
            let codec = node.codec().cloned().ok_or_else(|| {
                Error::field_not_projectable(&self.path, &[schema.name()], "field has no codec")
            })?;
            let extractor = HighlightExtractor {
                path: self.path.clone(),
                codec,
                highlighter: highlighter.clone(),
                accumulator: self.accumulator,
                nested: nested.clone(),
            };
            per_index.push((
                schema.name().to_string(),
                Arc::new(extractor) as Arc<dyn Extractor>,
            ));
        }
        Ok(dispatch::by_index(
            context.scope(),
            per_index,
            self.accumulator.empty_result(),
        ))
    }
}

struct HighlightExtractor {
    path: String,
    codec: Arc<dyn FieldCodec>,
    highlighter: Arc<dyn Highlighter>,
    accumulator: Accumulator,
    nested: Option<NestedDocsProvider>,
}

impl Extractor for HighlightExtractor {
    fn values(&self, _context: &ExtractionContext) -> Result<Box<dyn Values>> {
        let source = HighlightSource {
            path: self.path.clone(),
            stored: StoredFieldSource::new(self.path.clone(), self.codec.clone()),
            highlighter: self.highlighter.clone(),
        };
        Ok(Box::new(NestedAccumulatingValues::new(
            source,
            self.accumulator,
            self.nested.clone(),
        )))
    }

    fn transform(
        &self,
        _loaded: &LoadedEntities,
        data: Extracted,
        _context: &mut TransformContext,
    ) -> Result<Value> {
        match data {
            Extracted::Values(fragments) => Ok(self.accumulator.finish(fragments)),
            Extracted::Null => Ok(self.accumulator.empty_result()),
            other => Err(unexpected("highlight projection", &other)),
        }
    }
}

struct HighlightSource {
    path: String,
    stored: StoredFieldSource,
    highlighter: Arc<dyn Highlighter>,
}

impl DocumentValueSource for HighlightSource {
    type Item = Value;

    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.stored.context(segment)
    }

    fn collect(
        &mut self,
        doc: DocId,
        accumulator: Accumulator,
        accumulated: &mut Accumulated<Value>,
    ) -> Result<()> {
        for text in self.stored.read(doc)? {
            let text = text.try_into_string(&self.path)?;
            let fragments = self.highlighter.fragments(&self.path, &text)?;
            accumulator.accumulate_all(accumulated, fragments.into_iter().map(Value::String));
        }
        Ok(())
    }

    fn wrap(&self, accumulated: Accumulated<Value>) -> Extracted {
        Extracted::Values(accumulated)
    }
}
