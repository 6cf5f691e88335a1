//! Projections of value fields.

use std::sync::Arc;

use prism_common::{Result, Value, ValueType, error::Error};
use prism_index_core::{FieldCodec, IndexSchema, ProjectionConverter, SchemaFieldNode};

use super::{SearchProjection, dispatch, unexpected};
use crate::{
    accumulator::Accumulator,
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    scope::ResolvedField,
    values::{
        Values,
        doc_values::DocValuesSource,
        nested::{NestedAccumulatingValues, NestedDocsProvider},
        stored::StoredFieldSource,
    },
};

/// Configures a [`FieldProjection`].
#[derive(Debug, Clone)]
pub struct FieldProjectionBuilder {
    path: String,
    value_convert: bool,
    order_preserving: bool,
    expected_type: Option<ValueType>,
}

impl FieldProjectionBuilder {
    pub fn new(path: impl Into<String>) -> FieldProjectionBuilder {
        FieldProjectionBuilder {
            path: path.into(),
            value_convert: true,
            order_preserving: false,
            expected_type: None,
        }
    }

    /// Whether values go through the field's projection converter (the default)
    /// or are returned as decoded by the field codec.
    pub fn value_convert(mut self, value_convert: bool) -> Self {
        self.value_convert = value_convert;
        self
    }

    /// Requires the values of multi-valued fields in their indexing order, even
    /// with an unordered accumulator.
    pub fn order_preserving(mut self) -> Self {
        self.order_preserving = true;
        self
    }

    /// Requires the projected values to be of `value_type`.
    pub fn expect_type(mut self, value_type: ValueType) -> Self {
        self.expected_type = Some(value_type);
        self
    }

    pub fn build(self, accumulator: Accumulator) -> FieldProjection {
        FieldProjection {
            path: self.path,
            value_convert: self.value_convert,
            order_preserving: self.order_preserving || accumulator.preserves_order(),
            expected_type: self.expected_type,
            accumulator,
        }
    }
}

/// Projects the values of a value field.
#[derive(Debug, Clone)]
pub struct FieldProjection {
    path: String,
    value_convert: bool,
    order_preserving: bool,
    expected_type: Option<ValueType>,
    accumulator: Accumulator,
}

impl FieldProjection {
    pub fn single(path: impl Into<String>) -> FieldProjection {
        FieldProjectionBuilder::new(path).build(Accumulator::Single)
    }

    pub fn list(path: impl Into<String>) -> FieldProjection {
        FieldProjectionBuilder::new(path).build(Accumulator::List)
    }

    fn check_type(&self, field: &ResolvedField) -> Result<()> {
        let Some(expected) = self.expected_type else {
            return Ok(());
        };
        for (schema, node) in field.nodes() {
            let supported = if self.value_convert {
                node.converter().is_some_and(|c| c.supports(expected))
            } else {
                expected == ValueType::Any
                    || node.codec().is_some_and(|c| c.value_type() == expected)
            };
            if !supported {
                return Err(Error::type_incompatibility(
                    &self.path,
                    &[schema.name()],
                    format!("values cannot be projected as {expected:?}"),
                ));
            }
        }
        Ok(())
    }

    fn extractor(
        &self,
        field: &ResolvedField,
        schema: &IndexSchema,
        node: &SchemaFieldNode,
        nested: Option<NestedDocsProvider>,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<FieldExtractor> {
        let preserve_order =
            self.order_preserving && field.is_multi_valued_relative_to(field.nested_path());
        let source = select_source(&self.path, schema, node, preserve_order)?;
        if matches!(source, FieldSource::Stored(_)) {
            requirements.require_stored_field(&self.path, node.nested_path());
        }
        Ok(FieldExtractor {
            path: self.path.clone(),
            source,
            accumulator: self.accumulator,
            nested,
            converter: if self.value_convert {
                node.converter().cloned()
            } else {
                None
            },
        })
    }
}

impl SearchProjection for FieldProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_valid_field(&self.path)?;
        let field = context.scope().resolve_field(&self.path)?;
        if field.node().is_object() {
            return Err(Error::field_not_projectable(
                &self.path,
                &field.index_names(),
                "object fields are projected with object projections",
            ));
        }
        if self.value_convert {
            field.check_compatible_converters()?;
        } else {
            field.check_compatible_codecs()?;
        }
        self.check_type(&field)?;
        context.check_cardinality(&field, self.accumulator)?;

        let nested = context.nested_docs(field.nested_path(), requirements);
        let mut per_index = Vec::with_capacity(field.nodes().len());
        for (schema, node) in field.nodes() {
            let extractor = self.extractor(&field, schema, node, nested.clone(), requirements)?;
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

/// Where the values of a field are read from.
#[derive(Debug, Clone)]
pub(crate) enum FieldSource {
    Stored(Arc<dyn FieldCodec>),
    DocValues,
}

/// Picks the cheapest source able to serve the field: doc values unless the
/// indexing order of multi-valued fields must be preserved.
pub(crate) fn select_source(
    path: &str,
    schema: &IndexSchema,
    node: &SchemaFieldNode,
    preserve_order: bool,
) -> Result<FieldSource> {
    let codec = node.codec().ok_or_else(|| {
        Error::field_not_projectable(path, &[schema.name()], "field has no codec")
    })?;
    if preserve_order {
        return if node.is_stored() {
            Ok(FieldSource::Stored(codec.clone()))
        } else {
            Err(Error::field_not_projectable(
                path,
                &[schema.name()],
                "preserving the order of a multi-valued field requires stored values",
            ))
        };
    }
    if node.has_doc_values() {
        Ok(FieldSource::DocValues)
    } else if node.is_stored() {
        Ok(FieldSource::Stored(codec.clone()))
    } else {
        Err(Error::field_not_projectable(
            path,
            &[schema.name()],
            "field is neither stored nor doc-valued",
        ))
    }
}

/// Boxes the cursor reading `source` for the field at `path`.
pub(crate) fn source_values(
    path: &str,
    source: &FieldSource,
    accumulator: Accumulator,
    nested: Option<NestedDocsProvider>,
) -> Box<dyn Values> {
    match source {
        FieldSource::Stored(codec) => Box::new(NestedAccumulatingValues::new(
            StoredFieldSource::new(path, codec.clone()),
            accumulator,
            nested,
        )),
        FieldSource::DocValues => Box::new(NestedAccumulatingValues::new(
            DocValuesSource::new(path),
            accumulator,
            nested,
        )),
    }
}

struct FieldExtractor {
    path: String,
    source: FieldSource,
    accumulator: Accumulator,
    nested: Option<NestedDocsProvider>,
    converter: Option<Arc<dyn ProjectionConverter>>,
}

impl Extractor for FieldExtractor {
    fn values(&self, _context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(source_values(
            &self.path,
            &self.source,
            self.accumulator,
            self.nested.clone(),
        ))
    }

    fn transform(
        &self,
        _loaded: &LoadedEntities,
        data: Extracted,
        _context: &mut TransformContext,
    ) -> Result<Value> {
        match data {
            Extracted::Values(values) => {
                let values = match &self.converter {
                    Some(converter) => self
                        .accumulator
                        .transform_all(values, |value| converter.convert(value))?,
                    None => values,
                };
                Ok(self.accumulator.finish(values))
            }
            Extracted::Null => Ok(self.accumulator.empty_result()),
            other => Err(unexpected("field projection", &other)),
        }
    }
}
