//! Projection of the distance between a geo-point field and a fixed point.
//!
//! Single-valued fields of root documents are served by a distance collector fed
//! with the hits; single-valued fields of nested documents read the doc-value
//! column of each child. Multi-valued fields are rescanned from their stored
//! values, so every distance stays associated with the point it was computed
//! from, in indexing order.

use std::sync::Arc;

use prism_common::{GeoPoint, Result, Value, ValueType, error::Error};
use prism_index_core::{DocId, IndexSchema, SchemaFieldNode};

use super::{
    SearchProjection, dispatch,
    field::{FieldSource, select_source, source_values},
    unexpected,
};
use crate::{
    accumulator::Accumulator,
    collector::{CollectorKey, DistanceCollector, DistanceCollectorFactory},
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    requirements::ExtractionRequirementsBuilder,
    scope::ResolvedField,
    values::{SegmentContext, Values, bound, nested::NestedDocsProvider},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Meters,
    Kilometers,
    Miles,
    NauticalMiles,
    Yards,
    Feet,
}

impl DistanceUnit {
    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Meters => meters,
            DistanceUnit::Kilometers => meters / 1_000.0,
            DistanceUnit::Miles => meters / 1_609.344,
            DistanceUnit::NauticalMiles => meters / 1_852.0,
            DistanceUnit::Yards => meters / 0.9144,
            DistanceUnit::Feet => meters / 0.3048,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DistanceProjectionBuilder {
    path: String,
    center: GeoPoint,
    unit: DistanceUnit,
}

impl DistanceProjectionBuilder {
    pub fn new(path: impl Into<String>, center: GeoPoint) -> DistanceProjectionBuilder {
        DistanceProjectionBuilder {
            path: path.into(),
            center,
            unit: DistanceUnit::Meters,
        }
    }

    pub fn unit(mut self, unit: DistanceUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn build(self, accumulator: Accumulator) -> DistanceProjection {
        DistanceProjection {
            path: self.path,
            center: self.center,
            unit: self.unit,
            accumulator,
        }
    }
}

/// Projects distances from `center` to the points of a geo-point field.
#[derive(Debug, Clone)]
pub struct DistanceProjection {
    path: String,
    center: GeoPoint,
    unit: DistanceUnit,
    accumulator: Accumulator,
}

impl DistanceProjection {
    fn source(
        &self,
        context: &ProjectionRequestContext,
        field: &ResolvedField,
        schema: &IndexSchema,
        node: &SchemaFieldNode,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<DistanceSource> {
        if field.is_multi_valued_relative_to(field.nested_path()) {
            let source = select_source(&self.path, schema, node, true)?;
            requirements.require_stored_field(&self.path, node.nested_path());
            return Ok(DistanceSource::Field(source));
        }
        let on_hits =
            context.current_nested_field_path().is_none() && field.nested_path().is_none();
        if on_hits && node.has_doc_values() {
            let factory = DistanceCollectorFactory {
                path: self.path.clone(),
                center: self.center,
            };
            let key = DistanceCollector::key(&self.path, self.center);
            requirements.require_collector(Arc::new(factory));
            return Ok(DistanceSource::Collector(key));
        }
        let source = select_source(&self.path, schema, node, false)?;
        if matches!(source, FieldSource::Stored(_)) {
            requirements.require_stored_field(&self.path, node.nested_path());
        }
        Ok(DistanceSource::Field(source))
    }
}

impl SearchProjection for DistanceProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        context.check_valid_field(&self.path)?;
        let field = context.scope().resolve_field(&self.path)?;
        for (schema, node) in field.nodes() {
            if node.codec().map(|c| c.value_type()) != Some(ValueType::GeoPoint) {
                return Err(Error::type_incompatibility(
                    &self.path,
                    &[schema.name()],
                    "distances can only be computed from geo-point fields",
                ));
            }
        }
        context.check_cardinality(&field, self.accumulator)?;

        let nested = context.nested_docs(field.nested_path(), requirements);
        let mut per_index = Vec::with_capacity(field.nodes().len());
        for (schema, node) in field.nodes() {
            let source = self.source(context, &field, schema, node, requirements)?;
            let extractor = DistanceExtractor {
                path: self.path.clone(),
                center: self.center,
                unit: self.unit,
                accumulator: self.accumulator,
                source,
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

enum DistanceSource {
    /// Distances in meters computed by a collector over the hits.
    Collector(CollectorKey),
    /// Points read from the field, turned into distances at transform time.
    Field(FieldSource),
}

struct DistanceExtractor {
    path: String,
    center: GeoPoint,
    unit: DistanceUnit,
    accumulator: Accumulator,
    source: DistanceSource,
    nested: Option<NestedDocsProvider>,
}

impl DistanceExtractor {
    fn distance(&self, value: Value) -> Result<Value> {
        let meters = match value {
            Value::F64(meters) => meters,
            Value::GeoPoint(point) => self.center.distance_meters(&point),
            other => {
                return Err(Error::conversion(
                    &self.path,
                    format!("expected a geo point, got {other}"),
                ));
            }
        };
        Ok(Value::F64(self.unit.from_meters(meters)))
    }
}

impl Extractor for DistanceExtractor {
    fn values(&self, _context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(match &self.source {
            DistanceSource::Collector(key) => Box::new(CollectedDistanceValues {
                key: key.clone(),
                accumulator: self.accumulator,
                segment: None,
            }),
            DistanceSource::Field(source) => {
                source_values(&self.path, source, self.accumulator, self.nested.clone())
            }
        })
    }

    fn transform(
        &self,
        _loaded: &LoadedEntities,
        data: Extracted,
        _context: &mut TransformContext,
    ) -> Result<Value> {
        match data {
            Extracted::Values(values) => {
                let distances = self
                    .accumulator
                    .transform_all(values, |value| self.distance(value))?;
                Ok(self.accumulator.finish(distances))
            }
            Extracted::Null => Ok(self.accumulator.empty_result()),
            other => Err(unexpected("distance projection", &other)),
        }
    }
}

struct CollectedDistanceValues {
    key: CollectorKey,
    accumulator: Accumulator,
    segment: Option<Arc<SegmentContext>>,
}

impl Values for CollectedDistanceValues {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.segment = Some(segment.clone());
        Ok(())
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        let segment = bound(&self.segment)?;
        let mut accumulated = self.accumulator.create_initial();
        let distance = segment
            .collectors()
            .get::<DistanceCollector>(&self.key)?
            .distance(segment.position(), doc);
        if let Some(meters) = distance {
            self.accumulator
                .accumulate(&mut accumulated, Value::F64(meters));
        }
        Ok(Extracted::Values(accumulated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(DistanceUnit::Kilometers.from_meters(1_500.0), 1.5);
        assert!((DistanceUnit::Miles.from_meters(1_609.344) - 1.0).abs() < 1e-12);
        assert_eq!(DistanceUnit::Meters.from_meters(3.0), 3.0);
    }
}
