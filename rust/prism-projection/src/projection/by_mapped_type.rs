//! Dispatch of projections by the mapped type of each hit.

use std::sync::Arc;

use ahash::AHashMap;
use prism_common::{Result, Value, error::Error};
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

/// Applies a different projection depending on the mapped type each hit was
/// indexed as.
///
/// A hit whose mapped type has no registered projection fails the query with
/// `UnresolvedMappedType`: the indexed data no longer matches the types known at
/// request time.
#[derive(Default)]
pub struct ByMappedTypeProjection {
    projections: Vec<(String, Arc<dyn SearchProjection>)>,
}

impl ByMappedTypeProjection {
    pub fn new() -> ByMappedTypeProjection {
        Default::default()
    }

    pub fn with(
        mut self,
        type_name: impl Into<String>,
        projection: impl SearchProjection + 'static,
    ) -> Self {
        self.projections.push((type_name.into(), Arc::new(projection)));
        self
    }
}

impl SearchProjection for ByMappedTypeProjection {
    fn request(
        &self,
        context: &ProjectionRequestContext,
        requirements: &mut ExtractionRequirementsBuilder,
    ) -> Result<ExtractorTree> {
        let mut by_type = AHashMap::with_capacity(self.projections.len());
        let mut slots = Vec::with_capacity(self.projections.len());
        for (type_name, projection) in &self.projections {
            if by_type.insert(type_name.clone(), slots.len()).is_some() {
                return Err(Error::invalid_arg(
                    "type_name",
                    format!("mapped type '{type_name}' registered twice"),
                ));
            }
            slots.push(projection.request(context, requirements)?);
        }
        Ok(ExtractorTree::leaf(MappedTypeExtractor {
            slots,
            by_type: Arc::new(by_type),
            names: self.projections.iter().map(|(name, _)| name.clone()).collect(),
        }))
    }
}

struct MappedTypeExtractor {
    slots: Vec<ExtractorTree>,
    by_type: Arc<AHashMap<String, usize>>,
    /// Type name of each slot.
    names: Arc<[String]>,
}

impl Extractor for MappedTypeExtractor {
    fn values(&self, context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(Box::new(MappedTypeValues {
            slots: self
                .slots
                .iter()
                .map(|slot| slot.values(context))
                .collect::<Result<_>>()?,
            by_type: self.by_type.clone(),
            names: self.names.clone(),
            segment: None,
            last_slot: None,
        }))
    }

    fn transform(
        &self,
        loaded: &LoadedEntities,
        data: Extracted,
        context: &mut TransformContext,
    ) -> Result<Value> {
        match data {
            Extracted::Dispatched { slot, data } if slot < self.slots.len() => {
                self.slots[slot].transform(loaded, *data, context)
            }
            other => Err(unexpected("mapped type dispatch", &other)),
        }
    }
}

struct MappedTypeValues {
    slots: Vec<Box<dyn Values>>,
    by_type: Arc<AHashMap<String, usize>>,
    names: Arc<[String]>,
    segment: Option<Arc<SegmentContext>>,
    /// Slot of the previous hit of the bound segment; hits of one segment
    /// usually share their mapped type.
    last_slot: Option<usize>,
}

impl MappedTypeValues {
    fn resolve(&mut self, type_name: &str) -> Result<usize> {
        if let Some(slot) = self.last_slot.filter(|&slot| self.names[slot] == type_name) {
            return Ok(slot);
        }
        let slot = *self
            .by_type
            .get(type_name)
            .ok_or_else(|| Error::unresolved_mapped_type(type_name))?;
        self.last_slot = Some(slot);
        Ok(slot)
    }
}

impl Values for MappedTypeValues {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.segment = Some(segment.clone());
        self.last_slot = None;
        self.slots
            .iter_mut()
            .try_for_each(|slot| slot.context(segment))
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        let segment = bound(&self.segment)?.clone();
        let slot = self.resolve(segment.segment().mapped_type_name(doc)?)?;
        Ok(Extracted::Dispatched {
            slot,
            data: Box::new(self.slots[slot].get(doc)?),
        })
    }
}
