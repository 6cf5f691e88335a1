//! Per-index dispatch for queries spanning indexes with different schemas.

use std::sync::Arc;

use ahash::AHashMap;
use prism_common::{Result, Value, error::Error};
use prism_index_core::DocId;

use super::unexpected;
use crate::{
    context::{ExtractionContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    loading::LoadedEntities,
    scope::ProjectionScope,
    values::{SegmentContext, Values},
};

/// Builds the tree of a projection resolved separately in each index.
///
/// `per_index` lists the indexes where the projection applies; hits of other
/// indexes transform to `fallback`. When the scope holds a single index and the
/// projection applies to it, its extractor is used directly.
pub fn by_index(
    scope: &ProjectionScope,
    mut per_index: Vec<(String, Arc<dyn Extractor>)>,
    fallback: Value,
) -> ExtractorTree {
    if scope.is_single_index() && per_index.len() == 1 {
        let (_, extractor) = per_index.swap_remove(0);
        return ExtractorTree::from_arc(extractor);
    }
    let mut by_index = AHashMap::with_capacity(per_index.len());
    let mut slots = Vec::with_capacity(per_index.len());
    for (index, extractor) in per_index {
        by_index.insert(index, slots.len());
        slots.push(extractor);
    }
    ExtractorTree::leaf(IndexDispatchExtractor {
        slots,
        by_index: Arc::new(by_index),
        fallback,
    })
}

struct IndexDispatchExtractor {
    slots: Vec<Arc<dyn Extractor>>,
    by_index: Arc<AHashMap<String, usize>>,
    fallback: Value,
}

impl Extractor for IndexDispatchExtractor {
    fn values(&self, context: &ExtractionContext) -> Result<Box<dyn Values>> {
        Ok(Box::new(IndexDispatchValues {
            slots: self
                .slots
                .iter()
                .map(|slot| slot.values(context))
                .collect::<Result<_>>()?,
            by_index: self.by_index.clone(),
            current: None,
        }))
    }

    fn transform(
        &self,
        loaded: &LoadedEntities,
        data: Extracted,
        context: &mut TransformContext,
    ) -> Result<Value> {
        match data {
            Extracted::Dispatched { slot, data } => match self.slots.get(slot) {
                Some(extractor) => extractor.transform(loaded, *data, context),
                None => Err(unexpected("index dispatch", &Extracted::Dispatched { slot, data })),
            },
            Extracted::Null => Ok(self.fallback.clone()),
            other => Err(unexpected("index dispatch", &other)),
        }
    }
}

struct IndexDispatchValues {
    slots: Vec<Box<dyn Values>>,
    by_index: Arc<AHashMap<String, usize>>,
    /// `None` before the first segment, `Some(None)` for segments of indexes
    /// where the projection does not apply.
    current: Option<Option<usize>>,
}

impl Values for IndexDispatchValues {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        let slot = self.by_index.get(segment.index_name()).copied();
        if let Some(slot) = slot {
            self.slots[slot].context(segment)?;
        }
        self.current = Some(slot);
        Ok(())
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        match self.current {
            None => Err(Error::invalid_operation(
                "Values::get called before Values::context",
            )),
            Some(None) => Ok(Extracted::Null),
            Some(Some(slot)) => Ok(Extracted::Dispatched {
                slot,
                data: Box::new(self.slots[slot].get(doc)?),
            }),
        }
    }
}
