//! Execution of a projection over the hits of a query.

use std::{collections::BTreeMap, sync::Arc};

use log::{debug, warn};
use prism_common::{Result, Value, error::Error};
use prism_index_core::{EntityLoader, IndexReader, SearchHit, Segment};

use crate::{
    collector::Collectors,
    context::{ExtractionContext, ProjectionRequestContext, TransformContext},
    extracted::Extracted,
    extractor::{Extractor, ExtractorTree},
    projection::SearchProjection,
    requirements::{ExtractionRequirements, ExtractionRequirementsBuilder},
    scope::ProjectionScope,
    values::SegmentContext,
};

/// Tuning of [`ProjectionExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    transform_batch_size: usize,
    fail_on_unresolved_load: bool,
    stored_document_cache_size: usize,
}

impl ExecutionOptions {
    pub const DEFAULT_TRANSFORM_BATCH_SIZE: usize = 256;
    pub const DEFAULT_STORED_DOCUMENT_CACHE_SIZE: usize = 128;

    pub fn new() -> ExecutionOptions {
        ExecutionOptions {
            transform_batch_size: Self::DEFAULT_TRANSFORM_BATCH_SIZE,
            fail_on_unresolved_load: false,
            stored_document_cache_size: Self::DEFAULT_STORED_DOCUMENT_CACHE_SIZE,
        }
    }

    /// Number of hits transformed with one [`TransformContext`].
    pub fn transform_batch_size(mut self, size: usize) -> Self {
        self.transform_batch_size = size.max(1);
        self
    }

    /// Turns entities that cannot be loaded into a query failure instead of null
    /// values.
    pub fn fail_on_unresolved_load(mut self, fail: bool) -> Self {
        self.fail_on_unresolved_load = fail;
        self
    }

    /// Number of decoded stored documents kept per segment.
    pub fn stored_document_cache_size(mut self, size: usize) -> Self {
        self.stored_document_cache_size = size.max(1);
        self
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions::new()
    }
}

/// The projected values of a query, in hit order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedHits {
    values: Vec<Value>,
    failed_load: bool,
}

impl ProjectedHits {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Whether some referenced entity could not be loaded; the corresponding
    /// values are null.
    pub fn has_failed_load(&self) -> bool {
        self.failed_load
    }
}

/// A projection requested against a scope, ready to run over the hits of
/// queries on that scope.
pub struct ProjectionExecutor {
    tree: ExtractorTree,
    requirements: ExtractionRequirements,
    options: ExecutionOptions,
}

impl ProjectionExecutor {
    /// Runs the request phase of `projection`.
    ///
    /// # Errors
    ///
    /// Any structural error of the projection: unknown fields, incompatible
    /// types, invalid nesting, conflicting index schemas, incompatible
    /// highlighters.
    pub fn prepare(
        projection: &dyn SearchProjection,
        scope: Arc<ProjectionScope>,
        options: ExecutionOptions,
    ) -> Result<ProjectionExecutor> {
        let mut requirements = ExtractionRequirementsBuilder::new();
        let tree = projection.request(&ProjectionRequestContext::new(scope), &mut requirements)?;
        let requirements = requirements.build();
        debug!(
            "projection requested: {} leaves, {} requirements",
            tree.leaf_count(),
            requirements.len()
        );
        Ok(ProjectionExecutor {
            tree,
            requirements,
            options,
        })
    }

    pub fn requirements(&self) -> &ExtractionRequirements {
        &self.requirements
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Projects `hits`, whose segment positions refer to `segments`.
    pub fn execute(
        &self,
        segments: &[Arc<dyn Segment>],
        hits: &[SearchHit],
        loader: Arc<dyn EntityLoader>,
    ) -> Result<ProjectedHits> {
        let context = ExtractionContext::new();
        let extracted = self.extract(segments, hits, &context)?;
        self.transform(extracted, &context, loader)
    }

    /// Projects hits of a query over `readers`, whose segments are numbered in
    /// reader order.
    pub fn execute_on_readers(
        &self,
        readers: &[Arc<dyn IndexReader>],
        hits: &[SearchHit],
        loader: Arc<dyn EntityLoader>,
    ) -> Result<ProjectedHits> {
        self.execute(&segments_of(readers), hits, loader)
    }

    /// Runs the collection and extraction passes, returning the extracted data of
    /// every hit in hit order. Entity loads are planned into `context`.
    pub fn extract(
        &self,
        segments: &[Arc<dyn Segment>],
        hits: &[SearchHit],
        context: &ExtractionContext,
    ) -> Result<Vec<Extracted>> {
        let groups = group_by_segment(segments, hits)?;
        let collectors = self.collect(&groups, hits)?;
        let filter = self.requirements.stored_field_filter();

        let mut values = self.tree.values(context)?;
        let mut extracted = vec![Extracted::Null; hits.len()];
        for (position, segment, hit_positions) in groups {
            debug!(
                "binding segment {position} (segment {} of index '{}') for {} hits",
                segment.ordinal(),
                segment.index_name(),
                hit_positions.len()
            );
            let segment = Arc::new(SegmentContext::new(
                position,
                segment,
                filter.clone(),
                collectors.clone(),
                self.options.stored_document_cache_size,
            ));
            values.context(&segment)?;
            for hit in hit_positions {
                extracted[hit] = values.get(hits[hit].doc)?;
            }
        }
        Ok(extracted)
    }

    fn collect(
        &self,
        groups: &[SegmentHits],
        hits: &[SearchHit],
    ) -> Result<Arc<Collectors>> {
        let mut collectors = Collectors::new();
        for factory in self.requirements.collector_factories() {
            collectors.insert(factory.key(), factory.create());
        }
        for collector in collectors.iter_mut() {
            for (position, segment, hit_positions) in groups {
                collector.set_segment(*position, segment)?;
                for &hit in hit_positions {
                    collector.collect(hits[hit].doc, hits[hit].score)?;
                }
            }
        }
        Ok(Arc::new(collectors))
    }

    /// Resolves the planned entity loads, then transforms the extracted data in
    /// batches.
    pub fn transform(
        &self,
        extracted: Vec<Extracted>,
        context: &ExtractionContext,
        loader: Arc<dyn EntityLoader>,
    ) -> Result<ProjectedHits> {
        let loaded = context.loading_plan().load(loader)?;
        let mut values = Vec::with_capacity(extracted.len());
        let mut failed_load = false;
        let mut transform_context = TransformContext::new();
        let mut extracted = extracted.into_iter().peekable();
        let mut batch = 0;
        while extracted.peek().is_some() {
            transform_context.reset();
            for data in extracted.by_ref().take(self.options.transform_batch_size) {
                values.push(self.tree.transform(&loaded, data, &mut transform_context)?);
            }
            if transform_context.has_failed_load() {
                warn!(
                    "transform batch {batch}: some entities could not be loaded ({} unresolved in query)",
                    loaded.failed_count()
                );
                if self.options.fail_on_unresolved_load {
                    return Err(Error::invalid_operation(format!(
                        "{} referenced entities could not be loaded",
                        loaded.failed_count()
                    )));
                }
                failed_load = true;
            }
            batch += 1;
        }
        Ok(ProjectedHits {
            values,
            failed_load,
        })
    }
}

/// The segments of `readers`, in reader order.
pub fn segments_of(readers: &[Arc<dyn IndexReader>]) -> Vec<Arc<dyn Segment>> {
    readers.iter().flat_map(|reader| reader.segments()).collect()
}

/// A scanned segment: its position in the query, the segment, and the positions
/// of its hits.
type SegmentHits = (usize, Arc<dyn Segment>, Vec<usize>);

/// Groups hit positions by segment, segments in ascending order and hits in
/// their original order within each segment.
fn group_by_segment(
    segments: &[Arc<dyn Segment>],
    hits: &[SearchHit],
) -> Result<Vec<SegmentHits>> {
    let mut groups = BTreeMap::<usize, Vec<usize>>::new();
    for (position, hit) in hits.iter().enumerate() {
        groups.entry(hit.segment).or_default().push(position);
    }
    groups
        .into_iter()
        .map(|(position, hit_positions)| {
            let segment = segments.get(position).cloned().ok_or_else(|| {
                Error::invalid_arg(
                    "hits",
                    format!("hit references segment {position} of {}", segments.len()),
                )
            })?;
            Ok((position, segment, hit_positions))
        })
        .collect()
}
