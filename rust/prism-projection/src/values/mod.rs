//! Segment-scoped value cursors.
//!
//! A [`Values`] cursor is created once per projection per query and rebound to
//! every segment the query scans. All its cached state is segment-scoped and is
//! replaced by the next [`Values::context`] call, so distinct cursors can be
//! driven concurrently without coordination.

use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use prism_common::{Result, error::Error};
use prism_index_core::{DocId, Segment, StoredDocument, StoredFieldFilter};

use crate::{collector::Collectors, extracted::Extracted};

pub mod doc_values;
pub mod nested;
pub mod stored;

/// Lazy source of the extracted data of one projection, keyed by document id.
///
/// `context` must be called before the first `get` of each segment; calls on one
/// cursor are sequential.
pub trait Values: Send {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()>;

    fn get(&mut self, doc: DocId) -> Result<Extracted>;
}

/// Returns the segment a cursor is bound to, or an error when `get` is called
/// before `context`.
pub(crate) fn bound(segment: &Option<Arc<SegmentContext>>) -> Result<&Arc<SegmentContext>> {
    segment
        .as_ref()
        .ok_or_else(|| Error::invalid_operation("Values::get called before Values::context"))
}

/// The segment currently scanned, shared by all the value cursors of a query.
pub struct SegmentContext {
    position: usize,
    segment: Arc<dyn Segment>,
    stored: StoredDocumentCache,
    collectors: Arc<Collectors>,
}

impl SegmentContext {
    pub fn new(
        position: usize,
        segment: Arc<dyn Segment>,
        filter: StoredFieldFilter,
        collectors: Arc<Collectors>,
        stored_document_cache_size: usize,
    ) -> SegmentContext {
        SegmentContext {
            position,
            segment,
            stored: StoredDocumentCache::new(filter, stored_document_cache_size),
            collectors,
        }
    }

    pub fn segment(&self) -> &Arc<dyn Segment> {
        &self.segment
    }

    /// Position of the segment in the list scanned by the query; collected
    /// per-hit results are keyed by it.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn index_name(&self) -> &str {
        self.segment.index_name()
    }

    pub fn collectors(&self) -> &Collectors {
        &self.collectors
    }

    /// Loads the required stored fields of `doc`.
    ///
    /// Several projections usually read the same document; it is decoded once and
    /// shared.
    pub fn stored_document(&self, doc: DocId) -> Result<Arc<StoredDocument>> {
        self.stored.get_or_load(self.segment.as_ref(), doc)
    }
}

/// Small bounded cache of decoded stored documents.
struct StoredDocumentCache {
    filter: StoredFieldFilter,
    capacity: usize,
    documents: Mutex<AHashMap<DocId, Arc<StoredDocument>>>,
}

impl StoredDocumentCache {
    fn new(filter: StoredFieldFilter, capacity: usize) -> StoredDocumentCache {
        StoredDocumentCache {
            filter,
            capacity: capacity.max(1),
            documents: Mutex::new(AHashMap::new()),
        }
    }

    fn get_or_load(&self, segment: &dyn Segment, doc: DocId) -> Result<Arc<StoredDocument>> {
        if self.filter.is_empty() {
            return Ok(Arc::new(StoredDocument::new()));
        }
        let mut documents = self
            .documents
            .lock()
            .map_err(|_| Error::invalid_operation("stored document cache lock poisoned"))?;
        if let Some(document) = documents.get(&doc) {
            return Ok(document.clone());
        }
        let document = Arc::new(segment.stored_document(doc, &self.filter)?);
        if documents.len() >= self.capacity {
            documents.clear();
        }
        documents.insert(doc, document.clone());
        Ok(document)
    }
}
