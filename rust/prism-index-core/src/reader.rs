//! Index reader contract and search hits.

use std::sync::Arc;

use crate::{DocId, schema::IndexSchema, segment::Segment};

/// A named, searchable index.
///
/// `IndexReader` gives the projection pipeline access to the schema the index was
/// built with and to the segments a query scans. Segments returned by
/// [`segments`](Self::segments) must report the owning index through
/// [`Segment::index_name`].
pub trait IndexReader: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn schema(&self) -> &Arc<IndexSchema>;

    fn segments(&self) -> Vec<Arc<dyn Segment>>;
}

/// One matching document, as produced by the engine's query execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Position of the segment in the list of segments scanned by the query.
    pub segment: usize,
    /// Segment-local id of the matching root document.
    pub doc: DocId,
    /// Rank score computed by the engine, `NaN` when scoring was not requested.
    pub score: f32,
}

impl SearchHit {
    pub fn new(segment: usize, doc: DocId, score: f32) -> SearchHit {
        SearchHit {
            segment,
            doc,
            score,
        }
    }

    /// This hit in a query whose segment list has `offset` segments before the
    /// ones of the hit's index.
    pub fn with_segment_offset(self, offset: usize) -> SearchHit {
        SearchHit {
            segment: self.segment + offset,
            ..self
        }
    }
}
