//! Accumulation of values across nested child documents.
//!
//! Nested objects are indexed as separate documents laid out parent-first: each
//! document is immediately followed by its nested descendants. The children of a
//! parent `p` at nested path `n` are therefore the documents indexed at `n`
//! found between `p` and the next document that is at the parent's level or
//! above (the "parent filter").

use std::sync::Arc;

use log::trace;
use prism_common::{Result, error::Error};
use prism_index_core::{DocId, Segment};
use roaring::RoaringBitmap;

use super::{SegmentContext, Values, bound};
use crate::{
    accumulator::{Accumulated, Accumulator},
    extracted::Extracted,
};

/// Request-time description of a parent to child resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedDocsProvider {
    /// Nested paths of the parent documents and of their nested ancestors; root
    /// documents are always part of the parent filter.
    parent_filter_paths: Vec<String>,
    nested_path: String,
}

impl NestedDocsProvider {
    pub fn new(parent_filter_paths: Vec<String>, nested_path: impl Into<String>) -> Self {
        NestedDocsProvider {
            parent_filter_paths,
            nested_path: nested_path.into(),
        }
    }

    pub fn nested_path(&self) -> &str {
        &self.nested_path
    }

    /// Resolves the parent/child relation within `segment`.
    pub fn resolve(&self, segment: &dyn Segment) -> Result<ChildDocIds> {
        let mut parent_filter = segment.documents_at_path(None)?.as_ref().clone();
        for path in &self.parent_filter_paths {
            parent_filter |= segment.documents_at_path(Some(path.as_str()))?.as_ref();
        }
        let children = segment.documents_at_path(Some(self.nested_path.as_str()))?;
        trace!(
            "segment {}: {} parents, {} documents at '{}'",
            segment.ordinal(),
            parent_filter.len(),
            children.len(),
            self.nested_path
        );
        Ok(ChildDocIds {
            parent_filter,
            children,
            max_doc: segment.max_doc(),
        })
    }
}

/// Segment-scoped mapping from parent documents to their nested children.
pub struct ChildDocIds {
    parent_filter: RoaringBitmap,
    children: Arc<RoaringBitmap>,
    max_doc: DocId,
}

impl ChildDocIds {
    /// Iterates over the children of `parent`, in document id order.
    pub fn children_of(&self, parent: DocId) -> impl Iterator<Item = DocId> + '_ {
        // `rank` counts the members <= its argument, which is also the position of
        // the first member greater than it.
        let next_parent = u32::try_from(self.parent_filter.rank(parent))
            .ok()
            .and_then(|position| self.parent_filter.select(position))
            .unwrap_or(self.max_doc);
        let first = self.children.rank(parent);
        let last = if next_parent == 0 {
            0
        } else {
            self.children.rank(next_parent - 1)
        };
        (first..last.max(first)).filter_map(|position| {
            u32::try_from(position)
                .ok()
                .and_then(|position| self.children.select(position))
        })
    }
}

/// Reads the raw values of one document and folds them into an accumulation.
///
/// Sources are the leaves of [`NestedAccumulatingValues`]: they do not know
/// whether the document they are given is the hit itself or one of its nested
/// children.
pub trait DocumentValueSource: Send {
    type Item: Send;

    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()>;

    fn collect(
        &mut self,
        doc: DocId,
        accumulator: Accumulator,
        accumulated: &mut Accumulated<Self::Item>,
    ) -> Result<()>;

    fn wrap(&self, accumulated: Accumulated<Self::Item>) -> Extracted;
}

/// A [`Values`] cursor folding the values of a source through an accumulator,
/// either directly on the requested document or across its nested children.
pub struct NestedAccumulatingValues<S> {
    source: S,
    accumulator: Accumulator,
    nested: Option<NestedDocsProvider>,
    children: Option<ChildDocIds>,
    segment: Option<Arc<SegmentContext>>,
}

impl<S: DocumentValueSource> NestedAccumulatingValues<S> {
    pub fn new(
        source: S,
        accumulator: Accumulator,
        nested: Option<NestedDocsProvider>,
    ) -> NestedAccumulatingValues<S> {
        NestedAccumulatingValues {
            source,
            accumulator,
            nested,
            children: None,
            segment: None,
        }
    }
}

impl<S: DocumentValueSource> Values for NestedAccumulatingValues<S> {
    fn context(&mut self, segment: &Arc<SegmentContext>) -> Result<()> {
        self.segment = Some(segment.clone());
        self.children = None;
        self.source.context(segment)
    }

    fn get(&mut self, doc: DocId) -> Result<Extracted> {
        let segment = bound(&self.segment)?.clone();
        let mut accumulated = self.accumulator.create_initial();
        match self.nested.as_ref() {
            None => self.source.collect(doc, self.accumulator, &mut accumulated)?,
            Some(nested) => {
                if self.children.is_none() {
                    self.children = Some(nested.resolve(segment.segment().as_ref())?);
                }
                let children = self
                    .children
                    .as_ref()
                    .ok_or_else(|| Error::invalid_operation("child documents not resolved"))?;
                for child in children.children_of(doc) {
                    self.source.collect(child, self.accumulator, &mut accumulated)?;
                }
            }
        }
        Ok(self.source.wrap(accumulated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(docs: &[u32]) -> RoaringBitmap {
        docs.iter().copied().collect()
    }

    // 0: root, 1-2: authors of 0, 3: root without authors, 4: root, 5: author of 4,
    // 6: book of author 5, 7: author of 4.
    fn relation(parents: &[u32], children: &[u32]) -> ChildDocIds {
        ChildDocIds {
            parent_filter: bitmap(parents),
            children: Arc::new(bitmap(children)),
            max_doc: 8,
        }
    }

    #[test]
    fn test_children_of_roots() {
        let authors = relation(&[0, 3, 4], &[1, 2, 5, 7]);
        assert_eq!(authors.children_of(0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(authors.children_of(3).count(), 0);
        assert_eq!(authors.children_of(4).collect::<Vec<_>>(), vec![5, 7]);
    }

    #[test]
    fn test_children_of_nested_parents() {
        let books = relation(&[0, 1, 2, 3, 4, 5, 7], &[6]);
        assert_eq!(books.children_of(5).collect::<Vec<_>>(), vec![6]);
        assert_eq!(books.children_of(7).count(), 0);
        assert_eq!(books.children_of(1).count(), 0);
    }
}
