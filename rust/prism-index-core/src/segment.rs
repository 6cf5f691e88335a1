//! Segment read contracts.
//!
//! A [`Segment`] is the unit of iteration of the projection pipeline: every
//! per-projection value cursor is rebound to a segment before it is queried for
//! the documents of that segment.

use std::sync::Arc;

use ahash::AHashSet;
use prism_common::{Result, Value};
use roaring::RoaringBitmap;

use crate::DocId;

/// Read access to one segment of an index.
///
/// # Thread Safety
///
/// Segments may be scanned concurrently by several projection cursors, hence the
/// `Send + Sync` bound. Implementations are expected to be immutable once opened.
pub trait Segment: Send + Sync + 'static {
    /// Ordinal of this segment within its index. It is not unique across the
    /// indexes of a query: per-hit results are keyed by [`SearchHit::segment`].
    ///
    /// [`SearchHit::segment`]: crate::SearchHit::segment
    fn ordinal(&self) -> usize;

    /// Name of the index owning this segment.
    fn index_name(&self) -> &str;

    /// Exclusive upper bound of the document ids of this segment.
    fn max_doc(&self) -> DocId;

    /// Returns the identifier of the root document `doc`.
    fn document_id(&self, doc: DocId) -> Result<String>;

    /// Returns the mapped type name the root document `doc` was indexed as. The
    /// name is borrowed from the segment's type dictionary.
    fn mapped_type_name(&self, doc: DocId) -> Result<&str>;

    /// Loads the stored fields of `doc` accepted by `filter`, in their original
    /// occurrence order.
    fn stored_document(&self, doc: DocId, filter: &StoredFieldFilter) -> Result<StoredDocument>;

    /// Opens the doc-value column of the field at `path`, if the field has one.
    ///
    /// Columnar values are not guaranteed to be returned in their original
    /// insertion order.
    fn doc_values(&self, path: &str) -> Result<Option<Arc<dyn DocValues>>>;

    /// Returns the set of documents indexed at the given nested path.
    ///
    /// `None` designates the root documents.
    fn documents_at_path(&self, nested_path: Option<&str>) -> Result<Arc<RoaringBitmap>>;
}

/// A columnar per-segment value source for one field.
pub trait DocValues: Send + Sync {
    /// Returns the values of `doc`, decoded to their native type.
    ///
    /// Multi-valued columns return values in column order (typically sorted),
    /// which may differ from the order in which they were indexed.
    fn values(&self, doc: DocId) -> Result<Vec<Value>>;
}

/// A raw stored field value, as persisted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Str(String),
    Long(i64),
    Double(f64),
    Bytes(Vec<u8>),
}

/// The stored fields of one document, in occurrence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredDocument {
    fields: Vec<(String, StoredValue)>,
}

impl StoredDocument {
    pub fn new() -> StoredDocument {
        StoredDocument { fields: Vec::new() }
    }

    pub fn push(&mut self, path: impl Into<String>, value: StoredValue) {
        self.fields.push((path.into(), value));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over all stored occurrences of the field at `path`, in
    /// occurrence order.
    pub fn values<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a StoredValue> + 'a {
        self.fields
            .iter()
            .filter(move |(p, _)| p == path)
            .map(|(_, v)| v)
    }

    /// Iterates over every stored `(path, value)` occurrence.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &StoredValue)> {
        self.fields.iter().map(|(p, v)| (p.as_str(), v))
    }

    /// Returns a copy of this document restricted to the fields accepted by `filter`.
    pub fn filtered(&self, filter: &StoredFieldFilter) -> StoredDocument {
        StoredDocument {
            fields: self
                .fields
                .iter()
                .filter(|(p, _)| filter.accepts(p))
                .cloned()
                .collect(),
        }
    }
}

impl FromIterator<(String, StoredValue)> for StoredDocument {
    fn from_iter<T: IntoIterator<Item = (String, StoredValue)>>(iter: T) -> Self {
        StoredDocument {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Selects which stored fields must be decoded when loading a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredFieldFilter {
    /// Load every stored field.
    All,
    /// Load only the listed field paths.
    Fields(Arc<AHashSet<String>>),
}

impl StoredFieldFilter {
    pub fn none() -> StoredFieldFilter {
        StoredFieldFilter::Fields(Default::default())
    }

    pub fn accepts(&self, path: &str) -> bool {
        match self {
            StoredFieldFilter::All => true,
            StoredFieldFilter::Fields(paths) => paths.contains(path),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StoredFieldFilter::All => false,
            StoredFieldFilter::Fields(paths) => paths.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_document_preserves_occurrence_order() {
        let mut doc = StoredDocument::new();
        doc.push("tags", StoredValue::Str("c".into()));
        doc.push("title", StoredValue::Str("t".into()));
        doc.push("tags", StoredValue::Str("a".into()));
        doc.push("tags", StoredValue::Str("b".into()));

        let tags = doc.values("tags").cloned().collect::<Vec<_>>();
        assert_eq!(
            tags,
            vec![
                StoredValue::Str("c".into()),
                StoredValue::Str("a".into()),
                StoredValue::Str("b".into())
            ]
        );
    }

    #[test]
    fn test_filtered_document() {
        let doc = [
            ("a".to_string(), StoredValue::Long(1)),
            ("b".to_string(), StoredValue::Long(2)),
        ]
        .into_iter()
        .collect::<StoredDocument>();

        let filter = StoredFieldFilter::Fields(Arc::new(["b".to_string()].into_iter().collect()));
        let filtered = doc.filtered(&filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.values("b").count(), 1);
        assert!(doc.filtered(&StoredFieldFilter::none()).is_empty());
        assert_eq!(doc.filtered(&StoredFieldFilter::All), doc);
    }
}
