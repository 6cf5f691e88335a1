//! In-memory segmented index engine.
//!
//! Documents are given as JSON trees and indexed according to an
//! [`IndexSchema`]: value fields are encoded with their codec into stored fields
//! and doc-value columns, nested objects become child documents laid out
//! parent-first, and flattened objects are merged into their owning document.

use std::{cmp::Ordering, sync::Arc};

use ahash::AHashMap;
use anyhow::{anyhow, bail};
use prism_common::{GeoPoint, Result, Value, ValueType, error::Error};
use prism_index_core::{
    DocId, DocValues, IndexReader, IndexSchema, SearchHit, Segment, StoredDocument,
    StoredFieldFilter, schema::FieldKind,
};
use roaring::RoaringBitmap;

/// Builds a [`MemoryIndex`] document by document.
///
/// # Example
///
/// ```ignore
/// let mut fixture = IndexFixture::new(schema);
/// fixture.add_document("Book", "1", json!({"title": "Dune", "authors": [{"name": "Frank"}]}))?;
/// fixture.new_segment();
/// fixture.add_document("Book", "2", json!({"title": "Emma"}))?;
/// let index = fixture.build();
/// ```
pub struct IndexFixture {
    schema: Arc<IndexSchema>,
    segments: Vec<SegmentData>,
}

impl IndexFixture {
    pub fn new(schema: Arc<IndexSchema>) -> IndexFixture {
        IndexFixture {
            schema,
            segments: Vec::new(),
        }
    }

    /// Starts a new segment; subsequent documents are added to it.
    pub fn new_segment(&mut self) -> &mut IndexFixture {
        self.segments.push(SegmentData::default());
        self
    }

    /// Indexes a root document and its nested objects.
    pub fn add_document(
        &mut self,
        type_name: &str,
        id: &str,
        document: serde_json::Value,
    ) -> anyhow::Result<&mut IndexFixture> {
        if self.segments.is_empty() {
            self.segments.push(SegmentData::default());
        }
        let segment = self
            .segments
            .last_mut()
            .ok_or_else(|| anyhow!("no segment"))?;
        let root = segment.new_doc(None, type_name, id);
        index_object(&self.schema, segment, root, None, &document, type_name, id)?;
        Ok(self)
    }

    pub fn build(self) -> Arc<MemoryIndex> {
        let name = self.schema.name().to_string();
        let segments = self
            .segments
            .into_iter()
            .enumerate()
            .map(|(i, data)| {
                Arc::new(MemorySegment::new(i, name.clone(), data))
            })
            .collect();
        Arc::new(MemoryIndex {
            name,
            schema: self.schema,
            segments,
        })
    }
}

#[derive(Default)]
struct SegmentData {
    ids: Vec<String>,
    types: Vec<String>,
    stored: Vec<StoredDocument>,
    doc_values: AHashMap<String, AHashMap<DocId, Vec<Value>>>,
    paths: AHashMap<Option<String>, RoaringBitmap>,
}

impl SegmentData {
    fn new_doc(&mut self, nested_path: Option<&str>, type_name: &str, id: &str) -> DocId {
        let doc = self.ids.len() as DocId;
        self.ids.push(id.to_string());
        self.types.push(type_name.to_string());
        self.stored.push(StoredDocument::new());
        self.paths
            .entry(nested_path.map(str::to_string))
            .or_default()
            .insert(doc);
        doc
    }
}

fn elements(value: &serde_json::Value) -> Vec<&serde_json::Value> {
    match value {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn index_object(
    schema: &IndexSchema,
    segment: &mut SegmentData,
    doc: DocId,
    prefix: Option<&str>,
    object: &serde_json::Value,
    type_name: &str,
    id: &str,
) -> anyhow::Result<()> {
    let Some(fields) = object.as_object() else {
        bail!("expected an object at {prefix:?}, got {object}");
    };
    for (key, value) in fields {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        let node = schema
            .field(&path)
            .ok_or_else(|| anyhow!("field '{path}' is not declared in '{}'", schema.name()))?;
        match node.kind() {
            FieldKind::Object { nested: true } => {
                for element in elements(value) {
                    let child = segment.new_doc(Some(&path), type_name, id);
                    index_object(schema, segment, child, Some(&path), element, type_name, id)?;
                }
            }
            FieldKind::Object { nested: false } => {
                for element in elements(value) {
                    index_object(schema, segment, doc, Some(&path), element, type_name, id)?;
                }
            }
            FieldKind::Value => {
                let codec = node
                    .codec()
                    .ok_or_else(|| anyhow!("field '{path}' has no codec"))?;
                for element in elements(value) {
                    let value = json_to_value(codec.value_type(), element)?;
                    if node.is_stored() {
                        segment.stored[doc as usize].push(path.clone(), codec.encode(&value)?);
                    }
                    if node.has_doc_values() {
                        segment
                            .doc_values
                            .entry(path.clone())
                            .or_default()
                            .entry(doc)
                            .or_default()
                            .push(value);
                    }
                }
            }
        }
    }
    Ok(())
}

fn json_to_value(value_type: ValueType, json: &serde_json::Value) -> anyhow::Result<Value> {
    let value = match (value_type, json) {
        (ValueType::String, serde_json::Value::String(s)) => Value::String(s.clone()),
        (ValueType::I64, serde_json::Value::Number(n)) => {
            Value::I64(n.as_i64().ok_or_else(|| anyhow!("{n} is not an i64"))?)
        }
        (ValueType::F64, serde_json::Value::Number(n)) => {
            Value::F64(n.as_f64().ok_or_else(|| anyhow!("{n} is not an f64"))?)
        }
        (ValueType::Bool, serde_json::Value::Bool(b)) => Value::Bool(*b),
        (ValueType::GeoPoint, serde_json::Value::Object(point)) => {
            let coordinate = |name: &str| {
                point
                    .get(name)
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| anyhow!("geo point without '{name}': {json}"))
            };
            Value::GeoPoint(GeoPoint::new(coordinate("lat")?, coordinate("lon")?))
        }
        (value_type, json) => bail!("cannot index {json} as {value_type:?}"),
    };
    Ok(value)
}

/// Column order of doc values: multi-valued columns are sorted, as an inverted
/// index engine would return them.
fn column_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::I64(a), Value::I64(b)) => a.cmp(b),
        (Value::F64(a), Value::F64(b)) => a.total_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::GeoPoint(a), Value::GeoPoint(b)) => a
            .latitude
            .total_cmp(&b.latitude)
            .then(a.longitude.total_cmp(&b.longitude)),
        _ => Ordering::Equal,
    }
}

/// An index held in memory.
pub struct MemoryIndex {
    name: String,
    schema: Arc<IndexSchema>,
    segments: Vec<Arc<MemorySegment>>,
}

impl MemoryIndex {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, i: usize) -> Option<&Arc<MemorySegment>> {
        self.segments.get(i)
    }

    /// Returns the hit of the root document `id`, if indexed, for a query
    /// scanning this index alone.
    pub fn hit(&self, id: &str, score: f32) -> Option<SearchHit> {
        self.segments.iter().find_map(|segment| {
            segment
                .root_doc(id)
                .map(|doc| SearchHit::new(segment.ordinal, doc, score))
        })
    }

    /// Returns the hits of every root document, in segment and document order.
    pub fn all_hits(&self) -> Vec<SearchHit> {
        self.segments
            .iter()
            .flat_map(|segment| {
                segment
                    .roots
                    .iter()
                    .map(|doc| SearchHit::new(segment.ordinal, doc, 1.0))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn reader(self: &Arc<Self>) -> Arc<dyn IndexReader> {
        self.clone()
    }
}

impl IndexReader for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Arc<IndexSchema> {
        &self.schema
    }

    fn segments(&self) -> Vec<Arc<dyn Segment>> {
        self.segments
            .iter()
            .map(|segment| segment.clone() as Arc<dyn Segment>)
            .collect()
    }
}

/// One segment of a [`MemoryIndex`].
pub struct MemorySegment {
    ordinal: usize,
    index_name: String,
    ids: Vec<String>,
    types: Vec<String>,
    stored: Vec<StoredDocument>,
    columns: AHashMap<String, Arc<MemoryDocValues>>,
    roots: Arc<RoaringBitmap>,
    nested: AHashMap<String, Arc<RoaringBitmap>>,
}

impl MemorySegment {
    fn new(ordinal: usize, index_name: String, mut data: SegmentData) -> MemorySegment {
        let columns = data
            .doc_values
            .into_iter()
            .map(|(path, mut values)| {
                for doc_values in values.values_mut() {
                    doc_values.sort_by(column_order);
                }
                (path, Arc::new(MemoryDocValues { values }))
            })
            .collect();
        let roots = Arc::new(data.paths.remove(&None).unwrap_or_default());
        let nested = data
            .paths
            .into_iter()
            .filter_map(|(path, docs)| path.map(|path| (path, Arc::new(docs))))
            .collect();
        MemorySegment {
            ordinal,
            index_name,
            ids: data.ids,
            types: data.types,
            stored: data.stored,
            columns,
            roots,
            nested,
        }
    }

    /// The segment-local id of the root document `id`.
    pub fn root_doc(&self, id: &str) -> Option<DocId> {
        self.roots
            .iter()
            .find(|&doc| self.ids.get(doc as usize).is_some_and(|d| d == id))
    }

    fn check(&self, doc: DocId) -> Result<usize> {
        let position = doc as usize;
        if position < self.ids.len() {
            Ok(position)
        } else {
            Err(Error::invalid_arg(
                "doc",
                format!("document {doc} out of range in segment {}", self.ordinal),
            ))
        }
    }
}

impl Segment for MemorySegment {
    fn ordinal(&self) -> usize {
        self.ordinal
    }

    fn index_name(&self) -> &str {
        &self.index_name
    }

    fn max_doc(&self) -> DocId {
        self.ids.len() as DocId
    }

    fn document_id(&self, doc: DocId) -> Result<String> {
        Ok(self.ids[self.check(doc)?].clone())
    }

    fn mapped_type_name(&self, doc: DocId) -> Result<&str> {
        Ok(&self.types[self.check(doc)?])
    }

    fn stored_document(&self, doc: DocId, filter: &StoredFieldFilter) -> Result<StoredDocument> {
        Ok(self.stored[self.check(doc)?].filtered(filter))
    }

    fn doc_values(&self, path: &str) -> Result<Option<Arc<dyn DocValues>>> {
        Ok(self
            .columns
            .get(path)
            .map(|column| column.clone() as Arc<dyn DocValues>))
    }

    fn documents_at_path(&self, nested_path: Option<&str>) -> Result<Arc<RoaringBitmap>> {
        Ok(match nested_path {
            None => self.roots.clone(),
            Some(path) => self.nested.get(path).cloned().unwrap_or_default(),
        })
    }
}

struct MemoryDocValues {
    values: AHashMap<DocId, Vec<Value>>,
}

impl DocValues for MemoryDocValues {
    fn values(&self, doc: DocId) -> Result<Vec<Value>> {
        Ok(self.values.get(&doc).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use prism_index_core::{
        codec::{I64Codec, StringCodec},
        schema::FieldDefinition,
    };
    use serde_json::json;

    use super::*;

    fn schema() -> Arc<IndexSchema> {
        IndexSchema::builder("library")
            .field(FieldDefinition::value("title", StringCodec).stored())
            .field(
                FieldDefinition::value("tags", StringCodec)
                    .multi_valued()
                    .stored()
                    .doc_values(),
            )
            .field(FieldDefinition::nested("authors").multi_valued())
            .field(FieldDefinition::value("authors.name", StringCodec).stored())
            .field(FieldDefinition::value("authors.born", I64Codec).doc_values())
            .build()
            .unwrap()
    }

    #[test]
    fn test_parent_first_layout() {
        let mut fixture = IndexFixture::new(schema());
        fixture
            .add_document(
                "Book",
                "1",
                json!({"title": "Good Omens", "authors": [{"name": "Terry"}, {"name": "Neil"}]}),
            )
            .unwrap();
        fixture
            .add_document("Book", "2", json!({"title": "Emma"}))
            .unwrap();
        let index = fixture.build();
        let segment = index.segment(0).unwrap();

        let roots = segment.documents_at_path(None).unwrap();
        assert_eq!(roots.iter().collect::<Vec<_>>(), vec![0, 3]);
        let authors = segment.documents_at_path(Some("authors")).unwrap();
        assert_eq!(authors.iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(segment.documents_at_path(Some("editors")).unwrap().is_empty());
        assert_eq!(segment.document_id(2).unwrap(), "1");
        assert_eq!(segment.root_doc("2"), Some(3));
        assert_eq!(index.hit("2", 0.5), Some(SearchHit::new(0, 3, 0.5)));
        assert!(segment.document_id(9).is_err());
    }

    #[test]
    fn test_doc_values_are_sorted_and_stored_fields_are_not() {
        let mut fixture = IndexFixture::new(schema());
        fixture
            .add_document("Book", "1", json!({"tags": ["c", "a", "b"]}))
            .unwrap();
        let index = fixture.build();
        let segment = index.segment(0).unwrap();
        let column = segment.doc_values("tags").unwrap().unwrap();
        assert_eq!(
            column.values(0).unwrap(),
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
        let stored = segment
            .stored_document(0, &StoredFieldFilter::All)
            .unwrap();
        assert_eq!(stored.values("tags").count(), 3);
        assert!(segment.doc_values("title").unwrap().is_none());
    }

    #[test]
    fn test_undeclared_fields_are_rejected() {
        let mut fixture = IndexFixture::new(schema());
        assert!(
            fixture
                .add_document("Book", "1", json!({"isbn": "123"}))
                .is_err()
        );
    }
}
