//! Contracts of the index-engine and entity-loading collaborators consumed by the
//! prism projection pipeline.
//!
//! # Overview
//!
//! The projection pipeline never touches the physical storage format directly. It
//! talks to the engine through the narrow read contracts defined here:
//!
//! - [`Segment`]: one physically contiguous, independently scannable chunk of an
//!   index, exposing stored documents, doc-value columns, document metadata and
//!   nested-path bitsets
//! - [`IndexReader`]: a named index, its [`IndexSchema`] and its segments
//! - [`IndexSchema`] / [`SchemaFieldNode`]: the read-only per-index field metadata
//!   (codec, cardinality, nesting, supported highlighters, projection converter)
//! - [`Highlighter`] and [`EntityLoader`]: the external highlight-fragment and
//!   entity-materialization collaborators
//!
//! # Nested documents
//!
//! Nested objects are indexed as separate documents of the same segment. A block is
//! laid out parent-first: every document is immediately followed by its nested
//! descendants, and [`Segment::documents_at_path`] with `None` returns the bitset of
//! root documents.

pub mod codec;
pub mod convert;
pub mod highlighter;
pub mod loader;
pub mod reader;
pub mod schema;
pub mod segment;

pub use codec::FieldCodec;
pub use convert::ProjectionConverter;
pub use highlighter::{Highlighter, HighlighterType};
pub use loader::EntityLoader;
pub use reader::{IndexReader, SearchHit};
pub use schema::{IndexSchema, SchemaFieldNode};
pub use segment::{DocValues, Segment, StoredDocument, StoredFieldFilter, StoredValue};

/// Segment-local document identifier.
pub type DocId = u32;
