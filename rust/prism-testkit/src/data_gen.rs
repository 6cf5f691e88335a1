//! Data generation utilities for testing.
//!
//! Generates a synthetic "library" index: books with nested authors, a flattened
//! publisher object, multi-valued tags and a geo location.

use std::sync::Arc;

use prism_index_core::{
    HighlighterType, IndexSchema,
    codec::{GeoPointCodec, I64Codec, StringCodec},
    schema::FieldDefinition,
};
use serde_json::json;

use crate::index::{IndexFixture, MemoryIndex};

const TITLE_WORDS: &[&str] = &[
    "dune", "empire", "river", "silent", "garden", "winter", "machine", "ocean", "glass", "storm",
];
const TAGS: &[&str] = &["classic", "fantasy", "history", "poetry", "science", "travel"];
const NAMES: &[&str] = &["Ada", "Boris", "Chen", "Dana", "Emil", "Farah", "Goran", "Hana"];
const PUBLISHERS: &[&str] = &["Gollancz", "Penguin", "Tor", "Vintage"];

/// The schema of the "library" index, named `name`.
///
/// Documents are indexed as mapped type `Book`.
pub fn library_schema(name: &str) -> anyhow::Result<Arc<IndexSchema>> {
    let schema = IndexSchema::builder(name)
        .mapped_type("Book")
        .field(
            FieldDefinition::value("title", StringCodec)
                .stored()
                .highlighters([HighlighterType::Plain, HighlighterType::Unified]),
        )
        .field(
            FieldDefinition::value("tags", StringCodec)
                .multi_valued()
                .stored()
                .doc_values(),
        )
        .field(FieldDefinition::value("rating", I64Codec).stored().doc_values())
        .field(
            FieldDefinition::value("location", GeoPointCodec)
                .stored()
                .doc_values(),
        )
        .field(FieldDefinition::nested("authors").multi_valued())
        .field(FieldDefinition::value("authors.name", StringCodec).stored())
        .field(
            FieldDefinition::value("authors.born", I64Codec)
                .stored()
                .doc_values(),
        )
        .field(FieldDefinition::object("publisher"))
        .field(FieldDefinition::value("publisher.name", StringCodec).stored())
        .build()?;
    Ok(schema)
}

/// Generates `count` random books, as `(id, document)` pairs.
///
/// The output is fully determined by `seed`.
pub fn generate_books(count: usize, seed: u64) -> Vec<(String, serde_json::Value)> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count)
        .map(|i| {
            let title = (0..rng.usize(1..4))
                .map(|_| TITLE_WORDS[rng.usize(..TITLE_WORDS.len())])
                .collect::<Vec<_>>()
                .join(" ");
            let tags = (0..rng.usize(0..4))
                .map(|_| TAGS[rng.usize(..TAGS.len())])
                .collect::<Vec<_>>();
            let authors = (0..rng.usize(0..4))
                .map(|_| {
                    json!({
                        "name": NAMES[rng.usize(..NAMES.len())],
                        "born": rng.i64(1800..2000),
                    })
                })
                .collect::<Vec<_>>();
            let mut book = json!({
                "title": title,
                "tags": tags,
                "rating": rng.i64(1..=5),
                "location": {
                    "lat": rng.f64() * 180.0 - 90.0,
                    "lon": rng.f64() * 360.0 - 180.0,
                },
                "authors": authors,
            });
            if rng.bool() {
                book["publisher"] = json!({ "name": PUBLISHERS[rng.usize(..PUBLISHERS.len())] });
            }
            (i.to_string(), book)
        })
        .collect()
}

/// Builds a "library" index of `count` random books spread over `segments`
/// segments.
pub fn library_index(
    name: &str,
    count: usize,
    segments: usize,
    seed: u64,
) -> anyhow::Result<Arc<MemoryIndex>> {
    anyhow::ensure!(segments > 0, "at least one segment is required");
    let mut fixture = IndexFixture::new(library_schema(name)?);
    let per_segment = count.div_ceil(segments).max(1);
    for (i, (id, book)) in generate_books(count, seed).into_iter().enumerate() {
        if i > 0 && i % per_segment == 0 {
            fixture.new_segment();
        }
        fixture.add_document("Book", &id, book)?;
    }
    Ok(fixture.build())
}

#[cfg(test)]
mod tests {
    use prism_index_core::{IndexReader, Segment};

    use super::*;

    #[test]
    fn test_library_index() {
        let index = library_index("library", 25, 3, 42).unwrap();
        assert_eq!(index.segment_count(), 3);
        assert_eq!(index.all_hits().len(), 25);
        let roots: u64 = index
            .segments()
            .iter()
            .map(|s| s.documents_at_path(None).unwrap().len())
            .sum();
        assert_eq!(roots, 25);
    }

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(generate_books(10, 7), generate_books(10, 7));
    }
}
