//! Scenario tests of the projection pipeline over in-memory indexes.

use std::sync::Arc;

use prism_common::{GeoPoint, Result, error::ErrorKind};
use prism_index_core::{
    EntityLoader, HighlighterType, IndexReader, IndexSchema, SearchHit,
    codec::{GeoPointCodec, I64Codec, StringCodec},
    convert::ParseI64Converter,
    schema::FieldDefinition,
};
use prism_testkit::{IndexFixture, MapEntityLoader, MemoryIndex};
use serde_json::json;

use crate::{ExecutionOptions, ProjectedHits, ProjectionExecutor, ProjectionScope, SearchProjection};

mod composite_tests;
mod cross_index_tests;
mod field_tests;
mod nested_tests;

pub(crate) const PARIS: GeoPoint = GeoPoint {
    latitude: 48.8566,
    longitude: 2.3522,
};

pub(crate) fn books_schema(name: &str) -> Arc<IndexSchema> {
    IndexSchema::builder(name)
        .identifier_converter(ParseI64Converter)
        .mapped_type("Book")
        .field(
            FieldDefinition::value("title", StringCodec)
                .stored()
                .highlighters([HighlighterType::Unified]),
        )
        .field(
            FieldDefinition::value("tags", StringCodec)
                .multi_valued()
                .stored()
                .doc_values(),
        )
        .field(FieldDefinition::value("rating", I64Codec).doc_values())
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
        .field(FieldDefinition::nested("authors.books").multi_valued())
        .field(FieldDefinition::value("authors.books.title", StringCodec).stored())
        .field(FieldDefinition::object("publisher"))
        .field(FieldDefinition::value("publisher.name", StringCodec).stored())
        .build()
        .unwrap()
}

/// Books "1" and "2" in the first segment, "42" in the second.
pub(crate) fn books_index() -> Arc<MemoryIndex> {
    let mut fixture = IndexFixture::new(books_schema("library"));
    fixture
        .add_document(
            "Book",
            "1",
            json!({
                "title": "The spice must flow. A desert tale.",
                "tags": ["sf", "classic", "desert"],
                "rating": 5,
                "location": {"lat": PARIS.latitude, "lon": PARIS.longitude},
                "authors": [
                    {
                        "name": "Frank",
                        "born": 1920,
                        "books": [{"title": "Dune"}, {"title": "Dune Messiah"}]
                    },
                    {"name": "Brian", "born": 1947}
                ],
                "publisher": {"name": "Chilton"}
            }),
        )
        .unwrap()
        .add_document("Book", "2", json!({"title": "Emma", "rating": 3}))
        .unwrap()
        .new_segment()
        .add_document(
            "Book",
            "42",
            json!({
                "title": "Answers. Mostly harmless.",
                "tags": ["humor"],
                "rating": 4,
                "location": {"lat": 51.5074, "lon": -0.1278},
                "authors": [{"name": "Douglas", "born": 1952}]
            }),
        )
        .unwrap();
    fixture.build()
}

pub(crate) fn book_hits(index: &MemoryIndex) -> Vec<SearchHit> {
    vec![
        index.hit("1", 2.5).unwrap(),
        index.hit("2", 0.5).unwrap(),
        index.hit("42", 1.37).unwrap(),
    ]
}

pub(crate) fn prepare(
    projection: &dyn SearchProjection,
    readers: &[Arc<dyn IndexReader>],
) -> Result<ProjectionExecutor> {
    ProjectionExecutor::prepare(
        projection,
        ProjectionScope::from_readers(readers)?,
        ExecutionOptions::default(),
    )
}

/// Projects every book of [`books_index`].
pub(crate) fn project_books(projection: &dyn SearchProjection) -> Result<ProjectedHits> {
    let index = books_index();
    let readers = [index.reader()];
    prepare(projection, &readers)?.execute_on_readers(
        &readers,
        &book_hits(&index),
        Arc::new(MapEntityLoader::new()) as Arc<dyn EntityLoader>,
    )
}

pub(crate) fn request_books(projection: &dyn SearchProjection) -> Result<ProjectionExecutor> {
    prepare(projection, &[books_index().reader()])
}

pub(crate) fn assert_kind(result: Result<impl Sized>, check: impl FnOnce(&ErrorKind) -> bool) {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(e) => assert!(check(e.kind()), "unexpected error: {e}"),
    }
}
