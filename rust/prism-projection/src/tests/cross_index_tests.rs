use std::sync::Arc;

use prism_common::{GeoPoint, Value, error::ErrorKind};
use prism_index_core::{
    EntityLoader, IndexReader, IndexSchema, SearchHit,
    codec::{GeoPointCodec, StringCodec},
    convert::ParseI64Converter,
    schema::FieldDefinition,
};
use prism_testkit::{IndexFixture, MapEntityLoader, MemoryIndex};
use serde_json::json;

use super::{PARIS, assert_kind, book_hits, books_index, prepare};
use crate::{
    Accumulator, ProjectedHits, SearchProjection,
    projection::{
        ByMappedTypeProjection, CompositeProjection, ConstantProjection,
        DistanceProjectionBuilder, FieldProjection, FieldProjectionBuilder,
        IdentifierProjection, ObjectProjection, ScoreProjection,
    },
};

const BERLIN: GeoPoint = GeoPoint {
    latitude: 52.52,
    longitude: 13.405,
};

fn articles_schema(rating_as_text: bool, parse_ids: bool) -> Arc<IndexSchema> {
    let mut builder = IndexSchema::builder("articles")
        .mapped_type("Article")
        .field(FieldDefinition::value("title", StringCodec).stored())
        .field(
            FieldDefinition::value("location", GeoPointCodec)
                .stored()
                .doc_values(),
        )
        .field(FieldDefinition::object("authors"))
        .field(FieldDefinition::value("authors.name", StringCodec).stored());
    if rating_as_text {
        builder = builder.field(FieldDefinition::value("rating", StringCodec).stored());
    }
    if parse_ids {
        builder = builder.identifier_converter(ParseI64Converter);
    }
    builder.build().unwrap()
}

/// One article, "7", alone in its segment. Its segment and document ordinals
/// are both 0, like those of book "1".
fn articles_index(schema: Arc<IndexSchema>) -> Arc<MemoryIndex> {
    let mut fixture = IndexFixture::new(schema);
    fixture
        .add_document(
            "Article",
            "7",
            json!({
                "title": "Ownership in practice",
                "location": {"lat": BERLIN.latitude, "lon": BERLIN.longitude}
            }),
        )
        .unwrap();
    fixture.build()
}

struct Library {
    readers: Vec<Arc<dyn IndexReader>>,
    hits: Vec<SearchHit>,
}

impl Library {
    fn new(articles: Arc<IndexSchema>) -> Library {
        let books = books_index();
        let articles = articles_index(articles);
        let mut hits = book_hits(&books);
        // The article segment is scanned after the book segments.
        let article = articles.hit("7", 0.9).unwrap();
        hits.insert(1, article.with_segment_offset(books.segment_count()));
        Library {
            readers: vec![books.reader(), articles.reader()],
            hits,
        }
    }

    fn project(&self, projection: &dyn SearchProjection) -> prism_common::Result<ProjectedHits> {
        prepare(projection, &self.readers)?.execute_on_readers(
            &self.readers,
            &self.hits,
            Arc::new(MapEntityLoader::new()) as Arc<dyn EntityLoader>,
        )
    }
}

#[test]
fn test_shared_field() {
    let library = Library::new(articles_schema(false, true));
    let hits = library.project(&FieldProjection::single("title")).unwrap();
    assert_eq!(hits.values()[1], Value::from("Ownership in practice"));
    assert_eq!(hits.values()[3], Value::from("Answers. Mostly harmless."));
}

#[test]
fn test_scores_and_distances_follow_their_index() {
    let library = Library::new(articles_schema(false, true));
    let projection = CompositeProjection::builder()
        .add(IdentifierProjection::raw())
        .add(ScoreProjection)
        .add(DistanceProjectionBuilder::new("location", PARIS).build(Accumulator::Optional))
        .as_list();
    let hits = library.project(&projection).unwrap();
    assert_eq!(
        hits.values()[0],
        Value::List(vec![Value::from("1"), Value::F64(2.5), Value::F64(0.0)])
    );
    assert_eq!(
        hits.values()[1],
        Value::List(vec![
            Value::from("7"),
            Value::F64(f64::from(0.9f32)),
            Value::F64(PARIS.distance_meters(&BERLIN)),
        ])
    );
    assert_eq!(
        hits.values()[2],
        Value::List(vec![Value::from("2"), Value::F64(0.5), Value::Null])
    );
}

#[test]
fn test_index_queried_alone() {
    let articles = articles_index(articles_schema(false, true));
    let readers = [articles.reader()];
    let projection = CompositeProjection::builder()
        .add(ScoreProjection)
        .add(DistanceProjectionBuilder::new("location", BERLIN).build(Accumulator::Optional))
        .as_list();
    let hits = prepare(&projection, &readers)
        .unwrap()
        .execute_on_readers(
            &readers,
            &[articles.hit("7", 0.9).unwrap()],
            Arc::new(MapEntityLoader::new()) as Arc<dyn EntityLoader>,
        )
        .unwrap();
    assert_eq!(
        hits.into_values(),
        vec![Value::List(vec![Value::F64(f64::from(0.9f32)), Value::F64(0.0)])]
    );
}

#[test]
fn test_field_missing_from_one_index_uses_empty_result() {
    let library = Library::new(articles_schema(false, true));
    let tags = library.project(&FieldProjection::list("tags")).unwrap();
    assert_eq!(tags.values()[0], Value::from(vec!["sf", "classic", "desert"]));
    assert_eq!(tags.values()[1], Value::List(vec![]));

    let rating = library
        .project(&FieldProjectionBuilder::new("rating").build(Accumulator::Optional))
        .unwrap();
    assert_eq!(
        rating.into_values(),
        vec![Value::I64(5), Value::Null, Value::I64(3), Value::I64(4)]
    );
}

#[test]
fn test_unknown_field_names_every_index() {
    let library = Library::new(articles_schema(false, true));
    assert_kind(library.project(&FieldProjection::single("isbn")), |k| {
        matches!(
            k,
            ErrorKind::UnknownField { path, indexes }
                if path == "isbn" && indexes == &["articles", "library"]
        )
    });
}

#[test]
fn test_conflicting_field_types() {
    let library = Library::new(articles_schema(true, true));
    assert_kind(library.project(&FieldProjection::single("rating")), |k| {
        matches!(k, ErrorKind::CrossIndexSchemaConflict { path, .. } if path == "rating")
    });
}

#[test]
fn test_conflicting_object_kinds() {
    // "authors" is nested in the book index and flattened in the article index.
    let library = Library::new(articles_schema(false, true));
    let projection = ObjectProjection::new(
        "authors",
        FieldProjection::single("authors.name"),
        Accumulator::List,
    );
    assert_kind(library.project(&projection), |k| {
        matches!(k, ErrorKind::CrossIndexSchemaConflict { path, .. } if path == "authors")
    });
}

#[test]
fn test_conflicting_identifier_converters() {
    let library = Library::new(articles_schema(false, false));
    assert_kind(library.project(&IdentifierProjection::new()), |k| {
        matches!(k, ErrorKind::CrossIndexSchemaConflict { path, .. } if path == "_id")
    });
    let raw = library.project(&IdentifierProjection::raw()).unwrap();
    assert_eq!(raw.values()[1], Value::from("7"));
}

#[test]
fn test_by_mapped_type() {
    let library = Library::new(articles_schema(false, true));
    let projection = ByMappedTypeProjection::new()
        .with(
            "Book",
            CompositeProjection::builder()
                .add(ConstantProjection(Value::from("book")))
                .add(FieldProjection::list("tags"))
                .as_list(),
        )
        .with("Article", FieldProjection::single("title"));
    let hits = library.project(&projection).unwrap();
    assert_eq!(
        hits.values()[0],
        Value::List(vec![
            Value::from("book"),
            Value::from(vec!["sf", "classic", "desert"]),
        ])
    );
    assert_eq!(hits.values()[1], Value::from("Ownership in practice"));
}

#[test]
fn test_mapped_types_alternating_within_segment() {
    let mut fixture = IndexFixture::new(articles_schema(false, true));
    for (type_name, id) in [("Article", "7"), ("Review", "8"), ("Article", "9"), ("Review", "10")] {
        fixture
            .add_document(type_name, id, json!({"title": format!("{type_name} {id}")}))
            .unwrap();
    }
    let index = fixture.build();
    let readers = [index.reader()];
    let hits = ["7", "8", "9", "10", "7"]
        .map(|id| index.hit(id, 1.0).unwrap())
        .to_vec();
    let projection = ByMappedTypeProjection::new()
        .with("Article", ConstantProjection(Value::from("article")))
        .with("Review", IdentifierProjection::raw());
    let projected = prepare(&projection, &readers)
        .unwrap()
        .execute_on_readers(
            &readers,
            &hits,
            Arc::new(MapEntityLoader::new()) as Arc<dyn EntityLoader>,
        )
        .unwrap();
    assert_eq!(
        projected.into_values(),
        vec![
            Value::from("article"),
            Value::from("8"),
            Value::from("article"),
            Value::from("10"),
            Value::from("article"),
        ]
    );
}

#[test]
fn test_unresolved_mapped_type() {
    let library = Library::new(articles_schema(false, true));
    let projection = ByMappedTypeProjection::new().with("Book", IdentifierProjection::new());
    assert_kind(library.project(&projection), |k| {
        matches!(k, ErrorKind::UnresolvedMappedType { type_name } if type_name == "Article")
    });
}

#[test]
fn test_mapped_type_registered_twice() {
    let projection = ByMappedTypeProjection::new()
        .with("Book", IdentifierProjection::new())
        .with("Book", IdentifierProjection::raw());
    assert_kind(prepare(&projection, &[books_index().reader()]), |k| {
        matches!(k, ErrorKind::InvalidArgument { .. })
    });
}
