use prism_common::{Value, error::ErrorKind};

use super::{assert_kind, project_books, request_books};
use crate::{
    Accumulator, ExtractionRequirement,
    projection::{
        CompositeProjection, FieldProjection, IdentifierProjection, ObjectProjection,
        RootContextProjection, ScoreProjection,
    },
};

fn author_summary() -> CompositeProjection {
    CompositeProjection::builder()
        .add(FieldProjection::single("authors.name"))
        .add(FieldProjection::list("authors.books.title"))
        .as_list()
}

#[test]
fn test_nested_values_accumulate_at_root() {
    let hits = project_books(&FieldProjection::list("authors.name")).unwrap();
    assert_eq!(
        hits.into_values(),
        vec![
            Value::from(vec!["Frank", "Brian"]),
            Value::List(vec![]),
            Value::from(vec!["Douglas"]),
        ]
    );
}

#[test]
fn test_deeply_nested_values_accumulate_at_root() {
    let hits = project_books(&FieldProjection::list("authors.books.title")).unwrap();
    assert_eq!(hits.values()[0], Value::from(vec!["Dune", "Dune Messiah"]));
    assert_eq!(hits.values()[2], Value::List(vec![]));
}

#[test]
fn test_nested_field_is_multi_valued_at_root() {
    assert_kind(request_books(&FieldProjection::single("authors.name")), |k| {
        matches!(k, ErrorKind::InvalidNestingContext { path, .. } if path == "authors.name")
    });
}

#[test]
fn test_object_projection_per_nested_object() {
    let projection = ObjectProjection::new("authors", author_summary(), Accumulator::List);
    let hits = project_books(&projection).unwrap();
    assert_eq!(
        hits.values()[0],
        Value::List(vec![
            Value::List(vec![
                Value::from("Frank"),
                Value::from(vec!["Dune", "Dune Messiah"]),
            ]),
            Value::List(vec![Value::from("Brian"), Value::List(vec![])]),
        ])
    );
    assert_eq!(hits.values()[1], Value::List(vec![]));

    let executor = request_books(&projection).unwrap();
    let nested = executor
        .requirements()
        .iter()
        .filter_map(|r| match r {
            ExtractionRequirement::NestedObjects { path } => Some(path.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(nested, vec!["authors", "authors.books"]);
}

#[test]
fn test_nested_objects_of_nested_objects() {
    let books = ObjectProjection::new(
        "authors.books",
        FieldProjection::single("authors.books.title"),
        Accumulator::List,
    );
    let projection = ObjectProjection::new("authors", books, Accumulator::List);
    let hits = project_books(&projection).unwrap();
    assert_eq!(
        hits.values()[0],
        Value::List(vec![
            Value::from(vec!["Dune", "Dune Messiah"]),
            Value::List(vec![]),
        ])
    );
    assert_eq!(hits.values()[2], Value::List(vec![Value::List(vec![])]));
}

#[test]
fn test_flattened_object() {
    let projection = ObjectProjection::new(
        "publisher",
        FieldProjection::single("publisher.name"),
        Accumulator::Optional,
    );
    let hits = project_books(&projection).unwrap();
    assert_eq!(
        hits.into_values(),
        vec![Value::from("Chilton"), Value::Null, Value::Null]
    );
}

#[test]
fn test_fields_outside_the_nested_object_are_rejected() {
    let projection = ObjectProjection::new(
        "authors",
        FieldProjection::single("title"),
        Accumulator::List,
    );
    assert_kind(request_books(&projection), |k| {
        matches!(k, ErrorKind::InvalidNestingContext { path, .. } if path == "title")
    });
}

#[test]
fn test_root_only_projections_inside_objects() {
    let projection = ObjectProjection::new("authors", IdentifierProjection::raw(), Accumulator::List);
    assert_kind(request_books(&projection), |k| {
        matches!(k, ErrorKind::InvalidNestingContext { path, .. } if path == "authors")
    });

    let projection = ObjectProjection::new("authors", ScoreProjection, Accumulator::List);
    assert_kind(request_books(&projection), |k| {
        matches!(k, ErrorKind::InvalidNestingContext { .. })
    });
}

#[test]
fn test_root_remap_inside_nested_objects() {
    let inner = CompositeProjection::builder()
        .add(FieldProjection::single("authors.name"))
        .add(RootContextProjection::new(IdentifierProjection::raw()))
        .add(RootContextProjection::new(FieldProjection::single("title")))
        .as_list();
    let projection = ObjectProjection::new("authors", inner, Accumulator::List);
    let hits = project_books(&projection).unwrap();
    let title = Value::from("The spice must flow. A desert tale.");
    assert_eq!(
        hits.values()[0],
        Value::List(vec![
            Value::List(vec![Value::from("Frank"), Value::from("1"), title.clone()]),
            Value::List(vec![Value::from("Brian"), Value::from("1"), title]),
        ])
    );
    assert_eq!(
        hits.values()[2],
        Value::List(vec![Value::List(vec![
            Value::from("Douglas"),
            Value::from("42"),
            Value::from("Answers. Mostly harmless."),
        ])])
    );
}

#[test]
fn test_root_remap_at_root_is_transparent() {
    let direct = project_books(&FieldProjection::list("authors.name")).unwrap();
    let remapped =
        project_books(&RootContextProjection::new(FieldProjection::list("authors.name"))).unwrap();
    assert_eq!(direct, remapped);

    let score = project_books(&RootContextProjection::new(ScoreProjection)).unwrap();
    assert_eq!(score, project_books(&ScoreProjection).unwrap());
}

#[test]
fn test_root_score_inside_nested_objects() {
    let projection = ObjectProjection::new(
        "authors",
        RootContextProjection::new(ScoreProjection),
        Accumulator::List,
    );
    let hits = project_books(&projection).unwrap();
    assert_eq!(
        hits.values()[0],
        Value::List(vec![Value::F64(2.5), Value::F64(2.5)])
    );
    assert_eq!(hits.values()[1], Value::List(vec![]));
}
