use prism_common::{Value, ValueType, error::ErrorKind};

use super::{assert_kind, project_books, request_books};
use crate::{
    Accumulator, ExtractionRequirement,
    projection::{FieldProjection, FieldProjectionBuilder},
};

#[test]
fn test_single_value_field() {
    let hits = project_books(&FieldProjection::single("title")).unwrap();
    assert_eq!(
        hits.values(),
        &[
            Value::from("The spice must flow. A desert tale."),
            Value::from("Emma"),
            Value::from("Answers. Mostly harmless."),
        ]
    );
    assert!(!hits.has_failed_load());
}

#[test]
fn test_absent_values_finish_empty() {
    let tags = project_books(&FieldProjection::list("tags")).unwrap();
    assert_eq!(tags.values()[1], Value::List(vec![]));

    let publisher = project_books(
        &FieldProjectionBuilder::new("publisher.name").build(Accumulator::Optional),
    )
    .unwrap();
    assert_eq!(
        publisher.into_values(),
        vec![Value::from("Chilton"), Value::Null, Value::Null]
    );
}

#[test]
fn test_ordered_list_reads_stored_values() {
    let projection = FieldProjection::list("tags");
    let hits = project_books(&projection).unwrap();
    assert_eq!(hits.values()[0], Value::from(vec!["sf", "classic", "desert"]));
    assert_eq!(hits.values()[2], Value::from(vec!["humor"]));

    let executor = request_books(&projection).unwrap();
    assert!(executor.requirements().iter().any(|r| matches!(
        r,
        ExtractionRequirement::StoredField { path, nested_path: None } if path == "tags"
    )));
}

#[test]
fn test_unordered_list_reads_doc_values() {
    let projection = FieldProjectionBuilder::new("tags").build(Accumulator::UnorderedList);
    let hits = project_books(&projection).unwrap();
    let Value::List(mut tags) = hits.values()[0].clone() else {
        panic!("expected a list");
    };
    tags.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
    assert_eq!(tags, ["classic", "desert", "sf"].map(Value::from).to_vec());
    assert_eq!(request_books(&projection).unwrap().requirements().stored_field_count(), 0);

    let ordered = FieldProjectionBuilder::new("tags")
        .order_preserving()
        .build(Accumulator::UnorderedList);
    let hits = project_books(&ordered).unwrap();
    assert_eq!(hits.values()[0], Value::from(vec!["sf", "classic", "desert"]));
}

#[test]
fn test_single_accumulator_on_multi_valued_field() {
    assert_kind(request_books(&FieldProjection::single("tags")), |k| {
        matches!(k, ErrorKind::InvalidNestingContext { path, .. } if path == "tags")
    });
}

#[test]
fn test_unknown_field() {
    assert_kind(request_books(&FieldProjection::single("isbn")), |k| {
        matches!(k, ErrorKind::UnknownField { path, indexes } if path == "isbn" && indexes == &["library"])
    });
}

#[test]
fn test_object_field_is_not_projectable() {
    assert_kind(request_books(&FieldProjection::single("publisher")), |k| {
        matches!(k, ErrorKind::FieldNotProjectable { .. })
    });
}

#[test]
fn test_expected_type() {
    let rating = FieldProjectionBuilder::new("rating")
        .expect_type(ValueType::I64)
        .build(Accumulator::Single);
    let hits = project_books(&rating).unwrap();
    assert_eq!(
        hits.into_values(),
        vec![Value::I64(5), Value::I64(3), Value::I64(4)]
    );

    let as_string = FieldProjectionBuilder::new("rating")
        .expect_type(ValueType::String)
        .build(Accumulator::Single);
    assert_kind(request_books(&as_string), |k| {
        matches!(k, ErrorKind::TypeIncompatibility { path, .. } if path == "rating")
    });
}

#[test]
fn test_order_preserving_single_valued_field_uses_doc_values() {
    // `rating` has no stored values; order only matters for multi-valued fields.
    let projection = FieldProjectionBuilder::new("rating")
        .order_preserving()
        .build(Accumulator::List);
    assert!(request_books(&projection).is_ok());
}
