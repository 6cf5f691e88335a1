use std::sync::Arc;

use prism_common::{Value, error::Error};
use prism_index_core::EntityLoader;
use prism_testkit::MapEntityLoader;

use super::{book_hits, books_index, prepare, project_books, request_books};
use crate::{
    ExecutionOptions, ExtractionRequirement, ProjectionExecutor, ProjectionScope,
    projection::{
        CompositeProjection, ConstantProjection, FieldProjection, IdentifierProjection,
        ScoreProjection,
    },
};

#[test]
fn test_identifier_and_score() {
    let projection = CompositeProjection::builder()
        .add(IdentifierProjection::new())
        .add(ScoreProjection)
        .as_list();
    let hits = project_books(&projection).unwrap();
    let Value::List(answer) = &hits.values()[2] else {
        panic!("expected a list, got {:?}", hits.values()[2]);
    };
    assert_eq!(answer[0], Value::I64(42));
    // Scores are widened from f32.
    assert_eq!(answer[1], Value::F64(f64::from(1.37f32)));
    assert_ne!(answer[1], Value::F64(1.37));
    assert_eq!(
        hits.values()[0],
        Value::List(vec![Value::I64(1), Value::F64(2.5)])
    );
}

#[test]
fn test_raw_identifier() {
    let hits = project_books(&IdentifierProjection::raw()).unwrap();
    assert_eq!(
        hits.into_values(),
        vec![Value::from("1"), Value::from("2"), Value::from("42")]
    );
}

#[test]
fn test_combiner() {
    let projection = CompositeProjection::builder()
        .add(FieldProjection::single("title"))
        .add(FieldProjection::single("rating"))
        .combine(|values| {
            let [title, rating] = <[Value; 2]>::try_from(values)
                .map_err(|_| Error::invalid_arg("values", "expected two values"))?;
            let title = title.try_into_string("title")?;
            Ok(Value::String(format!("{title} ({rating})")))
        });
    let hits = project_books(&projection).unwrap();
    assert_eq!(hits.values()[1], Value::from("Emma (3)"));
}

#[test]
fn test_nested_composites_keep_child_positions() {
    let inner = CompositeProjection::builder()
        .add(ConstantProjection(Value::from("a")))
        .add(IdentifierProjection::raw())
        .as_list();
    let projection = CompositeProjection::builder()
        .add(inner)
        .add(ConstantProjection(Value::I64(7)))
        .add(CompositeProjection::builder().as_list())
        .as_list();
    let hits = project_books(&projection).unwrap();
    assert_eq!(
        hits.values()[1],
        Value::List(vec![
            Value::List(vec![Value::from("a"), Value::from("2")]),
            Value::I64(7),
            Value::List(vec![]),
        ])
    );
}

#[test]
fn test_requirements_are_deduplicated() {
    let tags = Arc::new(FieldProjection::list("tags"));
    let projection = CompositeProjection::builder()
        .add_shared(tags.clone())
        .add(ScoreProjection)
        .add_shared(tags)
        .add(FieldProjection::list("tags"))
        .add(ScoreProjection)
        .as_list();
    let executor = request_books(&projection).unwrap();
    let requirements = executor.requirements();
    assert!(requirements.requires_score());
    assert_eq!(requirements.stored_field_count(), 1);
    assert_eq!(requirements.len(), 2);
    assert_eq!(requirements.collector_factories().len(), 1);
    assert!(
        requirements
            .iter()
            .any(|r| *r == ExtractionRequirement::Score)
    );
}

#[test]
fn test_transform_batches_do_not_change_results() {
    let projection = CompositeProjection::builder()
        .add(IdentifierProjection::new())
        .add(FieldProjection::list("tags"))
        .as_list();
    let index = books_index();
    let readers = [index.reader()];
    let hits = book_hits(&index);
    let loader = Arc::new(MapEntityLoader::new()) as Arc<dyn EntityLoader>;

    let expected = prepare(&projection, &readers)
        .unwrap()
        .execute_on_readers(&readers, &hits, loader.clone())
        .unwrap();
    let batched = ProjectionExecutor::prepare(
        &projection,
        ProjectionScope::from_readers(&readers).unwrap(),
        ExecutionOptions::new()
            .transform_batch_size(1)
            .stored_document_cache_size(1),
    )
    .unwrap()
    .execute_on_readers(&readers, &hits, loader)
    .unwrap();
    assert_eq!(expected, batched);
}

#[test]
fn test_hits_keep_their_order_across_segments() {
    let index = books_index();
    let readers = [index.reader()];
    let mut hits = book_hits(&index);
    hits.reverse();
    let executor = prepare(&IdentifierProjection::raw(), &readers).unwrap();
    let projected = executor
        .execute_on_readers(&readers, &hits, Arc::new(MapEntityLoader::new()))
        .unwrap();
    assert_eq!(
        projected.into_values(),
        vec![Value::from("42"), Value::from("2"), Value::from("1")]
    );
}

#[test]
fn test_hit_in_unknown_segment() {
    let index = books_index();
    let readers = [index.reader()];
    let executor = prepare(&IdentifierProjection::raw(), &readers).unwrap();
    let hits = [prism_index_core::SearchHit::new(5, 0, 1.0)];
    assert!(
        executor
            .execute_on_readers(&readers, &hits, Arc::new(MapEntityLoader::new()))
            .is_err()
    );
}
