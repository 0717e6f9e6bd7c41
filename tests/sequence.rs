#![cfg(feature = "rusqlite")]

use mycoquery::{Model, NestedSequence, Query, SequenceCursor, Sequenceable, Variant};
use serde_json::json;

mod common;

#[test]
fn test_cursor_over_fixed_ids() {
    let mut cursor = SequenceCursor::new(vec![10, 20, 30, 40]);

    cursor.at(20);
    assert_eq!(cursor.prev(), Some(10));
    assert_eq!(cursor.next(), Some(30));
    assert!(!cursor.is_first());
    assert!(!cursor.is_last());

    cursor.at(10);
    assert_eq!(cursor.prev(), None);

    cursor.at(40);
    assert_eq!(cursor.next(), None);
}

#[test]
fn test_cursor_over_query_results() {
    let store = common::setup_store();
    let query = Query::new(Model::Observation, Variant::All, &json!({})).unwrap();

    let mut cursor = query.cursor_at(&store, 2).unwrap();
    assert_eq!(cursor.ids(), &[3, 2, 1, 4]);
    assert_eq!((cursor.prev(), cursor.next()), (Some(3), Some(1)));
    assert_eq!(cursor.step_next(), Some(1));
    assert_eq!(cursor.step_next(), Some(4));
    assert!(cursor.is_last());
    assert_eq!(cursor.step_next(), None);
    assert_eq!(cursor.current(), Some(4));
}

#[test]
fn test_nested_images_cross_observations() {
    let store = common::setup_store();
    let inner = Query::new(
        Model::Image,
        Variant::InsideObservation,
        &json!({ "observation": 3, "outer": { "variant": "all" } }),
    )
    .unwrap();

    let mut nested = NestedSequence::new(inner, 3, &store).unwrap().unwrap();
    assert_eq!(nested.outer().result_ids(&store).unwrap(), &[3, 1]);
    assert_eq!(nested.current(), Some((3, 3)));

    assert_eq!(nested.step_next().unwrap(), Some((1, 2)));
    assert_eq!(nested.inner().params().integer("observation"), Some(1));
    assert_eq!(nested.step_next().unwrap(), Some((1, 1)));
    assert_eq!(nested.step_next().unwrap(), None);
    assert_eq!(nested.current(), Some((1, 1)));

    assert_eq!(nested.step_prev().unwrap(), Some((1, 2)));
    assert_eq!(nested.step_prev().unwrap(), Some((3, 3)));
    assert_eq!(nested.step_prev().unwrap(), None);
}

#[test]
fn test_outer_rows_without_images_are_skipped() {
    let store = common::setup_store();
    let inner = Query::new(
        Model::Image,
        Variant::InsideObservation,
        &json!({ "observation": 1, "outer": { "variant": "by_user", "user": "rolf" } }),
    )
    .unwrap();

    let mut nested = NestedSequence::new(inner, 1, &store).unwrap().unwrap();
    // observation 2 has no thumbnail, so the outer list holds only 1
    assert_eq!(nested.outer().result_ids(&store).unwrap(), &[1]);
    assert_eq!(nested.step_prev().unwrap(), Some((1, 2)));
    assert_eq!(nested.step_prev().unwrap(), None);
}

#[test]
fn test_unplaced_outer_row_leaves_position_alone() {
    let store = common::setup_store();
    let inner = Query::new(
        Model::Image,
        Variant::InsideObservation,
        &json!({ "observation": 1, "outer": { "variant": "by_user", "user": "Mary Newbie" } }),
    )
    .unwrap();

    let mut nested = NestedSequence::new(inner, 2, &store).unwrap().unwrap();
    assert_eq!(nested.outer().result_ids(&store).unwrap(), &[3]);
    assert_eq!(nested.current(), None);
    assert_eq!(nested.inner_current(), Some(2));

    assert_eq!(nested.step_next().unwrap(), None);
    assert_eq!(nested.inner_current(), Some(2));
    assert_eq!(nested.step_prev().unwrap(), None);
    assert_eq!(nested.inner_current(), Some(2));
    assert_eq!(nested.inner().params().integer("observation"), Some(1));
}

#[test]
fn test_flat_query_has_no_nesting() {
    let store = common::setup_store();
    let query = Query::new(Model::Image, Variant::All, &json!({})).unwrap();
    assert!(NestedSequence::new(query, 1, &store).unwrap().is_none());
}
