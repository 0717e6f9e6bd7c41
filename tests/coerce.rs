#![cfg(feature = "rusqlite")]

use mycoquery::{CoercionError, Coercible, Model, Query, QueryError, Variant, coerce};
use serde_json::json;

mod common;

#[test]
fn test_observations_to_names_and_back() {
    let store = common::setup_store();
    let observations = Query::new(Model::Observation, Variant::ByUser, &json!({ "user": "rolf" })).unwrap();

    let names = coerce(&observations, Model::Name, &store).unwrap();
    assert_eq!(names.variant(), Variant::WithObservationsByUser);
    assert_eq!(names.result_ids(&store).unwrap(), &[2, 6]);

    let back = coerce(&names, Model::Observation, &store).unwrap();
    assert_eq!(back.variant(), Variant::ByUser);
    assert_eq!(back.params().text("user"), Some("rolf"));
    assert_eq!(back.result_ids(&store).unwrap(), observations.result_ids(&store).unwrap());
    assert_eq!(back.title(), observations.title());
}

#[test]
fn test_unmapped_observation_query_materializes_ids() {
    let store = common::setup_store();
    let observations = Query::new(
        Model::Observation,
        Variant::PatternSearch,
        &json!({ "pattern": "campestris" }),
    )
    .unwrap();
    assert_eq!(observations.result_ids(&store).unwrap(), &[3, 1]);

    let images = observations.coerce_into(Model::Image, &store).unwrap();
    assert_eq!(images.variant(), Variant::WithObservationsInSet);
    assert_eq!(images.params().text("old_title"), Some("query_title_pattern_search"));
    assert_eq!(images.result_ids(&store).unwrap(), &[3, 2, 1]);

    let locations = observations.coerce_into(Model::Location, &store).unwrap();
    assert_eq!(locations.result_ids(&store).unwrap(), &[1]);
}

#[test]
fn test_images_follow_project_to_locations() {
    let store = common::setup_store();
    let images = Query::new(
        Model::Image,
        Variant::WithObservationsForProject,
        &json!({ "project": "Bolete Project" }),
    )
    .unwrap();
    assert_eq!(images.result_ids(&store).unwrap(), &[3, 2, 1]);

    let locations = coerce(&images, Model::Location, &store).unwrap();
    assert_eq!(locations.variant(), Variant::WithObservationsForProject);
    assert_eq!(locations.result_ids(&store).unwrap(), &[1]);
}

#[test]
fn test_rss_logs_to_observations() {
    let store = common::setup_store();
    let logs = Query::new(Model::RssLog, Variant::All, &json!({})).unwrap();
    let observations = coerce(&logs, Model::Observation, &store).unwrap();
    assert_eq!(observations.variant(), Variant::ByRssLog);
    assert_eq!(observations.result_ids(&store).unwrap(), &[1]);
}

#[test]
fn test_typed_rss_logs_to_observations() {
    let store = common::setup_store();
    let logs = Query::new(Model::RssLog, Variant::All, &json!({ "type": "observation" })).unwrap();
    let observations = coerce(&logs, Model::Observation, &store).unwrap();
    assert_eq!(observations.variant(), Variant::ByRssLog);
    assert!(!observations.params().contains("type"));
    assert_eq!(observations.result_ids(&store).unwrap(), &[1]);
}

#[test]
fn test_unrelated_models_refuse() {
    let store = common::setup_store();
    let users = Query::new(Model::User, Variant::All, &json!({})).unwrap();
    assert!(matches!(
        coerce(&users, Model::Herbarium, &store),
        Err(QueryError::Coercion(CoercionError::Unrelated { .. }))
    ));
}
