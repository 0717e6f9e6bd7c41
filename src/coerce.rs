//! Retargeting a query at a related model.
//!
//! A structural rule re-expresses the same filters rooted at the target
//! (observation variants and their `with_observations_*` wrappers,
//! description variants and their `with_descriptions_*` wrappers, rss logs
//! and `by_rss_log`). Otherwise the source ids are materialized into the
//! target's `*_in_set` wrapper.

use crate::{
    error::{CoercionError, Result},
    flavors,
    model::Model,
    params::{ParamValue, Params},
    query::Query,
    variant::{self, Variant},
};
use mycoquery_core::{Id, Storage, myco_trace_coerce};

/// Pairs of models a query can move between, in either direction.
const RELATED: &[(Model, Model)] = &[
    (Model::Observation, Model::Image),
    (Model::Observation, Model::Location),
    (Model::Observation, Model::Name),
    (Model::Image, Model::Location),
    (Model::Image, Model::Name),
    (Model::Location, Model::Name),
    (Model::Location, Model::LocationDescription),
    (Model::Name, Model::NameDescription),
];

fn related(a: Model, b: Model) -> bool {
    RELATED.iter().any(|&(x, y)| (x, y) == (a, b) || (y, x) == (a, b))
        || a == Model::RssLog && b.has_rss_log()
        || b == Model::RssLog && a.has_rss_log()
}

/// `query` as a query over `target`, keeping its title.
pub fn coerce<S: Storage>(query: &Query, target: Model, storage: &S) -> Result<Query> {
    let title = match query.params().get("title") {
        Some(title) => title.clone(),
        None => query.title_param(),
    };
    retarget(query, target, storage, title)
}

/// Like [`coerce`], describing the result with `title` (`[tag, key, value, ...]`).
pub fn coerce_with_title<S: Storage>(query: &Query, target: Model, storage: &S, title: &[&str]) -> Result<Query> {
    let title = ParamValue::Array(title.iter().map(|t| ParamValue::from(*t)).collect());
    retarget(query, target, storage, title)
}

fn retarget<S: Storage>(query: &Query, target: Model, storage: &S, title: ParamValue) -> Result<Query> {
    let from = query.model();
    if from == target {
        myco_trace_coerce!("identity", from, target);
        return Ok(query.clone());
    }
    let config = *query.config();
    if let Some((variant, mut params)) = structural(query, target) {
        myco_trace_coerce!("structural", from, target);
        params.insert("title", title);
        return Query::from_params(target, variant, params, config);
    }
    let variant = match (from, target) {
        (Model::Observation, Model::Image | Model::Location | Model::Name) => Variant::WithObservationsInSet,
        (Model::LocationDescription, Model::Location) | (Model::NameDescription, Model::Name) => {
            Variant::WithDescriptionsInSet
        }
        _ if related(from, target) => {
            return Err(CoercionError::Unsupported {
                model: from,
                variant: query.variant(),
                target,
            }
            .into());
        }
        _ => return Err(CoercionError::Unrelated { from, to: target }.into()),
    };
    myco_trace_coerce!("materialized", from, target);
    let ids: Vec<Id> = query
        .result_ids(storage)?
        .iter()
        .copied()
        .take(config.max_array)
        .collect();
    let mut params = Params::new();
    params.insert("ids", ids);
    params.insert("old_title", query.title().tag.as_str());
    if let Some(by) = query.params().get("by") {
        params.insert("old_by", by.clone());
    }
    params.insert("title", title);
    Query::from_params(target, variant, params, config)
}

/// The target variant and carried parameters, when every parameter of
/// `query` has a counterpart on the target.
fn structural(query: &Query, target: Model) -> Option<(Variant, Params)> {
    let from = query.model();
    let source = query.variant();
    let variant = match from {
        Model::RssLog if source == Variant::All => Some(Variant::ByRssLog),
        Model::Observation => Variant::with_observations(source),
        Model::LocationDescription if target == Model::Location => Variant::with_descriptions(source),
        Model::NameDescription if target == Model::Name => Variant::with_descriptions(source),
        Model::Location if target == Model::LocationDescription => source.description_inner(),
        Model::Name if target == Model::NameDescription => source.description_inner(),
        _ => match source.observation_inner() {
            Some(inner) if target == Model::Observation => Some(inner),
            Some(_) => Some(source),
            None => None,
        },
    }?;
    if !variant::is_allowed(target, variant) {
        return None;
    }

    let accepted = flavors::declarations(target, variant);
    let accepts = |key: &str| accepted.iter().any(|d| d.name == key);
    let mut params = Params::new();
    for (key, value) in query.params().iter() {
        match key {
            "title" => {}
            "type" if from == Model::RssLog => {}
            "by" if accepts("old_by") => params.insert("old_by", value.clone()),
            "by" => {}
            "old_by" if !accepts("old_by") => params.insert("by", value.clone()),
            "old_title" if !accepts("old_title") => {}
            _ if accepts(key) => params.insert(key, value.clone()),
            _ => return None,
        }
    }
    Some((variant, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use mycoquery_core::{Dialect, Sql, Value};
    use serde_json::json;

    struct Fixed(Vec<Id>);

    impl Storage for Fixed {
        fn dialect(&self) -> Dialect {
            Dialect::SQLite
        }

        fn select_ids(&self, _sql: &Sql) -> mycoquery_core::Result<Vec<Id>> {
            Ok(self.0.clone())
        }

        fn select_rows(&self, _sql: &Sql) -> mycoquery_core::Result<Vec<Vec<Value>>> {
            Ok(Vec::new())
        }

        fn select_value(&self, _sql: &Sql) -> mycoquery_core::Result<Option<Value>> {
            Ok(None)
        }
    }

    fn without_title(query: &Query) -> Params {
        let mut params = query.params().clone();
        params.remove("title");
        params
    }

    #[test]
    fn test_same_model_is_identity() {
        let query = Query::new(Model::Name, Variant::All, &json!({ "by": "name" })).unwrap();
        assert_eq!(coerce(&query, Model::Name, &Fixed(vec![])).unwrap(), query);
    }

    #[test]
    fn test_observations_wrap_structurally() {
        let query = Query::new(Model::Observation, Variant::ByUser, &json!({ "user": 3, "by": "date" })).unwrap();
        let names = coerce(&query, Model::Name, &Fixed(vec![])).unwrap();
        assert_eq!(names.variant(), Variant::WithObservationsByUser);
        assert_eq!(names.params().integer("user"), Some(3));
        assert_eq!(names.title(), query.title());

        let back = coerce(&names, Model::Observation, &Fixed(vec![])).unwrap();
        assert_eq!(back.variant(), Variant::ByUser);
        let mut expected = query.params().clone();
        expected.remove("by");
        assert_eq!(without_title(&back), expected);
    }

    #[test]
    fn test_wrapped_variant_moves_between_models() {
        let query = Query::new(Model::Image, Variant::WithObservationsForProject, &json!({ "project": 2 })).unwrap();
        let locations = coerce(&query, Model::Location, &Fixed(vec![])).unwrap();
        assert_eq!(locations.variant(), Variant::WithObservationsForProject);
    }

    #[test]
    fn test_unmapped_variant_materializes() {
        let query = Query::new(Model::Observation, Variant::PatternSearch, &json!({ "pattern": "morel", "by": "name" })).unwrap();
        let images = coerce(&query, Model::Image, &Fixed(vec![5, 6])).unwrap();
        assert_eq!(images.variant(), Variant::WithObservationsInSet);
        assert_eq!(images.params().array("ids"), &[ParamValue::Integer(5), ParamValue::Integer(6)]);
        assert_eq!(images.params().text("old_by"), Some("name"));
        assert_eq!(images.title().tag, "query_title_pattern_search");

        let back = coerce(&images, Model::Observation, &Fixed(vec![])).unwrap();
        assert_eq!(back.variant(), Variant::InSet);
        assert_eq!(back.params().text("by"), Some("name"));
    }

    #[test]
    fn test_descriptions_map_both_ways() {
        let query = Query::new(Model::NameDescription, Variant::ByAuthor, &json!({ "user": 7 })).unwrap();
        let names = coerce(&query, Model::Name, &Fixed(vec![])).unwrap();
        assert_eq!(names.variant(), Variant::WithDescriptionsByAuthor);
        let back = coerce(&names, Model::NameDescription, &Fixed(vec![])).unwrap();
        assert_eq!(without_title(&back), *query.params());
    }

    #[test]
    fn test_rss_log_becomes_by_rss_log() {
        let query = Query::new(Model::RssLog, Variant::All, &serde_json::Value::Null).unwrap();
        let observations = coerce(&query, Model::Observation, &Fixed(vec![])).unwrap();
        assert_eq!(observations.variant(), Variant::ByRssLog);
    }

    #[test]
    fn test_explicit_title_replaces_original() {
        let query = Query::new(Model::Observation, Variant::All, &serde_json::Value::Null).unwrap();
        let names = coerce_with_title(&query, Model::Name, &Fixed(vec![]), &["query_title_custom", "x", "y"]).unwrap();
        assert_eq!(names.title().tag, "query_title_custom");
        assert_eq!(names.title().args["x"], "y");
    }

    #[test]
    fn test_unrelated_and_unsupported() {
        let query = Query::new(Model::Sequence, Variant::All, &serde_json::Value::Null).unwrap();
        let err = coerce(&query, Model::License, &Fixed(vec![])).unwrap_err();
        assert!(matches!(err, QueryError::Coercion(CoercionError::Unrelated { .. })));

        let query = Query::new(
            Model::Name,
            Variant::WithObservationsByUser,
            &json!({ "user": 1, "misspellings": "either" }),
        )
        .unwrap();
        let err = coerce(&query, Model::Observation, &Fixed(vec![])).unwrap_err();
        assert!(matches!(err, QueryError::Coercion(CoercionError::Unsupported { .. })));
    }
}
