//! The (model, variant) table: which pairs exist, what each accepts, and
//! how each is initialized.

use crate::{
    condition::{Assembly, ConditionBuilder},
    config::QueryConfig,
    error::{QueryError, Result},
    filters, flavors,
    lookup::Resolver,
    model::Model,
    ordering,
    params::Params,
    schema::{Declaration, DeclarationSet, ParamType, opt},
    variant::{self, Variant},
};

/// Accepted by every query.
const GLOBAL: &[Declaration] = &[
    opt("title", ParamType::Array(&ParamType::String)),
    opt("by", ParamType::String),
];

/// Merged declarations for one pair: global, then model filters, then the
/// variant's own.
pub fn declarations(model: Model, variant: Variant) -> Result<DeclarationSet> {
    if !variant::is_allowed(model, variant) {
        return Err(QueryError::NoSuchVariant { model, variant });
    }
    let mut set = DeclarationSet::from_slice(GLOBAL)?;
    for group in filters::declarations(model) {
        set.extend(group)?;
    }
    set.extend(&flavors::declarations(model, variant))?;
    Ok(set)
}

/// Every pair the engine knows, model by model.
pub fn pairs() -> impl Iterator<Item = (Model, Variant)> {
    Model::ALL
        .into_iter()
        .flat_map(|model| variant::allowed_variants(model).iter().map(move |&v| (model, v)))
}

/// Runs filter, variant and ordering initialization over validated params.
pub fn build(
    model: Model,
    variant: Variant,
    params: &Params,
    resolver: &dyn Resolver,
    config: QueryConfig,
) -> Result<Assembly> {
    if !variant::is_allowed(model, variant) {
        return Err(QueryError::NoSuchVariant { model, variant });
    }
    let mut b = ConditionBuilder::new(model, variant, params, resolver, config);
    filters::init(&mut b)?;
    flavors::init(&mut b)?;
    ordering::apply(&mut b)?;
    Ok(b.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycoquery_core::{Dialect, Id, Sql, Storage, Value};

    struct Empty;

    impl Storage for Empty {
        fn dialect(&self) -> Dialect {
            Dialect::SQLite
        }

        fn select_ids(&self, _sql: &Sql) -> mycoquery_core::Result<Vec<Id>> {
            Ok(Vec::new())
        }

        fn select_rows(&self, _sql: &Sql) -> mycoquery_core::Result<Vec<Vec<Value>>> {
            Ok(Vec::new())
        }

        fn select_value(&self, _sql: &Sql) -> mycoquery_core::Result<Option<Value>> {
            Ok(None)
        }
    }

    #[test]
    fn test_every_pair_has_consistent_declarations() {
        for (model, variant) in pairs() {
            let set = declarations(model, variant)
                .unwrap_or_else(|e| panic!("{model} {variant}: {e}"));
            assert!(set.get("by").is_some());
        }
    }

    #[test]
    fn test_unlisted_pair_is_rejected() {
        let err = declarations(Model::License, Variant::OfName).unwrap_err();
        assert!(matches!(err, QueryError::NoSuchVariant { .. }));
        assert!(build(Model::License, Variant::OfName, &Params::new(), &Empty, QueryConfig::default()).is_err());
    }

    #[test]
    fn test_variant_keys_are_required() {
        let set = declarations(Model::Comment, Variant::ForTarget).unwrap();
        assert!(set.get("target").unwrap().required);
        assert!(!set.get("types").unwrap().required);
    }

    #[test]
    fn test_all_builds_for_every_model() {
        for model in Model::ALL {
            let assembly = build(model, Variant::All, &Params::new(), &Empty, QueryConfig::default()).unwrap();
            // names hide misspellings unless asked
            let expected = usize::from(model == Model::Name);
            assert_eq!(assembly.wheres.len(), expected, "{model}");
            assert!(!assembly.order.is_empty(), "{model}");
        }
    }

    #[test]
    fn test_with_observations_declares_inner_keys() {
        let set = declarations(Model::Location, Variant::WithObservationsOfName).unwrap();
        assert!(set.get("name").unwrap().required);
        assert!(set.get("has_specimen").is_some());
    }
}
