//! Canonical query keys and the persisted record cache.

use crate::{
    config::QueryConfig,
    error::{QueryError, Result},
    model::Model,
    params::Params,
    query::Query,
    variant::Variant,
};
use mycoquery_core::{Id, QueryRecord, RecordStore, StorageError, myco_trace_cache};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Sorted-key JSON of `params` with `model` and `variant` injected.
///
/// Key order of the input never matters; the output is stable across
/// processes.
pub fn canonical_key(model: Model, variant: Variant, params: &Params) -> Result<String> {
    let mut map: BTreeMap<&str, JsonValue> = BTreeMap::new();
    for (key, value) in params.iter() {
        map.insert(key, serde_json::to_value(value)?);
    }
    map.insert("model", JsonValue::from(model.name()));
    map.insert("variant", JsonValue::from(variant.name()));
    Ok(serde_json::to_string(&map)?)
}

/// Splits a canonical key back into its parts.
pub fn parse_key(description: &str) -> Result<(Model, Variant, JsonValue)> {
    let mut raw: serde_json::Map<String, JsonValue> = serde_json::from_str(description)?;
    let mut take = |key: &str| match raw.remove(key) {
        Some(JsonValue::String(name)) => Ok(name),
        _ => Err(QueryError::Storage(StorageError::Mapping(format!(
            "query record without `{key}`: {description}"
        )))),
    };
    let model = take("model")?.parse()?;
    let variant = take("variant")?.parse()?;
    Ok((model, variant, JsonValue::Object(raw)))
}

/// Query records behind a [`RecordStore`].
///
/// Records are found by canonical key and created on first miss. Creation
/// relies on the store's uniqueness guarantee: a losing racer re-reads the
/// winner's record.
#[derive(Debug)]
pub struct QueryCache<R> {
    store: R,
    config: QueryConfig,
}

impl<R: RecordStore> QueryCache<R> {
    pub fn new(store: R) -> Self {
        Self::with_config(store, QueryConfig::default())
    }

    pub fn with_config(store: R, config: QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    /// The record for `key`, inserting it when absent.
    pub fn get_or_create(&self, key: &str) -> Result<QueryRecord> {
        if let Some(record) = self.store.find_record(key)? {
            myco_trace_cache!("hit", record.id);
            return Ok(record);
        }
        match self.store.insert_record(key) {
            Ok(record) => {
                myco_trace_cache!("miss", record.id);
                Ok(record)
            }
            Err(err) if err.is_conflict() => {
                let record = self.store.find_record(key)?.ok_or(StorageError::NotFound)?;
                myco_trace_cache!("race", record.id);
                Ok(record)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Counts one more use of `record`.
    pub fn touch(&self, record: &mut QueryRecord) -> Result<()> {
        self.store.increment_access(record.id)?;
        record.access_count += 1;
        Ok(())
    }

    /// Record for `query`, created if needed and touched.
    pub fn lookup(&self, query: &Query) -> Result<QueryRecord> {
        let mut record = self.get_or_create(&query.canonical_key()?)?;
        self.touch(&mut record)?;
        Ok(record)
    }

    /// Rebuilds the query stored under `id`.
    pub fn load(&self, id: Id) -> Result<Query> {
        let record = self.store.find_record_by_id(id)?.ok_or(StorageError::NotFound)?;
        let (model, variant, raw) = parse_key(&record.description)?;
        Query::with_config(model, variant, &raw, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycoquery_core::MemoryRecordStore;
    use serde_json::json;

    /// Loses every insert race: the record appears just before our insert.
    struct Racing {
        inner: MemoryRecordStore,
    }

    impl RecordStore for Racing {
        fn find_record(&self, description: &str) -> mycoquery_core::Result<Option<QueryRecord>> {
            self.inner.find_record(description)
        }

        fn find_record_by_id(&self, id: Id) -> mycoquery_core::Result<Option<QueryRecord>> {
            self.inner.find_record_by_id(id)
        }

        fn insert_record(&self, description: &str) -> mycoquery_core::Result<QueryRecord> {
            self.inner.insert_record(description)?;
            self.inner.insert_record(description)
        }

        fn increment_access(&self, id: Id) -> mycoquery_core::Result<()> {
            self.inner.increment_access(id)
        }
    }

    #[test]
    fn test_key_ignores_input_order() {
        let a = Query::new(Model::Observation, Variant::All, &json!({ "has_images": true, "users": [1, 2] })).unwrap();
        let b = Query::new(Model::Observation, Variant::All, &json!({ "users": [1, 2], "has_images": true })).unwrap();
        let key = a.canonical_key().unwrap();
        assert_eq!(key, b.canonical_key().unwrap());
        assert_eq!(
            key,
            r#"{"has_images":true,"model":"Observation","users":[1,2],"variant":"all"}"#
        );
    }

    #[test]
    fn test_variant_is_part_of_key() {
        let params = Params::new();
        assert_ne!(
            canonical_key(Model::Name, Variant::All, &params).unwrap(),
            canonical_key(Model::Name, Variant::WithObservations, &params).unwrap()
        );
    }

    #[test]
    fn test_lookup_creates_then_hits() {
        let cache = QueryCache::new(MemoryRecordStore::new());
        let query = Query::new(Model::Name, Variant::PatternSearch, &json!({ "pattern": "boletus" })).unwrap();
        let first = cache.lookup(&query).unwrap();
        let second = cache.lookup(&query).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.access_count, 2);
        assert_eq!(cache.store().len(), 1);
    }

    #[test]
    fn test_lost_race_reads_winner() {
        let cache = QueryCache::new(Racing {
            inner: MemoryRecordStore::new(),
        });
        let record = cache.get_or_create("{\"model\":\"Name\"}").unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(cache.store().inner.len(), 1);
    }

    #[test]
    fn test_load_round_trips() {
        let cache = QueryCache::new(MemoryRecordStore::new());
        let query = Query::new(
            Model::Image,
            Variant::InsideObservation,
            &json!({ "observation": 4, "outer": { "variant": "by_user", "user": "rolf" } }),
        )
        .unwrap();
        let record = cache.lookup(&query).unwrap();
        assert_eq!(cache.load(record.id).unwrap(), query);
    }

    #[test]
    fn test_load_missing_record() {
        let cache = QueryCache::new(MemoryRecordStore::new());
        assert!(matches!(
            cache.load(3),
            Err(QueryError::Storage(StorageError::NotFound))
        ));
    }
}
