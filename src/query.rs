//! The assembled query and its lazily materialized results.

use crate::{
    cache,
    condition::{Assembly, Executor, OuterTweak},
    config::QueryConfig,
    error::{QueryError, Result, SchemaError},
    joins::render_joins,
    lookup::Resolver,
    model::Model,
    ordering::{OrderTerm, order_clause},
    params::{ParamValue, Params},
    registry,
    schema::validate,
    variant::{self, Variant},
};
use compact_str::{CompactString, format_compact};
use hashbrown::HashSet;
use mycoquery_core::{Id, JoinGraph, Sql, Storage, Token, Value, myco_trace_results};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::{cell::OnceCell, collections::BTreeMap};

/// Structured data for a human-readable description of a query.
///
/// Rendering is left to the caller; `tag` names a sentence template and
/// `args` fills it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitleMetadata {
    pub tag: CompactString,
    pub args: BTreeMap<CompactString, String>,
}

/// One page of a result list.
///
/// `number` is 1-based. With `letter` set, only rows whose title column
/// starts with that letter are paged; `used_letters` reports the letters
/// present in the whole result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paginator {
    pub number: usize,
    pub per_page: usize,
    pub letter: Option<char>,
    pub num_total: usize,
    pub used_letters: Vec<char>,
}

impl Paginator {
    pub fn new(number: usize, per_page: usize) -> Self {
        Self {
            number: number.max(1),
            per_page,
            ..Self::default()
        }
    }

    pub fn with_letter(mut self, letter: char) -> Self {
        self.letter = Some(letter.to_ascii_uppercase());
        self
    }

    /// Number of pages given the current total.
    pub fn num_pages(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        self.num_total.div_ceil(self.per_page)
    }

    fn range(&self, len: usize) -> std::ops::Range<usize> {
        let start = (self.number.max(1) - 1).saturating_mul(self.per_page).min(len);
        start..start.saturating_add(self.per_page).min(len)
    }
}

/// A validated (model, variant, params) triple.
///
/// Conditions, joins and ordering are assembled on first use and the id
/// list is materialized at most once; neither happens just to compute the
/// cache key or the title.
#[derive(Debug, Clone)]
pub struct Query {
    model: Model,
    variant: Variant,
    params: Params,
    config: QueryConfig,
    /// Conditions pushed in by inner queries.
    tweaks: Vec<Sql>,
    assembly: OnceCell<Assembly>,
    result_ids: OnceCell<Vec<Id>>,
}

impl Query {
    /// Validates `raw` (a JSON object, or null for no parameters) against
    /// the pair's declarations.
    pub fn new(model: Model, variant: Variant, raw: &JsonValue) -> Result<Self> {
        Self::with_config(model, variant, raw, QueryConfig::default())
    }

    pub fn with_config(model: Model, variant: Variant, raw: &JsonValue, config: QueryConfig) -> Result<Self> {
        let decls = registry::declarations(model, variant)?;
        let empty = Map::new();
        let raw = match raw {
            JsonValue::Object(map) => map,
            JsonValue::Null => &empty,
            other => {
                return Err(SchemaError::InvalidValue {
                    key: "params".into(),
                    expected: "object".into(),
                    got: other.to_string(),
                }
                .into());
            }
        };
        let params = validate(&decls, raw, &config)?;
        Ok(Self::assemble_later(model, variant, params, config))
    }

    /// Looks the pair up by name, as stored in cache records.
    pub fn from_names(model: &str, variant: &str, raw: &JsonValue, config: QueryConfig) -> Result<Self> {
        Self::with_config(model.parse()?, variant.parse()?, raw, config)
    }

    /// Wraps parameters that were already validated for this pair.
    pub fn from_params(model: Model, variant: Variant, params: Params, config: QueryConfig) -> Result<Self> {
        if !variant::is_allowed(model, variant) {
            return Err(QueryError::NoSuchVariant { model, variant });
        }
        Ok(Self::assemble_later(model, variant, params, config))
    }

    fn assemble_later(model: Model, variant: Variant, params: Params, config: QueryConfig) -> Self {
        Self {
            model,
            variant,
            params,
            config,
            tweaks: Vec::new(),
            assembly: OnceCell::new(),
            result_ids: OnceCell::new(),
        }
    }

    #[inline]
    pub fn model(&self) -> Model {
        self.model
    }

    #[inline]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[inline]
    pub fn params(&self) -> &Params {
        &self.params
    }

    #[inline]
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Sorted-key JSON identifying this query in the cache.
    pub fn canonical_key(&self) -> Result<String> {
        cache::canonical_key(self.model, self.variant, &self.params)
    }

    /// Title tag and arguments; a `title` parameter overrides the default.
    ///
    /// The override is `[tag, key, value, key, value, ...]`.
    pub fn title(&self) -> TitleMetadata {
        let given = self.params.strings("title");
        if let Some((tag, rest)) = given.split_first() {
            let args = rest
                .chunks_exact(2)
                .map(|pair| (CompactString::from(pair[0]), pair[1].to_owned()))
                .collect();
            return TitleMetadata {
                tag: (*tag).into(),
                args,
            };
        }
        let mut args: BTreeMap<CompactString, String> = self
            .params
            .iter()
            .filter(|(key, _)| !matches!(*key, "by" | "title" | "old_title" | "old_by"))
            .map(|(key, value)| (CompactString::from(key), value.display()))
            .collect();
        args.insert("type".into(), self.model.type_tag().to_owned());
        TitleMetadata {
            tag: format_compact!("query_title_{}", self.variant.name()),
            args,
        }
    }

    /// Flattened title, the form a `title` parameter takes.
    pub fn title_param(&self) -> ParamValue {
        let title = self.title();
        let mut items = vec![ParamValue::Text(title.tag)];
        for (key, value) in title.args {
            items.push(ParamValue::Text(key));
            items.push(ParamValue::Text(value.into()));
        }
        ParamValue::Array(items)
    }

    /// Adds a condition from an inner query before this query runs.
    ///
    /// Drops anything already assembled or materialized.
    pub fn apply_tweak(&mut self, tweak: &OuterTweak) {
        self.tweaks.push(tweak.condition.clone());
        self.assembly = OnceCell::new();
        self.result_ids = OnceCell::new();
    }

    /// Conditions, joins and ordering, assembled once.
    pub fn assembly(&self, resolver: &dyn Resolver) -> Result<&Assembly> {
        if let Some(assembly) = self.assembly.get() {
            return Ok(assembly);
        }
        let mut assembly = registry::build(self.model, self.variant, &self.params, resolver, self.config)?;
        assembly.wheres.extend(self.tweaks.iter().cloned());
        Ok(self.assembly.get_or_init(|| assembly))
    }

    /// The outer query given through an `outer` subquery parameter, with
    /// this query's tweak applied.
    pub fn outer_query(&self, resolver: &dyn Resolver) -> Result<Option<Query>> {
        let Some(sub) = self.params.subquery("outer") else {
            return Ok(None);
        };
        let outer_model = match self.variant {
            Variant::InsideObservation => Model::Observation,
            _ => self.model,
        };
        let mut outer = Query::from_params(outer_model, sub.variant, sub.params.clone(), self.config)?;
        if let Some(tweak) = &self.assembly(resolver)?.tweak {
            outer.apply_tweak(tweak);
        }
        Ok(Some(outer))
    }

    /// The id-selecting statement, ignoring any executor override.
    pub fn to_sql(&self, resolver: &dyn Resolver) -> Result<Sql> {
        let assembly = self.assembly(resolver)?;
        self.statement(assembly, &assembly.joins, &assembly.wheres, &assembly.order, None)
    }

    /// [`Self::to_sql`] rendered in the configured dialect.
    pub fn to_sql_string(&self, resolver: &dyn Resolver) -> Result<String> {
        Ok(self.to_sql(resolver)?.sql(self.config.dialect))
    }

    fn root(&self) -> Sql {
        Sql::column(self.model.table(), "id")
    }

    /// `SELECT head FROM root JOIN ... WHERE ...`
    fn select_from(&self, head: Sql, joins: &JoinGraph, wheres: &[Sql]) -> Result<Sql> {
        let table = self.model.table();
        let mut sql = Sql::token(Token::SELECT)
            .append(head)
            .push(Token::FROM)
            .append(Sql::ident(table))
            .append(render_joins(table, &joins.flatten())?);
        if !wheres.is_empty() {
            sql = sql
                .push(Token::WHERE)
                .append(Sql::and_all(wheres.iter().cloned()));
        }
        Ok(sql)
    }

    fn statement(
        &self,
        assembly: &Assembly,
        joins: &JoinGraph,
        wheres: &[Sql],
        order: &[OrderTerm],
        limit: Option<i64>,
    ) -> Result<Sql> {
        let root = self.root();
        let (head, group, order) = match &assembly.group {
            Some(group) => (root, Some(group.clone()), order.to_vec()),
            None if self.config.dialect.distinct_orders_by_selected_only() => {
                // grouping by id keeps rows unique; order keys become aggregates
                let order = order
                    .iter()
                    .map(|term| {
                        if term.expr == root {
                            term.clone()
                        } else {
                            OrderTerm {
                                expr: Sql::func("MIN", term.expr.clone()),
                                descending: term.descending,
                            }
                        }
                    })
                    .collect();
                (root.clone(), Some(root), order)
            }
            None => (Sql::token(Token::DISTINCT).append(root), None, order.to_vec()),
        };
        let mut sql = self.select_from(head, joins, wheres)?;
        if let Some(group) = group {
            sql = sql.push(Token::GROUP_BY).append(group);
        }
        sql = sql.append(order_clause(&order));
        if let Some(limit) = limit {
            sql = sql.push(Token::LIMIT).append(Sql::number(limit));
        }
        Ok(sql)
    }

    /// Ordered, de-duplicated result ids, materialized once.
    pub fn result_ids<S: Storage>(&self, storage: &S) -> Result<&[Id]> {
        if let Some(ids) = self.result_ids.get() {
            return Ok(ids);
        }
        let ids = self.run(storage)?;
        myco_trace_results!(self.model, self.variant, ids.len());
        Ok(self.result_ids.get_or_init(|| ids))
    }

    fn run<S: Storage>(&self, storage: &S) -> Result<Vec<Id>> {
        let assembly = self.assembly(storage)?;
        match &assembly.executor {
            None => Ok(storage.select_ids(&self.to_sql(storage)?)?),
            Some(Executor::Union(augmentations)) => {
                let mut seen = HashSet::new();
                let mut out = Vec::new();
                for augmentation in augmentations {
                    let mut joins = assembly.joins.clone();
                    joins.merge(&augmentation.joins);
                    let mut wheres = assembly.wheres.clone();
                    wheres.push(augmentation.condition.clone());
                    let sql = self.statement(assembly, &joins, &wheres, &assembly.order, None)?;
                    out.extend(storage.select_ids(&sql)?.into_iter().filter(|id| seen.insert(*id)));
                }
                Ok(out)
            }
            Some(Executor::Delegate { inner, link }) => {
                let linked = inner.result_ids(storage)?;
                let mut joins = assembly.joins.clone();
                joins.add_path([link.table]);
                let mut wheres = assembly.wheres.clone();
                wheres.push(if linked.is_empty() {
                    Sql::never()
                } else {
                    Sql::column(link.table, link.column).in_list(linked.iter().copied())
                });
                let sql = self.statement(assembly, &joins, &wheres, &assembly.order, None)?;
                Ok(storage.select_ids(&sql)?)
            }
        }
    }

    /// Number of results, materializing the id list if needed.
    pub fn num_results<S: Storage>(&self, storage: &S) -> Result<usize> {
        Ok(self.result_ids(storage)?.len())
    }

    /// `COUNT(DISTINCT id)` without materializing ids. Executor-backed
    /// queries fall back to [`Self::num_results`].
    pub fn select_count<S: Storage>(&self, storage: &S) -> Result<usize> {
        if let Some(ids) = self.result_ids.get() {
            return Ok(ids.len());
        }
        let assembly = self.assembly(storage)?;
        if assembly.executor.is_some() {
            return self.num_results(storage);
        }
        let head = Sql::func("COUNT", Sql::token(Token::DISTINCT).append(self.root()));
        let sql = self.select_from(head, &assembly.joins, &assembly.wheres)?;
        let count = match storage.select_value(&sql)? {
            Some(Value::Integer(n)) => usize::try_from(n).unwrap_or(0),
            _ => 0,
        };
        Ok(count)
    }

    /// Ids on the paginator's page, updating its totals.
    pub fn paginate_ids<S: Storage>(&self, storage: &S, paginator: &mut Paginator) -> Result<Vec<Id>> {
        let column = match (paginator.letter, self.model.title_column()) {
            (Some(_), Some(column)) => column,
            _ => {
                let ids = self.result_ids(storage)?;
                paginator.num_total = ids.len();
                paginator.used_letters.clear();
                return Ok(ids[paginator.range(ids.len())].to_vec());
            }
        };
        let ids = self.result_ids(storage)?;
        let letters = self.first_letters(storage, column)?;
        let mut used: Vec<char> = letters.values().copied().collect();
        used.sort_unstable();
        used.dedup();
        let matching: Vec<Id> = ids
            .iter()
            .copied()
            .filter(|id| letters.get(id).copied() == paginator.letter)
            .collect();
        paginator.used_letters = used;
        paginator.num_total = matching.len();
        Ok(matching[paginator.range(matching.len())].to_vec())
    }

    /// Upper-cased first character of `column` for every result row.
    fn first_letters<S: Storage>(&self, storage: &S, column: &'static str) -> Result<hashbrown::HashMap<Id, char>> {
        let assembly = self.assembly(storage)?;
        let table = self.model.table();
        let first = Sql::func(
            "UPPER",
            Sql::func(
                "SUBSTR",
                Sql::column(table, column)
                    .push(Token::COMMA)
                    .append(Sql::number(1))
                    .push(Token::COMMA)
                    .append(Sql::number(1)),
            ),
        );
        let head = Sql::token(Token::DISTINCT)
            .append(self.root())
            .push(Token::COMMA)
            .append(first);
        let sql = self.select_from(head, &assembly.joins, &assembly.wheres)?;
        let mut letters = hashbrown::HashMap::new();
        for row in storage.select_rows(&sql)? {
            let (Some(id), Some(letter)) = (
                row.first().and_then(Value::as_i64),
                row.get(1).and_then(Value::as_str).and_then(|s| s.chars().next()),
            ) else {
                continue;
            };
            letters.insert(id, letter);
        }
        Ok(letters)
    }

    /// First id in result order via `LIMIT 1`.
    pub fn first_id<S: Storage>(&self, storage: &S) -> Result<Option<Id>> {
        self.edge_id(storage, false)
    }

    /// Last id in result order via reversed `LIMIT 1`.
    pub fn last_id<S: Storage>(&self, storage: &S) -> Result<Option<Id>> {
        self.edge_id(storage, true)
    }

    fn edge_id<S: Storage>(&self, storage: &S, last: bool) -> Result<Option<Id>> {
        let assembly = self.assembly(storage)?;
        if let Some(ids) = self.result_ids.get() {
            return Ok((if last { ids.last() } else { ids.first() }).copied());
        }
        if assembly.executor.is_some() {
            let ids = self.result_ids(storage)?;
            return Ok((if last { ids.last() } else { ids.first() }).copied());
        }
        let order: Vec<OrderTerm> = if last {
            assembly.order.iter().cloned().map(OrderTerm::reversed).collect()
        } else {
            assembly.order.clone()
        };
        let sql = self.statement(assembly, &assembly.joins, &assembly.wheres, &order, Some(1))?;
        Ok(storage.select_ids(&sql)?.first().copied())
    }
}

impl PartialEq for Query {
    /// Same pair and parameters; assembly state is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
            && self.variant == other.variant
            && self.params == other.params
            && self.tweaks == other.tweaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycoquery_core::Dialect;
    use serde_json::json;
    use std::cell::RefCell;

    /// Records every statement and answers with fixed ids.
    #[derive(Default)]
    struct Recording {
        ids: Vec<Id>,
        seen: RefCell<Vec<String>>,
    }

    impl Storage for Recording {
        fn dialect(&self) -> Dialect {
            Dialect::SQLite
        }

        fn select_ids(&self, sql: &Sql) -> mycoquery_core::Result<Vec<Id>> {
            self.seen.borrow_mut().push(sql.sql(Dialect::SQLite));
            Ok(self.ids.clone())
        }

        fn select_rows(&self, sql: &Sql) -> mycoquery_core::Result<Vec<Vec<Value>>> {
            self.seen.borrow_mut().push(sql.sql(Dialect::SQLite));
            Ok(self
                .ids
                .iter()
                .map(|&id| vec![Value::Integer(id), Value::from(if id % 2 == 0 { "A" } else { "B" })])
                .collect())
        }

        fn select_value(&self, sql: &Sql) -> mycoquery_core::Result<Option<Value>> {
            self.seen.borrow_mut().push(sql.sql(Dialect::SQLite));
            Ok(Some(Value::Integer(self.ids.len() as i64)))
        }
    }

    #[test]
    fn test_statement_shape() {
        let query = Query::new(Model::Observation, Variant::ByUser, &json!({ "user": 3 })).unwrap();
        let store = Recording::default();
        assert_eq!(
            query.to_sql_string(&store).unwrap(),
            r#"SELECT DISTINCT "observations"."id" FROM "observations" WHERE ("observations"."user_id" IN (?)) ORDER BY "observations"."when" DESC, "observations"."id" DESC"#
        );
    }

    #[test]
    fn test_mysql_groups_instead_of_distinct() {
        let config = QueryConfig {
            dialect: Dialect::MySQL,
            ..QueryConfig::default()
        };
        let query = Query::with_config(Model::Observation, Variant::ByUser, &json!({ "user": 3, "by": "name" }), config)
            .unwrap();
        let sql = query.to_sql_string(&Recording::default()).unwrap();
        assert!(sql.starts_with("SELECT `observations`.`id` FROM"));
        assert!(!sql.contains("DISTINCT"));
        assert!(sql.contains("GROUP BY `observations`.`id` ORDER BY MIN(`names`.`sort_name`) ASC"));
        assert!(sql.ends_with("`observations`.`id` DESC"));
    }

    #[test]
    fn test_results_materialize_once() {
        let query = Query::new(Model::Name, Variant::All, &JsonValue::Null).unwrap();
        let store = Recording {
            ids: vec![3, 1, 2],
            ..Recording::default()
        };
        assert_eq!(query.result_ids(&store).unwrap(), &[3, 1, 2]);
        assert_eq!(query.num_results(&store).unwrap(), 3);
        assert_eq!(query.select_count(&store).unwrap(), 3);
        assert_eq!(store.seen.borrow().len(), 1);
    }

    #[test]
    fn test_key_and_title_do_not_touch_storage() {
        let query = Query::new(Model::Name, Variant::PatternSearch, &json!({ "pattern": "amanita" })).unwrap();
        assert!(query.canonical_key().unwrap().contains("\"pattern\":\"amanita\""));
        let title = query.title();
        assert_eq!(title.tag, "query_title_pattern_search");
        assert_eq!(title.args["type"], "name");
        assert_eq!(title.args["pattern"], "amanita");
    }

    #[test]
    fn test_title_override() {
        let query = Query::new(
            Model::Name,
            Variant::All,
            &json!({ "title": ["query_title_of_name", "name", "Amanita"] }),
        )
        .unwrap();
        let title = query.title();
        assert_eq!(title.tag, "query_title_of_name");
        assert_eq!(title.args["name"], "Amanita");
    }

    #[test]
    fn test_invalid_params_are_collected() {
        let err = Query::new(Model::Observation, Variant::ByUser, &json!({ "colour": "red" })).unwrap_err();
        let QueryError::Schema(errors) = err else {
            panic!("expected schema errors");
        };
        assert_eq!(errors.0.len(), 2);
    }

    #[test]
    fn test_paginate_by_letter() {
        let query = Query::new(Model::Name, Variant::All, &JsonValue::Null).unwrap();
        let store = Recording {
            ids: vec![1, 2, 3, 4, 6],
            ..Recording::default()
        };
        let mut paginator = Paginator::new(1, 2).with_letter('a');
        assert_eq!(query.paginate_ids(&store, &mut paginator).unwrap(), vec![2, 4]);
        assert_eq!(paginator.num_total, 3);
        assert_eq!(paginator.used_letters, vec!['A', 'B']);
        assert_eq!(paginator.num_pages(), 2);

        let mut plain = Paginator::new(2, 2);
        assert_eq!(query.paginate_ids(&store, &mut plain).unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_last_id_reverses_order() {
        let query = Query::new(Model::Project, Variant::All, &JsonValue::Null).unwrap();
        let store = Recording {
            ids: vec![7],
            ..Recording::default()
        };
        assert_eq!(query.last_id(&store).unwrap(), Some(7));
        let seen = store.seen.borrow();
        assert!(seen[0].ends_with(r#"ORDER BY "projects"."title" DESC, "projects"."id" ASC LIMIT 1"#));
    }

    #[test]
    fn test_tweak_reaches_outer_query() {
        let query = Query::new(
            Model::Image,
            Variant::InsideObservation,
            &json!({ "observation": 5, "outer": { "variant": "by_user", "user": 2 } }),
        )
        .unwrap();
        let store = Recording::default();
        let outer = query.outer_query(&store).unwrap().unwrap();
        assert_eq!(outer.model(), Model::Observation);
        let sql = outer.to_sql_string(&store).unwrap();
        assert!(sql.contains(r#"("observations"."thumb_image_id" IS NOT NULL)"#));
    }

    #[test]
    fn test_delegate_links_inner_ids() {
        let query = Query::new(
            Model::Image,
            Variant::AdvancedSearch,
            &json!({ "content": "spores" }),
        )
        .unwrap();
        let store = Recording {
            ids: vec![8],
            ..Recording::default()
        };
        query.result_ids(&store).unwrap();
        let seen = store.seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(seen[2].contains(r#""observation_images"."observation_id" IN (?)"#));
    }
}
