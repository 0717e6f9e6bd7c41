//! Accumulating SQL fragments from validated parameters.
//!
//! Every `add_*` generator is a no-op when its parameter is absent. Only
//! internally inconsistent input (an unknown rank, say) is an error.

use crate::{
    config::QueryConfig,
    error::{QueryError, Result},
    lookup::{LookupKind, NameRelation, Resolver},
    model::Model,
    ordering::OrderTerm,
    params::{ParamValue, Params},
    pattern::{self, clean_pattern, like},
    query::Query,
    variant::Variant,
};
use hashbrown::HashSet;
use mycoquery_core::{DatePart, Id, JoinGraph, Sql, Token, Value};
use regex::Regex;
use std::sync::LazyLock;

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d\d-\d\d$").unwrap());
static LEADING_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d\d\d\d").unwrap());
static TOKEN_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").unwrap());

/// Taxonomic ranks, lowest first. Stored rank values are 1-based positions.
pub const RANKS: &[&str] = &[
    "Form",
    "Variety",
    "Subspecies",
    "Species",
    "Stirps",
    "Subsection",
    "Section",
    "Subgenus",
    "Genus",
    "Family",
    "Order",
    "Class",
    "Phylum",
    "Kingdom",
    "Domain",
    "Group",
];
pub const GENUS_RANK: i64 = 9;
pub const GROUP_RANK: i64 = 16;

/// Stored value of a rank name; `Division` is accepted for `Phylum`.
pub fn rank_value(name: &str) -> Option<i64> {
    let name = if name.eq_ignore_ascii_case("division") { "Phylum" } else { name };
    RANKS
        .iter()
        .position(|r| r.eq_ignore_ascii_case(name))
        .map(|i| i as i64 + 1)
}

/// Image size names with their minimum edge in pixels.
pub const IMAGE_SIZES: &[(&str, i64)] = &[
    ("thumbnail", 160),
    ("small", 320),
    ("medium", 640),
    ("large", 960),
    ("huge", 1280),
    ("full_size", 10_000_000_000),
];

/// Accepted file extensions and the content type stored for each.
/// `raw` stands for every type not listed here.
pub const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("tiff", "image/tiff"),
    ("bmp", "image/x-ms-bmp"),
    ("raw", ""),
];

/// Objects an RSS log can be attached to.
pub const RSS_TYPES: &[&str] = &[
    "article",
    "glossary_term",
    "location",
    "name",
    "observation",
    "project",
    "species_list",
];

/// Description source types; the stored value is the 1-based position.
pub const SOURCE_TYPES: &[&str] = &["public", "foreign", "project", "source", "user"];

/// Replaces plain SQL execution for variants that cannot be expressed as one
/// statement.
#[derive(Debug, Clone)]
pub enum Executor {
    /// Runs `inner`, then keeps root rows linked to its ids through `link`.
    Delegate { inner: Box<Query>, link: LinkTable },
    /// Runs the base statement once per augmentation and unions the ids in
    /// first-seen order.
    Union(Vec<Augmentation>),
}

/// A glue table mapping root rows to another query's ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTable {
    pub table: &'static str,
    /// Column holding the other query's ids.
    pub column: &'static str,
}

/// Extra joins and one condition layered onto a base statement.
#[derive(Debug, Clone, Default)]
pub struct Augmentation {
    pub joins: JoinGraph,
    pub condition: Sql,
}

/// A condition an inner query asks its outer query to add before running.
#[derive(Debug, Clone, PartialEq)]
pub struct OuterTweak {
    pub condition: Sql,
}

/// Everything a variant's initialization produced.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub model: Model,
    pub joins: JoinGraph,
    pub wheres: Vec<Sql>,
    /// `GROUP BY` expression; without one the id column is selected `DISTINCT`.
    pub group: Option<Sql>,
    pub order: Vec<OrderTerm>,
    pub executor: Option<Executor>,
    pub tweak: Option<OuterTweak>,
}

pub struct ConditionBuilder<'a> {
    model: Model,
    variant: Variant,
    params: &'a Params,
    resolver: &'a dyn Resolver,
    config: QueryConfig,
    joins: JoinGraph,
    wheres: Vec<Sql>,
    group: Option<Sql>,
    order: Option<Vec<OrderTerm>>,
    default_by: Option<&'static str>,
    executor: Option<Executor>,
    tweak: Option<OuterTweak>,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(
        model: Model,
        variant: Variant,
        params: &'a Params,
        resolver: &'a dyn Resolver,
        config: QueryConfig,
    ) -> Self {
        Self {
            model,
            variant,
            params,
            resolver,
            config,
            joins: JoinGraph::new(),
            wheres: Vec::new(),
            group: None,
            order: None,
            default_by: None,
            executor: None,
            tweak: None,
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
    pub fn params(&self) -> &'a Params {
        self.params
    }

    #[inline]
    pub fn resolver(&self) -> &'a dyn Resolver {
        self.resolver
    }

    #[inline]
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// The root table.
    #[inline]
    pub fn table(&self) -> &'static str {
        self.model.table()
    }

    pub fn wheres(&self) -> &[Sql] {
        &self.wheres
    }

    pub fn joins(&self) -> &JoinGraph {
        &self.joins
    }

    /// Adds a condition; empty fragments are dropped.
    pub fn where_(&mut self, cond: Sql) {
        if !cond.is_empty() {
            self.wheres.push(cond);
        }
    }

    /// Joins a linear path hanging off the root, e.g. `["observations", "locations!"]`.
    pub fn join(&mut self, path: &[&str]) {
        self.joins.add_path(path.iter().copied());
    }

    /// Joins `prefix` followed by `tail`.
    pub fn join_via(&mut self, prefix: &[&str], tail: &[&str]) {
        self.joins.add_path(prefix.iter().chain(tail).copied());
    }

    pub fn set_group(&mut self, group: Sql) {
        self.group = Some(group);
    }

    pub fn set_order(&mut self, terms: Vec<OrderTerm>) {
        self.order = Some(terms);
    }

    pub fn has_order(&self) -> bool {
        self.order.is_some()
    }

    /// Sort key used when the caller gives no `by`.
    pub fn set_default_by(&mut self, by: &'static str) {
        self.default_by = Some(by);
    }

    pub fn default_by(&self) -> Option<&'static str> {
        self.default_by
    }

    pub fn set_executor(&mut self, executor: Executor) {
        self.executor = Some(executor);
    }

    pub fn set_tweak(&mut self, tweak: OuterTweak) {
        self.tweak = Some(tweak);
    }

    pub fn finish(self) -> Assembly {
        Assembly {
            model: self.model,
            joins: self.joins,
            wheres: self.wheres,
            group: self.group,
            order: self.order.unwrap_or_default(),
            executor: self.executor,
            tweak: self.tweak,
        }
    }

    // ==================== lookups ====================

    /// Ids named by an object-reference array: numbers pass through, names
    /// are resolved. `None` when the parameter is absent.
    pub fn lookup_objects(&self, key: &str, kind: LookupKind) -> Result<Option<Vec<Id>>> {
        let values = self.params.array(key);
        if values.is_empty() {
            return Ok(None);
        }
        let mut ids = Vec::with_capacity(values.len());
        for value in values {
            match value {
                ParamValue::Integer(id) => ids.push(*id),
                ParamValue::Text(name) => ids.extend(self.resolver.resolve_name(kind, name)?),
                _ => {}
            }
        }
        Ok(Some(dedup(ids)))
    }

    /// Id of a single object reference; `Ok(None)` when absent.
    pub fn lookup_object(&self, key: &str, kind: LookupKind) -> Result<Option<Vec<Id>>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(ParamValue::Integer(id)) => Ok(Some(vec![*id])),
            Some(ParamValue::Text(name)) => Ok(Some(self.resolver.resolve_name(kind, name)?)),
            Some(_) => Ok(Some(Vec::new())),
        }
    }

    /// Object-reference ids that must name exactly one record.
    pub fn require_object(&self, key: &str, kind: LookupKind) -> Result<Option<Id>> {
        let Some(ids) = self.lookup_object(key, kind)? else {
            return Ok(None);
        };
        let name = || self.params.get(key).map(ParamValue::display).unwrap_or_default();
        match ids.as_slice() {
            [id] => Ok(Some(*id)),
            [] => Err(crate::error::LookupError::NotFound {
                kind: kind.label(),
                name: name(),
            }
            .into()),
            many => Err(crate::error::LookupError::Ambiguous {
                kind: kind.label(),
                name: name(),
                count: many.len(),
            }
            .into()),
        }
    }

    // ==================== generators ====================

    /// `col IN (...)`; an empty id set never matches.
    pub fn add_ids(&mut self, col: Sql, ids: &[Id], joins: &[&str]) {
        if ids.is_empty() {
            self.where_(Sql::never());
        } else {
            self.where_(col.in_list(ids.iter().copied()));
        }
        self.join(joins);
    }

    /// Object references resolved to `col IN (...)`. A reference that
    /// resolves to nothing never matches.
    pub fn add_objects(&mut self, key: &str, kind: LookupKind, col: Sql, joins: &[&str]) -> Result<()> {
        if let Some(ids) = self.lookup_objects(key, kind)? {
            self.add_ids(col, &ids, joins);
        }
        Ok(())
    }

    /// Inclusive numeric bounds `[min, max]`; either may be blank.
    pub fn add_range(&mut self, key: &str, col: Sql, joins: &[&str]) {
        let min = self.params.slot(key, 0).map(Value::from);
        let max = self.params.slot(key, 1).map(Value::from);
        if min.is_none() && max.is_none() {
            return;
        }
        if let Some(min) = min {
            self.where_(col.clone().ge(Sql::param(min)));
        }
        if let Some(max) = max {
            self.where_(col.le(Sql::param(max)));
        }
        self.join(joins);
    }

    /// Date range over `[lower, upper]`, see [`date_condition`].
    pub fn add_date(&mut self, key: &str, col: Sql, joins: &[&str]) {
        let lower = self.params.slot(key, 0).and_then(ParamValue::as_str);
        let upper = self.params.slot(key, 1).and_then(ParamValue::as_str);
        if lower.is_none() && upper.is_none() {
            return;
        }
        for cond in date_condition(&col, lower, upper) {
            self.where_(cond);
        }
        self.join(joins);
    }

    /// Timestamp range over `[lower, upper]`.
    pub fn add_time(&mut self, key: &str, col: Sql, joins: &[&str]) {
        let lower = self.params.slot(key, 0).and_then(ParamValue::as_str);
        let upper = self.params.slot(key, 1).and_then(ParamValue::as_str);
        if lower.is_none() && upper.is_none() {
            return;
        }
        if let Some(lower) = lower {
            self.where_(col.clone().ge(Sql::param(time_bound(lower, true))));
        }
        if let Some(upper) = upper {
            self.where_(col.le(Sql::param(time_bound(upper, false))));
        }
        self.join(joins);
    }

    /// Three-state flag: true and false each pick a fixed condition.
    pub fn add_boolean(&mut self, key: &str, when_true: Sql, when_false: Sql, joins: &[&str]) {
        let Some(flag) = self.params.boolean(key) else {
            return;
        };
        self.where_(if flag { when_true } else { when_false });
        self.join(joins);
    }

    /// A flag that only has an effect when true (typically "has at least one").
    pub fn add_join_if(&mut self, key: &str, joins: &[&str]) {
        if self.params.boolean(key) == Some(true) {
            self.join(joins);
        }
    }

    /// Free-text tokens intersected with `allowed`. Nothing recognized means
    /// no filter at all.
    pub fn add_enum_set(&mut self, key: &str, col: Sql, allowed: &[&str], joins: &[&str]) {
        let tokens = enum_tokens(self.params, key, allowed);
        if tokens.is_empty() {
            return;
        }
        self.where_(col.in_list(tokens));
        self.join(joins);
    }

    /// Like [`Self::add_enum_set`] for columns storing the 1-based position.
    pub fn add_indexed_enum_set(&mut self, key: &str, col: Sql, allowed: &[&str], joins: &[&str]) {
        let positions: Vec<i64> = enum_tokens(self.params, key, allowed)
            .into_iter()
            .filter_map(|t| allowed.iter().position(|a| *a == t))
            .map(|i| i as i64 + 1)
            .collect();
        if positions.is_empty() {
            return;
        }
        self.where_(col.in_list(positions));
        self.join(joins);
    }

    /// Case-insensitive equality against one or more strings.
    pub fn add_exact_match(&mut self, key: &str, col: Sql, joins: &[&str]) {
        let values: Vec<String> = self
            .params
            .strings(key)
            .into_iter()
            .map(str::to_lowercase)
            .collect();
        let lowered = Sql::func("LOWER", col);
        match values.len() {
            0 => return,
            1 => self.where_(lowered.equals(Sql::param(values[0].clone()))),
            _ => self.where_(lowered.in_list(values)),
        }
        self.join(joins);
    }

    /// Google-style search over `cols`.
    pub fn add_search(&mut self, key: &str, cols: &[Sql], joins: &[&str]) {
        if let Some(text) = self.params.text(key) {
            self.add_search_text(text, cols, joins);
        }
    }

    /// Like [`Self::add_search`] for text that is not a parameter as given.
    pub fn add_search_text(&mut self, text: &str, cols: &[Sql], joins: &[&str]) {
        let terms = pattern::parse(text);
        if terms.is_empty() {
            return;
        }
        self.where_(pattern::compile_with(&terms, cols, self.config.like_escape));
        self.join(joins);
    }

    /// `col REGEXP ?`
    pub fn add_regexp(&mut self, key: &str, col: Sql, joins: &[&str]) {
        let Some(regexp) = self.params.text(key) else {
            return;
        };
        self.where_(col.push(Token::REGEXP).append(Sql::param(regexp)));
        self.join(joins);
    }

    /// Any of the named fields present in serialized notes, where each
    /// field is stored as a `:key:` line.
    pub fn add_notes_fields(&mut self, key: &str, col: Sql, joins: &[&str]) {
        let escape = self.config.like_escape;
        let conds: Vec<Sql> = self
            .params
            .strings(key)
            .into_iter()
            .map(|field| like(col.clone(), notes_field_pattern(field), escape))
            .collect();
        if conds.is_empty() {
            return;
        }
        self.where_(Sql::or_any(conds));
        self.join(joins);
    }

    /// Rank range `[min, max]` over [`RANKS`]; a lone min is an exact rank.
    pub fn add_rank(&mut self, key: &str, joins: &[&str]) -> Result<()> {
        let names = self.params.strings(key);
        let (Some(min), max) = (names.first(), names.get(1)) else {
            return Ok(());
        };
        let max = max.unwrap_or(min);
        let a = rank_value(min).ok_or_else(|| QueryError::UnknownRank((*min).to_owned()))?;
        let b = rank_value(max).ok_or_else(|| QueryError::UnknownRank((*max).to_owned()))?;
        let (a, b) = if a > b { (b, a) } else { (a, b) };
        self.where_(Sql::column("names", "rank").in_list(a..=b));
        self.join(joins);
        Ok(())
    }

    /// Image size range `[min, max]` over [`IMAGE_SIZES`].
    pub fn add_image_size(&mut self, key: &str) {
        let sizes = self.params.array(key);
        let position = |v: Option<&ParamValue>| {
            v.and_then(ParamValue::as_str)
                .and_then(|s| IMAGE_SIZES.iter().position(|(name, _)| *name == s))
        };
        let (min, max) = (position(sizes.first()), position(sizes.get(1)));
        let (width, height) = (Sql::column("images", "width"), Sql::column("images", "height"));
        if let Some(i) = min {
            let px = IMAGE_SIZES[i].1;
            self.where_(Sql::or_any([
                width.clone().ge(Sql::param(px)),
                height.clone().ge(Sql::param(px)),
            ]));
        }
        if let Some(i) = max
            && let Some((_, px)) = IMAGE_SIZES.get(i + 1)
        {
            self.where_(Sql::and_all([
                width.lt(Sql::param(*px)),
                height.lt(Sql::param(*px)),
            ]));
        }
    }

    /// Image content types by extension; `raw` matches every unlisted type.
    pub fn add_image_types(&mut self, key: &str) {
        let allowed: Vec<&str> = IMAGE_TYPES.iter().map(|(ext, _)| *ext).collect();
        let tokens = enum_tokens(self.params, key, &allowed);
        if tokens.is_empty() {
            return;
        }
        let known: Vec<&str> = IMAGE_TYPES
            .iter()
            .map(|(_, mime)| *mime)
            .filter(|m| !m.is_empty())
            .collect();
        let other = tokens.iter().any(|t| t == "raw");
        let mimes: Vec<&str> = tokens
            .iter()
            .filter_map(|t| IMAGE_TYPES.iter().find(|(ext, _)| ext == t))
            .map(|(_, mime)| *mime)
            .filter(|m| !m.is_empty())
            .collect();
        let col = Sql::column("images", "content_type");
        let listed = col.clone().in_list(mimes.iter().copied());
        let unlisted = Sql::or_any([
            col.clone().not_in_list(known),
            col.is_null(),
        ]);
        self.where_(match (mimes.is_empty(), other) {
            (true, _) => unlisted,
            (false, true) => Sql::or_any([listed, unlisted]),
            (false, false) => listed,
        });
    }

    /// RSS log type tokens. `all` is no filter; nothing recognized never
    /// matches.
    pub fn add_rss_types(&mut self, key: &str) {
        let Some(text) = self.params.text(key) else {
            return;
        };
        let tokens: Vec<&str> = TOKEN_SEPARATOR.split(text).filter(|t| !t.is_empty()).collect();
        if tokens.contains(&"all") {
            return;
        }
        let types: Vec<&str> = RSS_TYPES.iter().copied().filter(|t| tokens.contains(t)).collect();
        if types.is_empty() {
            self.where_(Sql::never());
            return;
        }
        self.where_(Sql::or_any(types.into_iter().map(|t| {
            Sql::column("rss_logs", format!("{t}_id")).is_not_null()
        })));
    }

    /// Location references against `table.location_id`, with free-text
    /// values also matched against `table.where`.
    pub fn add_locations(&mut self, key: &str, table: &'static str, joins: &[&str]) -> Result<()> {
        let Some(ids) = self.lookup_objects(key, LookupKind::Locations)? else {
            return Ok(());
        };
        let mut alternatives = Vec::new();
        if !ids.is_empty() {
            alternatives.push(Sql::column(table, "location_id").in_list(ids));
        }
        for name in self.params.strings(key) {
            alternatives.push(like(
                Sql::column(table, "where"),
                format!("%{}%", clean_pattern(name)),
                self.config.like_escape,
            ));
        }
        self.where_(if alternatives.is_empty() {
            Sql::never()
        } else {
            Sql::or_any(alternatives)
        });
        self.join(joins);
        Ok(())
    }

    /// Name references, optionally widened to synonyms and subtaxa.
    pub fn add_names(&mut self, col: Sql, joins: &[&str]) -> Result<()> {
        let Some(originals) = self.lookup_objects("names", LookupKind::Names)? else {
            return Ok(());
        };
        let params = self.params;
        let mut ids = originals.clone();
        if params.boolean("include_synonyms") == Some(true) {
            ids = self.resolver.name_relatives(&ids, NameRelation::Synonyms)?;
        }
        let immediate = params.boolean("include_immediate_subtaxa") == Some(true);
        if immediate || params.boolean("include_subtaxa") == Some(true) {
            let children = self
                .resolver
                .name_relatives(&ids, NameRelation::Children { all: !immediate })?;
            ids.extend(children);
            ids = dedup(ids);
        }
        if params.boolean("exclude_original_names") == Some(true) {
            ids.retain(|id| !originals.contains(id));
        }
        self.add_ids(col, &ids, joins);
        Ok(())
    }

    /// Geographic box from `north`, `south`, `east`, `west`; all four are
    /// needed. Boxes with west > east straddle the date line.
    pub fn add_bounding_box(&mut self, for_observations: bool) {
        let params = self.params;
        let (Some(n), Some(s), Some(e), Some(w)) = (
            params.float("north"),
            params.float("south"),
            params.float("east"),
            params.float("west"),
        ) else {
            return;
        };
        let loc = |c: &'static str| Sql::column("locations", c);
        let obs = |c: &'static str| Sql::column("observations", c);
        let mut within = vec![
            loc("south").ge(Sql::param(s)),
            loc("north").le(Sql::param(n)),
            loc("west").ge(Sql::param(w)),
            loc("east").le(Sql::param(e)),
        ];
        let point = if w < e {
            within.push(loc("west").le(loc("east")));
            vec![
                obs("lat").ge(Sql::param(s)),
                obs("lat").le(Sql::param(n)),
                obs("long").ge(Sql::param(w)),
                obs("long").le(Sql::param(e)),
            ]
        } else {
            within.push(loc("west").gt(loc("east")));
            vec![
                obs("lat").ge(Sql::param(s)),
                obs("lat").le(Sql::param(n)),
                Sql::or_any([obs("long").ge(Sql::param(w)), obs("long").le(Sql::param(e))]),
            ]
        };
        if !for_observations {
            for cond in within {
                self.where_(cond);
            }
            return;
        }
        let cond = Sql::token(Token::CASE)
            .push(Token::WHEN)
            .append(loc("id").is_null())
            .push(Token::OR)
            .append(lat_long_plausible().parens())
            .push(Token::THEN)
            .append(Sql::and_all(point).parens())
            .push(Token::ELSE)
            .append(Sql::and_all(within).parens())
            .push(Token::END);
        self.where_(cond);
        self.join(&["locations!"]);
    }
}

fn dedup(ids: Vec<Id>) -> Vec<Id> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Whitespace- and comma-separated tokens from every element of `key` that
/// appear in `allowed`, in first-seen order.
fn enum_tokens(params: &Params, key: &str, allowed: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in params.strings(key) {
        for token in TOKEN_SEPARATOR.split(value).filter(|t| !t.is_empty()) {
            if allowed.contains(&token) && !out.iter().any(|t| t == token) {
                out.push(token.to_owned());
            }
        }
    }
    out
}

/// `a * 1.2 - b * 0.2` style expressions over location columns.
fn weighted(a: &'static str, wa: &'static str, op: Token, b: &'static str, wb: &'static str) -> Sql {
    Sql::column("locations", a)
        .push(Token::STAR)
        .append(Sql::raw(wa))
        .push(op)
        .append(Sql::column("locations", b))
        .push(Token::STAR)
        .append(Sql::raw(wb))
}

/// True when an observation's own coordinates are close enough to its
/// location's box to be trusted. The 1.2/0.2 margins widen a normal box; a
/// date-line box uses 0.8/0.2 with a 72 degree offset.
fn lat_long_plausible() -> Sql {
    let obs = |c: &'static str| Sql::column("observations", c);
    let lat = Sql::and_all([
        obs("lat").ge(weighted("south", "1.2", Token::MINUS, "north", "0.2")),
        obs("lat").le(weighted("north", "1.2", Token::MINUS, "south", "0.2")),
    ]);
    let normal = Sql::and_all([
        obs("long").ge(weighted("west", "1.2", Token::MINUS, "east", "0.2")),
        obs("long").le(weighted("east", "1.2", Token::MINUS, "west", "0.2")),
    ]);
    let straddling = Sql::or_any([
        obs("long").ge(weighted("west", "0.8", Token::PLUS, "east", "0.2")
            .push(Token::PLUS)
            .append(Sql::number(72))),
        obs("long").le(weighted("east", "0.8", Token::PLUS, "west", "0.2")
            .push(Token::MINUS)
            .append(Sql::number(72))),
    ]);
    let long = Sql::token(Token::CASE)
        .push(Token::WHEN)
        .append(Sql::column("locations", "west").le(Sql::column("locations", "east")))
        .push(Token::THEN)
        .append(normal.parens())
        .push(Token::ELSE)
        .append(straddling)
        .push(Token::END);
    Sql::and_all([lat, long])
}

fn parts(text: &str) -> Vec<i64> {
    text.split('-').filter_map(|p| p.parse().ok()).collect()
}

/// `%:field:%`, quoting fields that contain `"` or `\` the way the notes
/// serializer does.
fn notes_field_pattern(field: &str) -> String {
    let mut key = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if matches!(c, '"' | '\\') {
            key.push('\\');
        }
        key.push(c);
    }
    let key = if key.len() == field.len() {
        format!(":{key}:")
    } else {
        format!("\":{key}:\"")
    };
    let mut out = String::with_capacity(key.len() + 2);
    out.push('%');
    for c in key.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// `YYYY-MM-DD` for one end of a date range, filling missing fields with the
/// earliest (lower) or latest (upper) value.
pub fn date_bound(text: &str, lower: bool) -> String {
    let p = parts(text);
    let field = |i: usize, low: i64, high: i64| p.get(i).copied().unwrap_or(if lower { low } else { high });
    format!("{:04}-{:02}-{:02}", field(0, 0, 0), field(1, 1, 12), field(2, 1, 31))
}

/// `YYYY-MM-DD hh:mm:ss` for one end of a time range.
pub fn time_bound(text: &str, lower: bool) -> String {
    let p = parts(text);
    let field = |i: usize, low: i64, high: i64| p.get(i).copied().unwrap_or(if lower { low } else { high });
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        field(0, 0, 0),
        field(1, 1, 12),
        field(2, 1, 31),
        field(3, 0, 24),
        field(4, 0, 60),
        field(5, 0, 60)
    )
}

fn month(col: &Sql) -> Sql {
    Sql::date_part(DatePart::Month, col.clone())
}

fn day(col: &Sql) -> Sql {
    Sql::date_part(DatePart::Day, col.clone())
}

/// One half of a date range.
fn date_half(col: &Sql, text: &str, lower: bool) -> Sql {
    let op = if lower { Token::GE } else { Token::LE };
    let strict = if lower { Token::GT } else { Token::LT };
    if LEADING_YEAR.is_match(text) {
        return col.clone().compare(op, Sql::param(date_bound(text, lower)));
    }
    match parts(text).as_slice() {
        [m, d] => Sql::or_any([
            month(col).compare(strict, Sql::param(*m)),
            Sql::and_all([
                month(col).equals(Sql::param(*m)),
                day(col).compare(op, Sql::param(*d)),
            ]),
        ]),
        [m] => month(col).compare(op, Sql::param(*m)),
        _ => Sql::empty(),
    }
}

/// Conditions for a date range. Year-less `MM-DD` bounds with the lower one
/// sorting after the upper one wrap across the new year.
pub fn date_condition(col: &Sql, lower: Option<&str>, upper: Option<&str>) -> Vec<Sql> {
    if let (Some(lo), Some(hi)) = (lower, upper)
        && MONTH_DAY.is_match(lo)
        && MONTH_DAY.is_match(hi)
        && lo > hi
    {
        let (lo, hi) = (parts(lo), parts(hi));
        return vec![Sql::or_any([
            month(col).gt(Sql::param(lo[0])),
            month(col).lt(Sql::param(hi[0])),
            Sql::and_all([month(col).equals(Sql::param(lo[0])), day(col).ge(Sql::param(lo[1]))]),
            Sql::and_all([month(col).equals(Sql::param(hi[0])), day(col).le(Sql::param(hi[1]))]),
        ])];
    }
    let mut out = Vec::with_capacity(2);
    if let Some(lo) = lower {
        out.push(date_half(col, lo, true));
    }
    if let Some(hi) = upper {
        out.push(date_half(col, hi, false));
    }
    out.retain(|s| !s.is_empty());
    out
}
