//! Per-variant declarations and initialization.
//!
//! Observation-side variants are written once against the `observations`
//! table and reused by the `with_observations_*` wrappers, which only differ
//! in the join path leading from their root table to `observations`.

use crate::{
    condition::{Augmentation, ConditionBuilder, Executor, LinkTable, OuterTweak},
    error::{QueryError, Result},
    filters::COMMENT_TARGETS,
    lookup::{LookupKind, NameRelation},
    model::{Model, coalesced, location_or_where},
    ordering::OrderTerm,
    params::Params,
    pattern::{self, clean_pattern, like},
    query::Query,
    schema::{Declaration, ParamType, opt, req},
    variant::Variant,
};
use mycoquery_core::{Id, JoinGraph, Sql, Token};
use regex::Regex;
use std::sync::LazyLock;

static LOGIN_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" *<[^<>]*>").unwrap());

/// Modes of `of_name`'s `synonyms` and `nonconsensus`.
pub const NAME_MODES: &[&str] = &["no", "all", "exclusive"];

const ADVANCED_KEYS: &[&str] = &["name", "location", "user", "content", "search_location_notes"];

/// `ids` parameter type of an `in_set` variant over `model`.
pub const fn ids_of(model: Model) -> ParamType {
    match model {
        Model::Comment => ParamType::Array(&ParamType::Id(Model::Comment)),
        Model::Herbarium => ParamType::Array(&ParamType::Id(Model::Herbarium)),
        Model::HerbariumRecord => ParamType::Array(&ParamType::Id(Model::HerbariumRecord)),
        Model::Image => ParamType::Array(&ParamType::Id(Model::Image)),
        Model::License => ParamType::Array(&ParamType::Id(Model::License)),
        Model::Location => ParamType::Array(&ParamType::Id(Model::Location)),
        Model::LocationDescription => ParamType::Array(&ParamType::Id(Model::LocationDescription)),
        Model::Name => ParamType::Array(&ParamType::Id(Model::Name)),
        Model::NameDescription => ParamType::Array(&ParamType::Id(Model::NameDescription)),
        Model::Observation => ParamType::Array(&ParamType::Id(Model::Observation)),
        Model::Project => ParamType::Array(&ParamType::Id(Model::Project)),
        Model::RssLog => ParamType::Array(&ParamType::Id(Model::RssLog)),
        Model::Sequence => ParamType::Array(&ParamType::Id(Model::Sequence)),
        Model::SpeciesList => ParamType::Array(&ParamType::Id(Model::SpeciesList)),
        Model::User => ParamType::Array(&ParamType::Id(Model::User)),
    }
}

/// Join path from `model`'s table to `observations`.
pub const fn observation_path(model: Model) -> &'static [&'static str] {
    match model {
        Model::Image => &["observation_images", "observations"],
        Model::Location | Model::Name => &["observations"],
        _ => &[],
    }
}

/// Description table plus its author and editor glue tables.
const fn description_tables(model: Model) -> Option<(&'static str, &'static str, &'static str)> {
    match model {
        Model::Location | Model::LocationDescription => Some((
            "location_descriptions",
            "location_description_authors",
            "location_description_editors",
        )),
        Model::Name | Model::NameDescription => Some((
            "name_descriptions",
            "name_description_authors",
            "name_description_editors",
        )),
        _ => None,
    }
}

const fn description_model(model: Model) -> Model {
    match model {
        Model::Location => Model::LocationDescription,
        Model::Name => Model::NameDescription,
        other => other,
    }
}

/// Declarations a variant adds on top of its model's filters.
pub fn declarations(model: Model, variant: Variant) -> Vec<Declaration> {
    use ParamType::{Boolean, Integer, Object, String as Text};
    if let Some(inner) = variant.observation_inner() {
        let mut decls = declarations(Model::Observation, inner);
        if inner == Variant::InSet {
            decls.extend([opt("old_title", Text), opt("old_by", Text)]);
        }
        decls.extend([opt("has_specimen", Boolean), opt("has_images", Boolean)]);
        return decls;
    }
    if let Some(inner) = variant.description_inner() {
        let mut decls = declarations(description_model(model), inner);
        if inner == Variant::InSet {
            decls.extend([opt("old_title", Text), opt("old_by", Text)]);
        }
        return decls;
    }
    match variant {
        Variant::All | Variant::ByRssLog => vec![],
        Variant::ByUser | Variant::ByAuthor | Variant::ByEditor | Variant::ForUser => {
            vec![req("user", Object(Model::User))]
        }
        Variant::ForProject => vec![req("project", Object(Model::Project))],
        Variant::ForTarget => vec![
            req("target", Integer),
            req("type", ParamType::Enum(COMMENT_TARGETS)),
        ],
        Variant::InSet => vec![req("ids", ids_of(model))],
        Variant::InSpeciesList => vec![req("species_list", Object(Model::SpeciesList))],
        Variant::AtLocation => vec![req("location", Object(Model::Location))],
        Variant::AtWhere => vec![req("user_where", Text), opt("location", Text)],
        Variant::InsideObservation => vec![
            req("observation", ParamType::Id(Model::Observation)),
            req("outer", ParamType::Subquery(Model::Observation)),
        ],
        Variant::OfChildren | Variant::OfParents => {
            vec![req("name", Object(Model::Name)), opt("all", Boolean)]
        }
        Variant::OfName => vec![
            req("name", Object(Model::Name)),
            opt("synonyms", ParamType::Enum(NAME_MODES)),
            opt("nonconsensus", ParamType::Enum(NAME_MODES)),
            opt("project", Object(Model::Project)),
            opt("species_list", Object(Model::SpeciesList)),
            opt("user", Object(Model::User)),
        ],
        Variant::PatternSearch => vec![req("pattern", Text)],
        Variant::RegexpSearch => vec![req("regexp", Text)],
        Variant::AdvancedSearch => vec![
            opt("name", Text),
            opt("location", Text),
            opt("user", Text),
            opt("content", Text),
            opt("search_location_notes", Boolean),
        ],
        // wrappers are handled above
        _ => vec![],
    }
}

/// Applies the variant's own conditions.
pub fn init(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let model = b.model();
    let variant = b.variant();
    let table = model.table();
    if let Some(inner) = variant.observation_inner() {
        let path = observation_path(model);
        b.join(path);
        observation_flavor(b, inner, path)?;
        let o = |c: &'static str| Sql::column("observations", c);
        b.add_boolean(
            "has_specimen",
            o("specimen").equals(Token::TRUE),
            o("specimen").equals(Token::FALSE),
            &[],
        );
        b.add_boolean(
            "has_images",
            o("thumb_image_id").is_not_null(),
            o("thumb_image_id").is_null(),
            &[],
        );
        return Ok(());
    }
    if let Some(inner) = variant.description_inner() {
        return description_flavor(b, inner);
    }
    match variant {
        Variant::All => {}
        Variant::ByUser => by_user(b, Sql::column(table, "user_id"), &[])?,
        Variant::ByAuthor | Variant::ByEditor
            if matches!(model, Model::LocationDescription | Model::NameDescription) =>
        {
            description_flavor(b, variant)?
        }
        Variant::ByEditor => by_editor(b)?,
        Variant::ByRssLog => {
            b.join(&["rss_logs"]);
            b.set_default_by("rss_log");
        }
        Variant::ForProject => for_project(b)?,
        Variant::ForTarget => for_target(b),
        Variant::ForUser => for_user(b)?,
        Variant::InSet => in_set(b, table, &[], true),
        Variant::InSpeciesList
        | Variant::AtLocation
        | Variant::AtWhere
        | Variant::OfChildren
        | Variant::OfName
            if model == Model::Observation =>
        {
            observation_flavor(b, variant, &[])?
        }
        Variant::AtLocation => at_location(b, table, &[])?,
        Variant::AtWhere => at_where(b, table, &[]),
        Variant::InsideObservation => inside_observation(b),
        Variant::OfChildren => of_children(b, Sql::column("names", "id"), &[])?,
        Variant::OfParents => of_parents(b)?,
        Variant::PatternSearch => pattern_search(b),
        Variant::RegexpSearch => b.add_regexp("regexp", Sql::column(table, "name"), &[]),
        Variant::AdvancedSearch => advanced_search(b)?,
        _ => {
            return Err(QueryError::NoSuchVariant { model, variant });
        }
    }
    Ok(())
}

/// Observation variants reached through `path` (empty for observation roots).
fn observation_flavor(b: &mut ConditionBuilder<'_>, variant: Variant, path: &[&str]) -> Result<()> {
    let o = |c: &'static str| Sql::column("observations", c);
    match variant {
        Variant::All => {}
        Variant::AtLocation => at_location(b, "observations", path)?,
        Variant::AtWhere => at_where(b, "observations", path),
        Variant::ByUser => by_user(b, o("user_id"), path)?,
        Variant::ForProject => {
            let joins = extend(path, "project_observations");
            single_object(b, "project", LookupKind::Projects, Sql::column("project_observations", "project_id"), &joins)?;
        }
        Variant::InSet => in_set(b, "observations", path, path.is_empty()),
        Variant::InSpeciesList => {
            let joins = extend(path, "species_list_observations");
            single_object(
                b,
                "species_list",
                LookupKind::SpeciesLists,
                Sql::column("species_list_observations", "species_list_id"),
                &joins,
            )?;
        }
        Variant::OfChildren => of_children(b, o("name_id"), path)?,
        Variant::OfName => of_name(b, path)?,
        _ => {
            return Err(QueryError::NoSuchVariant {
                model: Model::Observation,
                variant,
            });
        }
    }
    Ok(())
}

/// Description variants, rooted at a description table or reached from its
/// parent through the description join.
fn description_flavor(b: &mut ConditionBuilder<'_>, variant: Variant) -> Result<()> {
    let model = b.model();
    let Some((desc, authors, editors)) = description_tables(model) else {
        return Err(QueryError::NoSuchVariant { model, variant });
    };
    let nested = desc != model.table();
    let base: Vec<&str> = if nested { vec![desc] } else { vec![] };
    if nested {
        b.join(&base);
    }
    match variant {
        Variant::All => {}
        Variant::ByUser => by_user(b, Sql::column(desc, "user_id"), &base)?,
        Variant::ByAuthor => by_user(b, Sql::column(authors, "user_id"), &extend(&base, authors))?,
        Variant::ByEditor => by_user(b, Sql::column(editors, "user_id"), &extend(&base, editors))?,
        Variant::InSet => in_set(b, desc, &base, !nested),
        _ => return Err(QueryError::NoSuchVariant { model, variant }),
    }
    Ok(())
}

fn extend<'p>(path: &[&'p str], table: &'p str) -> Vec<&'p str> {
    let mut joins = path.to_vec();
    joins.push(table);
    joins
}

/// A single object reference; nothing resolved never matches.
fn single_object(
    b: &mut ConditionBuilder<'_>,
    key: &str,
    kind: LookupKind,
    col: Sql,
    joins: &[&str],
) -> Result<()> {
    if let Some(ids) = b.lookup_object(key, kind)? {
        b.add_ids(col, &ids, joins);
    }
    Ok(())
}

fn by_user(b: &mut ConditionBuilder<'_>, col: Sql, joins: &[&str]) -> Result<()> {
    single_object(b, "user", LookupKind::Users, col, joins)
}

/// Edited by the user, excluding records the user created.
fn by_editor(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let model = b.model();
    let versions = match model {
        Model::Location => "locations_versions",
        Model::Name => "names_versions",
        other => {
            return Err(QueryError::NoSuchVariant {
                model: other,
                variant: Variant::ByEditor,
            });
        }
    };
    let Some(ids) = b.lookup_object("user", LookupKind::Users)? else {
        return Ok(());
    };
    b.add_ids(Sql::column(versions, "user_id"), &ids, &[versions]);
    if !ids.is_empty() {
        b.where_(Sql::column(model.table(), "user_id").not_in_list(ids));
    }
    Ok(())
}

fn for_project(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let glue = match b.model() {
        Model::Image => "project_images",
        Model::SpeciesList => "project_species_lists",
        _ => "project_observations",
    };
    single_object(b, "project", LookupKind::Projects, Sql::column(glue, "project_id"), &[glue])
}

fn for_target(b: &mut ConditionBuilder<'_>) {
    let params = b.params();
    if let (Some(target), Some(kind)) = (params.integer("target"), params.text("type")) {
        b.where_(Sql::column("comments", "target_id").equals(Sql::param(target)));
        b.where_(Sql::column("comments", "target_type").equals(Sql::param(kind)));
    }
}

/// Comments on any object the user owns.
fn for_user(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let Some(ids) = b.lookup_object("user", LookupKind::Users)? else {
        return Ok(());
    };
    if ids.is_empty() {
        b.where_(Sql::never());
        return Ok(());
    }
    let owned = COMMENT_TARGETS
        .iter()
        .filter_map(|name| name.parse::<Model>().ok())
        .map(|target| {
            let t = target.table();
            let subselect = Sql::token(Token::SELECT)
                .append(Sql::column(t, "id"))
                .push(Token::FROM)
                .append(Sql::ident(t))
                .push(Token::WHERE)
                .append(Sql::column(t, "user_id").in_list(ids.iter().copied()))
                .parens();
            Sql::and_all([
                Sql::column("comments", "target_type").equals(Sql::param(target.name())),
                Sql::column("comments", "target_id").push(Token::IN).append(subselect),
            ])
        });
    b.where_(Sql::or_any(owned));
    Ok(())
}

/// `CASE col WHEN ? THEN 0 WHEN ? THEN 1 ... END`
fn position_of(col: Sql, ids: &[Id]) -> Sql {
    let mut sql = Sql::token(Token::CASE).append(col);
    for (i, id) in ids.iter().enumerate() {
        sql = sql
            .push(Token::WHEN)
            .append(Sql::param(*id))
            .push(Token::THEN)
            .append(Sql::number(i as i64));
    }
    sql.push(Token::END)
}

/// Explicit ids; a root query keeps the given order unless `by` is set.
fn in_set(b: &mut ConditionBuilder<'_>, table: &'static str, joins: &[&str], keep_order: bool) {
    let ids: Vec<Id> = b.params().array("ids").iter().filter_map(|v| v.as_i64()).collect();
    let col = Sql::column(table, "id");
    b.add_ids(col.clone(), &ids, joins);
    if keep_order && !ids.is_empty() {
        b.set_order(vec![OrderTerm::asc(position_of(col, &ids))]);
    }
}

fn at_location(b: &mut ConditionBuilder<'_>, table: &'static str, joins: &[&str]) -> Result<()> {
    single_object(
        b,
        "location",
        LookupKind::Locations,
        Sql::column(table, "location_id"),
        joins,
    )
}

/// Free-text `where` containing the caller's text.
fn at_where(b: &mut ConditionBuilder<'_>, table: &'static str, joins: &[&str]) {
    let Some(text) = b.params().text("user_where") else {
        return;
    };
    let cond = like(
        Sql::column(table, "where"),
        format!("%{}%", clean_pattern(text)),
        b.config().like_escape,
    );
    b.where_(cond);
    b.join(joins);
}

/// Images of one observation, thumbnail first. Outer observation queries
/// are restricted to observations that have a thumbnail.
fn inside_observation(b: &mut ConditionBuilder<'_>) {
    let Some(observation) = b.params().integer("observation") else {
        return;
    };
    let path = observation_path(Model::Image);
    b.add_ids(Sql::column("observation_images", "observation_id"), &[observation], path);
    let thumb_first = Sql::token(Token::CASE)
        .push(Token::WHEN)
        .append(Sql::column("images", "id").equals(Sql::column("observations", "thumb_image_id")))
        .push(Token::THEN)
        .append(Sql::number(0))
        .push(Token::ELSE)
        .append(Sql::number(1))
        .push(Token::END);
    b.set_order(vec![
        OrderTerm::asc(thumb_first),
        OrderTerm::asc(Sql::column("images", "id")),
    ]);
    b.set_tweak(OuterTweak {
        condition: Sql::column("observations", "thumb_image_id").is_not_null(),
    });
}

fn of_children(b: &mut ConditionBuilder<'_>, col: Sql, joins: &[&str]) -> Result<()> {
    let Some(ids) = b.lookup_object("name", LookupKind::Names)? else {
        return Ok(());
    };
    let all = b.params().boolean("all") == Some(true);
    let children = b.resolver().name_relatives(&ids, NameRelation::Children { all })?;
    b.add_ids(col, &children, joins);
    Ok(())
}

/// Parents of exactly one name.
fn of_parents(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let Some(id) = b.require_object("name", LookupKind::Names)? else {
        return Ok(());
    };
    let all = b.params().boolean("all") == Some(true);
    let parents = b.resolver().name_relatives(&[id], NameRelation::Parents { all })?;
    b.add_ids(Sql::column("names", "id"), &parents, &[]);
    Ok(())
}

/// Observations of a name, optionally widened to synonyms and to names
/// proposed without being the consensus.
fn of_name(b: &mut ConditionBuilder<'_>, path: &[&str]) -> Result<()> {
    let Some(names) = b.lookup_object("name", LookupKind::Names)? else {
        return Ok(());
    };
    let resolver = b.resolver();
    let params = b.params();
    let mut ids = names.clone();
    ids.extend(resolver.name_relatives(&names, NameRelation::Misspellings)?);
    match params.text("synonyms").unwrap_or("no") {
        "all" => ids = resolver.name_relatives(&ids, NameRelation::Synonyms)?,
        "exclusive" => {
            let synonyms = resolver.name_relatives(&ids, NameRelation::Synonyms)?;
            ids = synonyms.into_iter().filter(|id| !ids.contains(id)).collect();
        }
        _ => {}
    }
    let o = |c: &'static str| Sql::column("observations", c);
    let vote = |t: &'static str| coalesced_number(t, "vote_cache");
    let nonconsensus = params.text("nonconsensus").unwrap_or("no");
    let order = if nonconsensus == "no" {
        b.add_ids(o("name_id"), &ids, path);
        b.where_(vote("observations").ge(Sql::number(0)));
        vec![OrderTerm::desc(vote("observations")), OrderTerm::desc(o("when"))]
    } else {
        let joins = extend(path, "namings");
        b.add_ids(Sql::column("namings", "name_id"), &ids, &joins);
        if nonconsensus == "exclusive" && !ids.is_empty() {
            b.where_(Sql::or_any([
                o("name_id").not_in_list(ids.iter().copied()),
                vote("observations").lt(Sql::number(0)),
            ]));
        }
        vec![OrderTerm::desc(vote("namings")), OrderTerm::desc(o("when"))]
    };
    if path.is_empty() {
        b.set_order(order);
    }
    single_object(
        b,
        "project",
        LookupKind::Projects,
        Sql::column("project_observations", "project_id"),
        &extend(path, "project_observations"),
    )?;
    single_object(
        b,
        "species_list",
        LookupKind::SpeciesLists,
        Sql::column("species_list_observations", "species_list_id"),
        &extend(path, "species_list_observations"),
    )?;
    by_user(b, o("user_id"), path)
}

/// `COALESCE("table"."column", 0)`
fn coalesced_number(table: &'static str, column: &'static str) -> Sql {
    Sql::func(
        "COALESCE",
        Sql::column(table, column).push(Token::COMMA).append(Sql::number(0)),
    )
}

fn pattern_search(b: &mut ConditionBuilder<'_>) {
    let model = b.model();
    let Some(text) = b.params().text("pattern") else {
        return;
    };
    if pattern::parse(text).is_empty() {
        return;
    }
    for path in model.search_joins() {
        b.join(path);
    }
    b.add_search_text(text, &model.search_columns(), &[]);
}

/// Observation-centric search by name, location, observer and content.
fn advanced_search(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let model = b.model();
    let params = b.params();
    let text = |key| params.text(key).filter(|t| !pattern::parse(t).is_empty());
    let (name, location, content) = (text("name"), text("location"), text("content"));
    let user = text("user").map(|u| LOGIN_SUFFIX.replace_all(u, "").into_owned());
    if name.is_none() && location.is_none() && user.is_none() && content.is_none() {
        return Err(QueryError::InvalidSearch(
            "give at least one of name, location, user or content".into(),
        ));
    }

    if model == Model::Image && content.is_some() {
        let inner: Params = params
            .iter()
            .filter(|(key, _)| ADVANCED_KEYS.contains(key))
            .map(|(key, value)| (key.into(), value.clone()))
            .collect();
        let inner = Query::from_params(Model::Observation, Variant::AdvancedSearch, inner, *b.config())?;
        b.set_executor(Executor::Delegate {
            inner: Box::new(inner),
            link: LinkTable {
                table: "observation_images",
                column: "observation_id",
            },
        });
        return Ok(());
    }

    let path = observation_path(model);
    if let Some(name) = name {
        let joins = if model == Model::Name { vec![] } else { extend(path, "names") };
        b.add_search_text(name, &[Sql::column("names", "search_name")], &joins);
    }
    if let Some(user) = user.as_deref() {
        b.add_search_text(
            user,
            &[Sql::column("users", "login"), coalesced("users", "name")],
            &extend(path, "users"),
        );
    }
    if let Some(location) = location {
        if model == Model::Location {
            b.add_search_text(location, &[Sql::column("locations", "name")], &[]);
        } else {
            let mut cols = vec![location_or_where("observations")];
            if params.boolean("search_location_notes") == Some(true) {
                cols.push(coalesced("locations", "notes"));
            }
            b.add_search_text(location, &cols, &extend(path, "locations!"));
        }
    }
    if let Some(content) = content {
        let terms = pattern::parse(content);
        let escape = b.config().like_escape;
        let mut plain = JoinGraph::new();
        plain.add_path(path.iter().copied());
        let mut commented = JoinGraph::new();
        commented.add_path(path.iter().copied().chain(["comments"]));
        let notes = coalesced("observations", "notes");
        b.set_executor(Executor::Union(vec![
            Augmentation {
                joins: plain,
                condition: pattern::compile_with(&terms, std::slice::from_ref(&notes), escape),
            },
            Augmentation {
                joins: commented,
                condition: pattern::compile_with(
                    &terms,
                    &[
                        notes.clone(),
                        Sql::column("comments", "summary"),
                        coalesced("comments", "comment"),
                    ],
                    escape,
                ),
            },
        ]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{condition::Assembly, config::QueryConfig};
    use mycoquery_core::{Dialect, Storage, Value};

    /// Answers every lookup with the same ids.
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

    fn assemble(model: Model, variant: Variant, params: Params, store: &Fixed) -> Result<Assembly> {
        let mut b = ConditionBuilder::new(model, variant, &params, store, QueryConfig::default());
        init(&mut b)?;
        Ok(b.finish())
    }

    fn wheres(assembly: &Assembly) -> Vec<String> {
        assembly.wheres.iter().map(|w| w.sql(Dialect::SQLite)).collect()
    }

    #[test]
    fn test_in_set_keeps_given_order() {
        let mut params = Params::new();
        params.insert("ids", vec![30i64, 10, 20]);
        let assembly = assemble(Model::Name, Variant::InSet, params, &Fixed(vec![])).unwrap();
        assert_eq!(wheres(&assembly), vec![r#""names"."id" IN (?, ?, ?)"#]);
        assert_eq!(
            assembly.order[0].to_sql().sql(Dialect::SQLite),
            r#"CASE "names"."id" WHEN ? THEN 0 WHEN ? THEN 1 WHEN ? THEN 2 END ASC"#
        );
    }

    #[test]
    fn test_with_observations_reuses_observation_flavor() {
        let mut params = Params::new();
        params.insert("user", 4i64);
        let assembly = assemble(
            Model::Image,
            Variant::WithObservationsByUser,
            params,
            &Fixed(vec![]),
        )
        .unwrap();
        assert_eq!(wheres(&assembly), vec![r#""observations"."user_id" IN (?)"#]);
        let steps: Vec<String> = assembly.joins.flatten().into_iter().map(|s| s.table.to_string()).collect();
        assert_eq!(steps, vec!["observation_images", "observations"]);
    }

    #[test]
    fn test_unknown_user_never_matches() {
        let mut params = Params::new();
        params.insert("user", "nobody");
        let assembly = assemble(Model::Observation, Variant::ByUser, params, &Fixed(vec![])).unwrap();
        assert_eq!(wheres(&assembly), vec!["FALSE"]);
    }

    #[test]
    fn test_inside_observation_sets_tweak() {
        let mut params = Params::new();
        params.insert("observation", 12i64);
        let assembly = assemble(Model::Image, Variant::InsideObservation, params, &Fixed(vec![])).unwrap();
        let tweak = assembly.tweak.unwrap();
        assert_eq!(
            tweak.condition.sql(Dialect::SQLite),
            r#""observations"."thumb_image_id" IS NOT NULL"#
        );
        assert_eq!(assembly.order.len(), 2);
    }

    #[test]
    fn test_advanced_search_needs_something() {
        let err = assemble(Model::Observation, Variant::AdvancedSearch, Params::new(), &Fixed(vec![])).unwrap_err();
        assert!(matches!(err, QueryError::InvalidSearch(_)));
    }

    #[test]
    fn test_advanced_content_unions_comments() {
        let mut params = Params::new();
        params.insert("content", "chanterelle");
        params.insert("user", "Rolf Singer <rolf>");
        let assembly = assemble(Model::Name, Variant::AdvancedSearch, params, &Fixed(vec![])).unwrap();
        let Some(Executor::Union(augmentations)) = &assembly.executor else {
            panic!("expected a union executor");
        };
        assert_eq!(augmentations.len(), 2);
        assert!(augmentations[1].joins.contains("comments"));
        let (_, values) = assembly.wheres[0].build(Dialect::SQLite);
        assert_eq!(values[0], Value::from("%Rolf%"));
        assert!(assembly.joins.contains("users"));
    }

    #[test]
    fn test_image_content_delegates_to_observations() {
        let mut params = Params::new();
        params.insert("content", "chanterelle");
        let assembly = assemble(Model::Image, Variant::AdvancedSearch, params, &Fixed(vec![])).unwrap();
        let Some(Executor::Delegate { inner, link }) = &assembly.executor else {
            panic!("expected a delegate executor");
        };
        assert_eq!(inner.model(), Model::Observation);
        assert_eq!(link.table, "observation_images");
    }

    #[test]
    fn test_of_name_nonconsensus_joins_namings() {
        let mut params = Params::new();
        params.insert("name", 5i64);
        params.insert("nonconsensus", "exclusive");
        let assembly = assemble(Model::Observation, Variant::OfName, params, &Fixed(vec![])).unwrap();
        assert!(assembly.joins.contains("namings"));
        let sql = wheres(&assembly);
        assert_eq!(sql[0], r#""namings"."name_id" IN (?)"#);
        assert!(sql[1].contains("NOT IN"));
    }

    #[test]
    fn test_every_variant_declares_without_conflict() {
        for model in Model::ALL {
            for &variant in crate::variant::allowed_variants(model) {
                let mut set = crate::schema::DeclarationSet::new();
                set.extend(&declarations(model, variant)).unwrap();
            }
        }
    }
}
