//! Sort keys selectable through the `by` parameter.

use crate::{condition::ConditionBuilder, error::Result, model::Model};
use mycoquery_core::{Sql, Token};

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub expr: Sql,
    pub descending: bool,
}

impl OrderTerm {
    pub fn asc(expr: Sql) -> Self {
        Self {
            expr,
            descending: false,
        }
    }

    pub fn desc(expr: Sql) -> Self {
        Self {
            expr,
            descending: true,
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            descending: !self.descending,
            ..self
        }
    }

    pub fn to_sql(&self) -> Sql {
        self.expr
            .clone()
            .push(if self.descending { Token::DESC } else { Token::ASC })
    }
}

/// `ORDER BY a ASC, b DESC`, or nothing for no terms.
pub fn order_clause(terms: &[OrderTerm]) -> Sql {
    if terms.is_empty() {
        return Sql::empty();
    }
    Sql::token(Token::ORDER_BY).append(Sql::join(terms.iter().map(OrderTerm::to_sql), Token::COMMA))
}

/// Installs the ordering for `builder`.
///
/// An explicit `by` wins over an order the variant set itself; otherwise the
/// variant's default key or the model default applies. Keys a model cannot
/// sort by fall back to the model default. A descending id tiebreak keeps
/// the materialized order deterministic.
pub fn apply(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let by = b.params().text("by");
    if by.is_none() && b.has_order() {
        return Ok(());
    }
    let model = b.model();
    let by = by.or(b.default_by()).unwrap_or(model.default_order());
    let (key, reverse) = match by.strip_prefix("reverse_") {
        Some(key) => (key, true),
        None => (by, false),
    };
    let mut terms = match sort_terms(b, key) {
        Some(terms) => terms,
        None => sort_terms(b, model.default_order()).unwrap_or_default(),
    };
    let id = Sql::column(model.table(), "id");
    if !terms.iter().any(|t| t.expr == id) {
        terms.push(OrderTerm::desc(id));
    }
    if reverse {
        terms = terms.into_iter().map(OrderTerm::reversed).collect();
    }
    b.set_order(terms);
    Ok(())
}

fn col(model: Model, name: &'static str) -> Sql {
    Sql::column(model.table(), name)
}

/// Terms for one sort key, adding whatever joins, grouping and conditions it
/// needs. `None` when `model` has no such ordering.
fn sort_terms(b: &mut ConditionBuilder<'_>, key: &str) -> Option<Vec<OrderTerm>> {
    let model = b.model();
    let has = |c: &str| model.has_column(c);
    let terms = match key {
        "updated_at" | "created_at" | "last_login" | "num_views" => {
            let c = model.columns().iter().copied().find(|c| *c == key)?;
            vec![OrderTerm::desc(col(model, c))]
        }
        "contribution" if model == Model::User => vec![OrderTerm::desc(col(model, "contribution"))],
        "date" if has("when") => vec![OrderTerm::desc(col(model, "when"))],
        "date" if has("created_at") => vec![OrderTerm::desc(col(model, "created_at"))],
        "name" => by_name(b)?,
        "title" | "login" | "summary" | "copyright_holder" | "where" | "original_name"
        | "accession_number" | "initial_det" => {
            let c = model.columns().iter().copied().find(|c| *c == key)?;
            vec![OrderTerm::asc(col(model, c))]
        }
        "user" if has("user_id") => {
            b.join(&["users"]);
            let name = || Sql::column("users", "name");
            let display = Sql::token(Token::CASE)
                .push(Token::WHEN)
                .append(name().equals(Sql::raw("''")))
                .push(Token::OR)
                .append(name().is_null())
                .push(Token::THEN)
                .append(Sql::column("users", "login"))
                .push(Token::ELSE)
                .append(name())
                .push(Token::END);
            vec![OrderTerm::asc(display)]
        }
        "location" if has("location_id") => {
            // users without a location still sort, last
            b.join(if model == Model::User { &["locations!"] } else { &["locations"] });
            vec![OrderTerm::asc(Sql::column("locations", "name"))]
        }
        "rss_log" if model.has_rss_log() => {
            b.join(&["rss_logs"]);
            vec![OrderTerm::desc(Sql::column("rss_logs", "updated_at"))]
        }
        "confidence" if model == Model::Image => {
            b.join(&["observation_images", "observations"]);
            vec![OrderTerm::desc(Sql::column("observations", "vote_cache"))]
        }
        "confidence" if model == Model::Observation => {
            vec![OrderTerm::desc(col(model, "vote_cache"))]
        }
        "image_quality" if model == Model::Image => vec![OrderTerm::desc(col(model, "vote_cache"))],
        "thumbnail_quality" if model == Model::Observation => {
            b.join(&["images.thumb_image"]);
            vec![
                OrderTerm::desc(Sql::column("images", "vote_cache")),
                OrderTerm::desc(col(model, "vote_cache")),
            ]
        }
        "owners_quality" if model == Model::Image => {
            b.join(&["image_votes"]);
            b.where_(Sql::column("image_votes", "user_id").equals(Sql::column("images", "user_id")));
            vec![OrderTerm::desc(Sql::column("image_votes", "value"))]
        }
        "owners_thumbnail_quality" if model == Model::Observation => {
            b.join(&["images.thumb_image", "image_votes"]);
            b.where_(Sql::column("images", "user_id").equals(col(model, "user_id")));
            b.where_(Sql::column("image_votes", "user_id").equals(col(model, "user_id")));
            vec![
                OrderTerm::desc(Sql::column("image_votes", "value")),
                OrderTerm::desc(Sql::column("images", "vote_cache")),
                OrderTerm::desc(col(model, "vote_cache")),
            ]
        }
        "herbarium_label" if model == Model::HerbariumRecord => vec![
            OrderTerm::asc(col(model, "initial_det")),
            OrderTerm::asc(col(model, "accession_number")),
        ],
        "herbarium_name" if model == Model::HerbariumRecord => {
            b.join(&["herbaria"]);
            vec![OrderTerm::asc(Sql::column("herbaria", "name"))]
        }
        "code" if model == Model::Herbarium => {
            b.where_(col(model, "code").not_equals(Sql::raw("''")));
            vec![OrderTerm::asc(col(model, "code"))]
        }
        "records" if model == Model::Herbarium => {
            // outer so herbaria without records are kept
            b.join(&["herbarium_records!"]);
            b.set_group(col(model, "id"));
            vec![OrderTerm::desc(Sql::func("COUNT", Sql::column("herbarium_records", "id")))]
        }
        "id" => vec![OrderTerm::asc(col(model, "id"))],
        _ => return None,
    };
    Some(terms)
}

fn by_name(b: &mut ConditionBuilder<'_>) -> Option<Vec<OrderTerm>> {
    let model = b.model();
    Some(match model {
        Model::Image => {
            b.join(&["observation_images", "observations", "names"]);
            b.set_group(col(model, "id"));
            vec![
                OrderTerm::asc(Sql::func("MIN", Sql::column("names", "sort_name"))),
                OrderTerm::desc(col(model, "when")),
            ]
        }
        Model::LocationDescription => {
            b.join(&["locations"]);
            vec![
                OrderTerm::asc(Sql::column("locations", "name")),
                OrderTerm::asc(col(model, "created_at")),
            ]
        }
        Model::NameDescription => {
            b.join(&["names"]);
            vec![
                OrderTerm::asc(Sql::column("names", "sort_name")),
                OrderTerm::asc(col(model, "created_at")),
            ]
        }
        Model::Name => vec![OrderTerm::asc(col(model, "sort_name"))],
        Model::Observation => {
            b.join(&["names"]);
            vec![
                OrderTerm::asc(Sql::column("names", "sort_name")),
                OrderTerm::desc(col(model, "when")),
            ]
        }
        _ if model.has_column("name") => vec![OrderTerm::asc(col(model, "name"))],
        _ if model.has_column("title") => vec![OrderTerm::asc(col(model, "title"))],
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::QueryConfig, params::Params, variant::Variant};
    use mycoquery_core::{Dialect, Id, Storage, Value};

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

    fn ordered(model: Model, by: Option<&str>) -> (String, crate::condition::Assembly) {
        let mut params = Params::new();
        if let Some(by) = by {
            params.insert("by", by);
        }
        let mut b = ConditionBuilder::new(model, Variant::All, &params, &Empty, QueryConfig::default());
        apply(&mut b).unwrap();
        let assembly = b.finish();
        (order_clause(&assembly.order).sql(Dialect::SQLite), assembly)
    }

    #[test]
    fn test_default_order_with_tiebreak() {
        let (sql, _) = ordered(Model::Observation, None);
        assert_eq!(
            sql,
            r#"ORDER BY "observations"."when" DESC, "observations"."id" DESC"#
        );
    }

    #[test]
    fn test_reverse_flips_every_term() {
        let (sql, assembly) = ordered(Model::Observation, Some("reverse_name"));
        assert_eq!(
            sql,
            r#"ORDER BY "names"."sort_name" DESC, "observations"."when" ASC, "observations"."id" ASC"#
        );
        assert!(assembly.joins.contains("names"));
    }

    #[test]
    fn test_unknown_key_falls_back_to_default() {
        let (sql, _) = ordered(Model::Project, Some("image_quality"));
        assert_eq!(sql, r#"ORDER BY "projects"."title" ASC, "projects"."id" DESC"#);
    }

    #[test]
    fn test_id_has_no_tiebreak() {
        let (sql, _) = ordered(Model::License, Some("id"));
        assert_eq!(sql, r#"ORDER BY "licenses"."id" ASC"#);
    }

    #[test]
    fn test_image_name_groups() {
        let (sql, assembly) = ordered(Model::Image, Some("name"));
        assert!(sql.starts_with(r#"ORDER BY MIN("names"."sort_name") ASC"#));
        assert_eq!(assembly.group, Some(Sql::column("images", "id")));
    }

    #[test]
    fn test_owners_quality_adds_condition() {
        let (_, assembly) = ordered(Model::Image, Some("owners_quality"));
        assert_eq!(assembly.wheres.len(), 1);
        assert!(assembly.joins.contains("image_votes"));
    }
}
