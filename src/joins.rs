//! Foreign keys between tables and rendering of a flattened join order.

use crate::{
    error::{QueryError, Result},
    model::Model,
};
use hashbrown::HashSet;
use mycoquery_core::{JoinStep, Sql, Token, join::base_table};

/// How `from` points at `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForeignKey {
    /// `from.column = to.id`
    Column(&'static str),
    /// `from.first = to.second`
    Pair(&'static str, &'static str),
    /// `from.target_id = to.id AND from.target_type = '<Model>'`
    Target,
}

use ForeignKey::*;

/// `(from_table, [(to_key, key)])`. A `to_key` may carry an alternate
/// association after a dot, selecting a different column.
const CATALOG: &[(&str, &[(&str, ForeignKey)])] = &[
    (
        "comments",
        &[
            ("location_descriptions", Target),
            ("locations", Target),
            ("name_descriptions", Target),
            ("names", Target),
            ("observations", Target),
            ("projects", Target),
            ("species_lists", Target),
            ("users", Column("user_id")),
        ],
    ),
    (
        "herbaria",
        &[("locations", Column("location_id")), ("users", Column("personal_user_id"))],
    ),
    (
        "herbarium_records",
        &[("herbaria", Column("herbarium_id")), ("users", Column("user_id"))],
    ),
    (
        "image_votes",
        &[("images", Column("image_id")), ("users", Column("user_id"))],
    ),
    (
        "images",
        &[("users", Column("user_id")), ("licenses", Column("license_id"))],
    ),
    (
        "observation_images",
        &[("images", Column("image_id")), ("observations", Column("observation_id"))],
    ),
    (
        "project_images",
        &[("images", Column("image_id")), ("projects", Column("project_id"))],
    ),
    (
        "location_descriptions",
        &[("locations", Column("location_id")), ("users", Column("user_id"))],
    ),
    (
        "location_description_authors",
        &[
            ("location_descriptions", Column("location_description_id")),
            ("users", Column("user_id")),
        ],
    ),
    (
        "location_description_editors",
        &[
            ("location_descriptions", Column("location_description_id")),
            ("users", Column("user_id")),
        ],
    ),
    (
        "locations",
        &[
            ("licenses", Column("license_id")),
            ("location_descriptions.default", Column("description_id")),
            ("rss_logs", Column("rss_log_id")),
            ("users", Column("user_id")),
        ],
    ),
    ("locations_versions", &[("locations", Column("location_id"))]),
    (
        "name_descriptions",
        &[("names", Column("name_id")), ("users", Column("user_id"))],
    ),
    (
        "name_description_authors",
        &[
            ("name_descriptions", Column("name_description_id")),
            ("users", Column("user_id")),
        ],
    ),
    (
        "name_description_editors",
        &[
            ("name_descriptions", Column("name_description_id")),
            ("users", Column("user_id")),
        ],
    ),
    (
        "names",
        &[
            ("licenses", Column("license_id")),
            ("name_descriptions.default", Column("description_id")),
            ("rss_logs", Column("rss_log_id")),
            ("users", Column("user_id")),
        ],
    ),
    ("names_versions", &[("names", Column("name_id"))]),
    (
        "namings",
        &[
            ("names", Column("name_id")),
            ("observations", Column("observation_id")),
            ("users", Column("user_id")),
        ],
    ),
    (
        "observations",
        &[
            ("locations", Column("location_id")),
            ("names", Column("name_id")),
            ("rss_logs", Column("rss_log_id")),
            ("users", Column("user_id")),
            ("images.thumb_image", Column("thumb_image_id")),
            ("image_votes.thumb_image", Pair("thumb_image_id", "image_id")),
        ],
    ),
    (
        "observation_herbarium_records",
        &[
            ("observations", Column("observation_id")),
            ("herbarium_records", Column("herbarium_record_id")),
        ],
    ),
    (
        "project_observations",
        &[("observations", Column("observation_id")), ("projects", Column("project_id"))],
    ),
    (
        "project_species_lists",
        &[("projects", Column("project_id")), ("species_lists", Column("species_list_id"))],
    ),
    (
        "projects",
        &[("users", Column("user_id")), ("rss_logs", Column("rss_log_id"))],
    ),
    (
        "rss_logs",
        &[
            ("locations", Column("location_id")),
            ("names", Column("name_id")),
            ("observations", Column("observation_id")),
            ("projects", Column("project_id")),
            ("species_lists", Column("species_list_id")),
        ],
    ),
    (
        "sequences",
        &[("observations", Column("observation_id")), ("users", Column("user_id"))],
    ),
    (
        "species_list_observations",
        &[
            ("observations", Column("observation_id")),
            ("species_lists", Column("species_list_id")),
        ],
    ),
    (
        "species_lists",
        &[
            ("locations", Column("location_id")),
            ("rss_logs", Column("rss_log_id")),
            ("users", Column("user_id")),
        ],
    ),
    (
        "users",
        &[
            ("images", Column("image_id")),
            ("licenses", Column("license_id")),
            ("locations", Column("location_id")),
        ],
    ),
];

fn lookup(from: &str, to: &str) -> Option<ForeignKey> {
    CATALOG
        .iter()
        .find(|(table, _)| *table == from)
        .and_then(|(_, keys)| keys.iter().find(|(key, _)| *key == to))
        .map(|(_, fk)| *fk)
}

/// The `ON` condition joining `to_key` onto `from_key`.
///
/// The forward direction (`from` holds the key) is tried first, then the
/// reverse; alternate associations only resolve forward.
pub fn join_condition(from_key: &str, to_key: &str) -> Result<Sql> {
    let from = base_table(from_key);
    let to = base_table(to_key);
    let (holder, target, fk) = if let Some(fk) = lookup(from, to_key) {
        (from, to, fk)
    } else if let Some(fk) = lookup(to_key, from) {
        (to, from, fk)
    } else {
        return Err(QueryError::JoinConflict {
            from: from_key.to_owned(),
            to: to_key.to_owned(),
        });
    };
    let (holder, target) = (holder.to_owned(), target.to_owned());
    Ok(match fk {
        Column(col) => Sql::column(holder, col).equals(Sql::column(target, "id")),
        Pair(col1, col2) => Sql::column(holder, col1).equals(Sql::column(target, col2)),
        Target => {
            let model = Model::from_table(&target).ok_or_else(|| QueryError::JoinConflict {
                from: from_key.to_owned(),
                to: to_key.to_owned(),
            })?;
            Sql::column(holder.clone(), "target_id")
                .equals(Sql::column(target, "id"))
                .push(Token::AND)
                .append(Sql::column(holder, "target_type").equals(Sql::param(model.name())))
        }
    })
}

/// `JOIN "t" ON ... LEFT OUTER JOIN "u" ON ...` for a flattened join order.
///
/// Each table may be joined once; a second path to the same table is a
/// [`QueryError::JoinConflict`].
pub fn render_joins(root: &'static str, steps: &[JoinStep]) -> Result<Sql> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(steps.len() + 1);
    seen.insert(root);
    let mut sql = Sql::empty();
    for step in steps {
        let parent = step.parent.as_deref().unwrap_or(root);
        let table = base_table(&step.table);
        if !seen.insert(table) {
            return Err(QueryError::JoinConflict {
                from: parent.to_owned(),
                to: step.table.to_string(),
            });
        }
        sql.push_mut(if step.outer {
            Token::LEFT_OUTER_JOIN
        } else {
            Token::JOIN
        });
        sql.append_mut(Sql::ident(table.to_owned()));
        sql.push_mut(Token::ON);
        sql.append_mut(join_condition(parent, &step.table)?);
    }
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycoquery_core::{Dialect, JoinGraph, Value};

    #[test]
    fn test_forward_join_prefers_holder() {
        let sql = join_condition("observations", "rss_logs").unwrap();
        assert_eq!(sql.sql(Dialect::SQLite), r#""observations"."rss_log_id" = "rss_logs"."id""#);
    }

    #[test]
    fn test_reverse_join() {
        let sql = join_condition("names", "observations").unwrap();
        assert_eq!(sql.sql(Dialect::SQLite), r#""observations"."name_id" = "names"."id""#);
    }

    #[test]
    fn test_alias_and_pair() {
        let sql = join_condition("names", "name_descriptions.default").unwrap();
        assert_eq!(
            sql.sql(Dialect::SQLite),
            r#""names"."description_id" = "name_descriptions"."id""#
        );
        let sql = join_condition("observations", "image_votes.thumb_image").unwrap();
        assert_eq!(
            sql.sql(Dialect::SQLite),
            r#""observations"."thumb_image_id" = "image_votes"."image_id""#
        );
    }

    #[test]
    fn test_polymorphic_target_binds_type() {
        let (sql, params) = join_condition("species_lists", "comments")
            .unwrap()
            .build(Dialect::SQLite);
        assert_eq!(
            sql,
            r#""comments"."target_id" = "species_lists"."id" AND "comments"."target_type" = ?"#
        );
        assert_eq!(params, vec![Value::from("SpeciesList")]);
    }

    #[test]
    fn test_unknown_pair_is_conflict() {
        assert!(matches!(
            join_condition("licenses", "sequences"),
            Err(QueryError::JoinConflict { .. })
        ));
    }

    #[test]
    fn test_render_nested_outer() {
        let mut graph = JoinGraph::new();
        graph.add_path(["observation_images", "observations", "locations!"]);
        let sql = render_joins("images", &graph.flatten()).unwrap();
        assert_eq!(
            sql.sql(Dialect::SQLite),
            concat!(
                r#"JOIN "observation_images" ON "observation_images"."image_id" = "images"."id" "#,
                r#"JOIN "observations" ON "observation_images"."observation_id" = "observations"."id" "#,
                r#"LEFT OUTER JOIN "locations" ON "observations"."location_id" = "locations"."id""#
            )
        );
    }

    #[test]
    fn test_second_path_to_table_is_conflict() {
        let mut graph = JoinGraph::new();
        graph.add_path(["images.thumb_image"]);
        graph.add_path(["observation_images", "images"]);
        assert!(matches!(
            render_joins("observations", &graph.flatten()),
            Err(QueryError::JoinConflict { .. })
        ));
    }
}
