//! The record kinds a query can be rooted at, with their table metadata.

use crate::error::QueryError;
use mycoquery_core::{Sql, Token};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Model {
    Comment,
    Herbarium,
    HerbariumRecord,
    Image,
    License,
    Location,
    LocationDescription,
    Name,
    NameDescription,
    Observation,
    Project,
    RssLog,
    Sequence,
    SpeciesList,
    User,
}

const COMMENT_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "summary", "comment", "target_type", "target_id",
];
const HERBARIUM_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "code", "name", "description", "mailing_address",
    "location_id", "personal_user_id",
];
const HERBARIUM_RECORD_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "herbarium_id", "initial_det",
    "accession_number", "notes",
];
const IMAGE_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "when", "notes", "copyright_holder",
    "license_id", "content_type", "width", "height", "vote_cache", "original_name",
    "ok_for_export", "num_views",
];
const LICENSE_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "display_name", "url", "deprecated",
];
const LOCATION_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "name", "scientific_name", "north", "south",
    "east", "west", "notes", "rss_log_id", "description_id", "num_views",
];
const LOCATION_DESCRIPTION_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "location_id", "source_type", "gen_desc",
    "ecology", "species", "notes", "refs", "num_views",
];
const NAME_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "text_name", "search_name", "sort_name",
    "author", "citation", "rank", "deprecated", "synonym_id", "correct_spelling_id",
    "classification", "notes", "rss_log_id", "description_id", "ok_for_export", "num_views",
];
const NAME_DESCRIPTION_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "name_id", "project_id", "source_type",
    "classification", "gen_desc", "diag_desc", "distribution", "habitat", "look_alikes",
    "uses", "refs", "notes", "num_views",
];
const OBSERVATION_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "when", "name_id", "location_id", "where",
    "lat", "long", "gps_hidden", "is_collection_location", "specimen", "thumb_image_id",
    "notes", "vote_cache", "rss_log_id", "text_name", "classification", "num_views",
];
const PROJECT_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "title", "summary", "rss_log_id",
    "user_group_id", "admin_group_id",
];
const RSS_LOG_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "observation_id", "name_id", "location_id",
    "species_list_id", "project_id", "glossary_term_id", "article_id", "notes",
];
const SEQUENCE_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "observation_id", "locus", "bases",
    "archive", "accession", "notes",
];
const SPECIES_LIST_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "user_id", "when", "where", "title", "notes",
    "location_id", "rss_log_id",
];
const USER_COLUMNS: &[&str] = &[
    "id", "created_at", "updated_at", "login", "name", "last_login", "contribution",
    "location_id", "image_id", "license_id",
];

/// Text columns searched by description-aware pattern searches.
pub(crate) const LOCATION_NOTE_FIELDS: &[&str] = &["gen_desc", "ecology", "species", "notes", "refs"];
pub(crate) const NAME_NOTE_FIELDS: &[&str] = &[
    "gen_desc", "diag_desc", "distribution", "habitat", "look_alikes", "uses", "refs", "notes",
    "classification",
];

impl Model {
    pub const ALL: [Model; 15] = [
        Model::Comment,
        Model::Herbarium,
        Model::HerbariumRecord,
        Model::Image,
        Model::License,
        Model::Location,
        Model::LocationDescription,
        Model::Name,
        Model::NameDescription,
        Model::Observation,
        Model::Project,
        Model::RssLog,
        Model::Sequence,
        Model::SpeciesList,
        Model::User,
    ];

    /// CamelCase name, as stored in polymorphic `*_type` columns and cache keys.
    pub const fn name(self) -> &'static str {
        match self {
            Model::Comment => "Comment",
            Model::Herbarium => "Herbarium",
            Model::HerbariumRecord => "HerbariumRecord",
            Model::Image => "Image",
            Model::License => "License",
            Model::Location => "Location",
            Model::LocationDescription => "LocationDescription",
            Model::Name => "Name",
            Model::NameDescription => "NameDescription",
            Model::Observation => "Observation",
            Model::Project => "Project",
            Model::RssLog => "RssLog",
            Model::Sequence => "Sequence",
            Model::SpeciesList => "SpeciesList",
            Model::User => "User",
        }
    }

    /// snake_case singular, used as the `type` title argument.
    pub const fn type_tag(self) -> &'static str {
        match self {
            Model::Comment => "comment",
            Model::Herbarium => "herbarium",
            Model::HerbariumRecord => "herbarium_record",
            Model::Image => "image",
            Model::License => "license",
            Model::Location => "location",
            Model::LocationDescription => "location_description",
            Model::Name => "name",
            Model::NameDescription => "name_description",
            Model::Observation => "observation",
            Model::Project => "project",
            Model::RssLog => "rss_log",
            Model::Sequence => "sequence",
            Model::SpeciesList => "species_list",
            Model::User => "user",
        }
    }

    pub const fn table(self) -> &'static str {
        match self {
            Model::Comment => "comments",
            Model::Herbarium => "herbaria",
            Model::HerbariumRecord => "herbarium_records",
            Model::Image => "images",
            Model::License => "licenses",
            Model::Location => "locations",
            Model::LocationDescription => "location_descriptions",
            Model::Name => "names",
            Model::NameDescription => "name_descriptions",
            Model::Observation => "observations",
            Model::Project => "projects",
            Model::RssLog => "rss_logs",
            Model::Sequence => "sequences",
            Model::SpeciesList => "species_lists",
            Model::User => "users",
        }
    }

    pub fn from_table(table: &str) -> Option<Model> {
        Model::ALL.into_iter().find(|m| m.table() == table)
    }

    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Model::Comment => COMMENT_COLUMNS,
            Model::Herbarium => HERBARIUM_COLUMNS,
            Model::HerbariumRecord => HERBARIUM_RECORD_COLUMNS,
            Model::Image => IMAGE_COLUMNS,
            Model::License => LICENSE_COLUMNS,
            Model::Location => LOCATION_COLUMNS,
            Model::LocationDescription => LOCATION_DESCRIPTION_COLUMNS,
            Model::Name => NAME_COLUMNS,
            Model::NameDescription => NAME_DESCRIPTION_COLUMNS,
            Model::Observation => OBSERVATION_COLUMNS,
            Model::Project => PROJECT_COLUMNS,
            Model::RssLog => RSS_LOG_COLUMNS,
            Model::Sequence => SEQUENCE_COLUMNS,
            Model::SpeciesList => SPECIES_LIST_COLUMNS,
            Model::User => USER_COLUMNS,
        }
    }

    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Sort key used when neither the caller nor the variant picks one.
    pub const fn default_order(self) -> &'static str {
        match self {
            Model::Comment | Model::Image | Model::Sequence => "created_at",
            Model::Herbarium
            | Model::Location
            | Model::LocationDescription
            | Model::Name
            | Model::NameDescription
            | Model::User => "name",
            Model::HerbariumRecord => "herbarium_label",
            Model::License => "id",
            Model::Observation => "date",
            Model::Project | Model::SpeciesList => "title",
            Model::RssLog => "updated_at",
        }
    }

    pub fn has_rss_log(self) -> bool {
        self.has_column("rss_log_id")
    }

    /// Column whose first character drives letter pagination.
    pub const fn title_column(self) -> Option<&'static str> {
        match self {
            Model::Comment => Some("summary"),
            Model::Herbarium | Model::Location => Some("name"),
            Model::HerbariumRecord => Some("initial_det"),
            Model::License => Some("display_name"),
            Model::Name => Some("sort_name"),
            Model::Project | Model::SpeciesList => Some("title"),
            Model::User => Some("login"),
            Model::Image
            | Model::LocationDescription
            | Model::NameDescription
            | Model::Observation
            | Model::RssLog
            | Model::Sequence => None,
        }
    }

    /// Joins a pattern search needs before [`Model::search_columns`] resolve.
    pub const fn search_joins(self) -> &'static [&'static [&'static str]] {
        match self {
            Model::Image => &[
                &["observation_images", "observations", "locations!"],
                &["observation_images", "observations", "names"],
            ],
            Model::Location => &[&["location_descriptions.default!"]],
            Model::Name => &[&["name_descriptions.default!"]],
            Model::Observation => &[&["locations!"], &["names"]],
            Model::SpeciesList => &[&["locations!"]],
            _ => &[],
        }
    }

    /// Text expressions a pattern search is matched against.
    pub fn search_columns(self) -> Vec<Sql> {
        match self {
            Model::Comment => vec![
                Sql::column("comments", "summary"),
                coalesced("comments", "comment"),
            ],
            Model::Herbarium => vec![
                Sql::column("herbaria", "code"),
                Sql::column("herbaria", "name"),
                coalesced("herbaria", "description"),
                coalesced("herbaria", "mailing_address"),
            ],
            Model::HerbariumRecord => vec![
                Sql::column("herbarium_records", "initial_det"),
                Sql::column("herbarium_records", "accession_number"),
                coalesced("herbarium_records", "notes"),
            ],
            Model::Image => vec![
                Sql::column("names", "search_name"),
                coalesced("images", "original_name"),
                coalesced("images", "copyright_holder"),
                coalesced("images", "notes"),
                location_or_where("observations"),
            ],
            Model::License => vec![
                Sql::column("licenses", "display_name"),
                coalesced("licenses", "url"),
            ],
            Model::Location => {
                let mut cols = vec![Sql::column("locations", "name")];
                cols.extend(note_fields("location_descriptions", LOCATION_NOTE_FIELDS));
                cols
            }
            Model::LocationDescription => note_fields("location_descriptions", LOCATION_NOTE_FIELDS),
            Model::Name => {
                let mut cols = vec![
                    Sql::column("names", "search_name"),
                    coalesced("names", "citation"),
                    coalesced("names", "notes"),
                ];
                cols.extend(note_fields("name_descriptions", NAME_NOTE_FIELDS));
                cols
            }
            Model::NameDescription => note_fields("name_descriptions", NAME_NOTE_FIELDS),
            Model::Observation => vec![
                Sql::column("names", "search_name"),
                coalesced("observations", "notes"),
                location_or_where("observations"),
            ],
            Model::Project => vec![
                Sql::column("projects", "title"),
                coalesced("projects", "summary"),
            ],
            Model::RssLog => vec![coalesced("rss_logs", "notes")],
            Model::Sequence => vec![
                Sql::column("sequences", "locus"),
                coalesced("sequences", "accession"),
                coalesced("sequences", "notes"),
            ],
            Model::SpeciesList => vec![
                Sql::column("species_lists", "title"),
                coalesced("species_lists", "notes"),
                location_or_where("species_lists"),
            ],
            Model::User => vec![
                Sql::column("users", "login"),
                coalesced("users", "name"),
            ],
        }
    }
}

/// `COALESCE("table"."column", '')` so NULL text never poisons a NOT LIKE.
pub(crate) fn coalesced(table: &'static str, column: &'static str) -> Sql {
    Sql::func(
        "COALESCE",
        Sql::column(table, column).push(Token::COMMA).append(Sql::raw("''")),
    )
}

pub(crate) fn note_fields(table: &'static str, fields: &[&'static str]) -> Vec<Sql> {
    fields.iter().map(|f| coalesced(table, f)).collect()
}

/// The linked location's name, or the free-text `where` when there is none.
pub(crate) fn location_or_where(table: &'static str) -> Sql {
    Sql::token(Token::CASE)
        .push(Token::WHEN)
        .append(Sql::column("locations", "id").is_not_null())
        .push(Token::THEN)
        .append(Sql::column("locations", "name"))
        .push(Token::ELSE)
        .append(coalesced(table, "where"))
        .push(Token::END)
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| QueryError::UnknownModel(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycoquery_core::Dialect;

    #[test]
    fn test_name_round_trips() {
        for model in Model::ALL {
            assert_eq!(model.name().parse::<Model>().unwrap(), model);
            assert_eq!(Model::from_table(model.table()), Some(model));
        }
        assert!(matches!("Fungus".parse::<Model>(), Err(QueryError::UnknownModel(_))));
    }

    #[test]
    fn test_rss_log_models() {
        let with_log: Vec<Model> = Model::ALL.into_iter().filter(|m| m.has_rss_log()).collect();
        assert_eq!(
            with_log,
            vec![
                Model::Location,
                Model::Name,
                Model::Observation,
                Model::Project,
                Model::SpeciesList
            ]
        );
    }

    #[test]
    fn test_location_or_where() {
        assert_eq!(
            location_or_where("observations").sql(Dialect::SQLite),
            r#"CASE WHEN "locations"."id" IS NOT NULL THEN "locations"."name" ELSE COALESCE("observations"."where", '') END"#
        );
    }
}
