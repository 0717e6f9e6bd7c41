//! Filters every variant of a model accepts.

use crate::{
    condition::{ConditionBuilder, GENUS_RANK, GROUP_RANK, SOURCE_TYPES},
    error::Result,
    lookup::LookupKind,
    model::{LOCATION_NOTE_FIELDS, Model, NAME_NOTE_FIELDS, coalesced, note_fields},
    schema::{Declaration, ParamType, opt},
};
use mycoquery_core::{Sql, Token};

use ParamType::{Boolean, Float, String as Text};

const TIMES: ParamType = ParamType::Array(&ParamType::Time);
const DATES: ParamType = ParamType::Array(&ParamType::Date);
const STRINGS: ParamType = ParamType::Array(&Text);
const FLOATS: ParamType = ParamType::Array(&Float);
const USERS: ParamType = ParamType::Array(&ParamType::Object(Model::User));
const NAMES: ParamType = ParamType::Array(&ParamType::Object(Model::Name));
const LOCATIONS: ParamType = ParamType::Array(&ParamType::Object(Model::Location));
const PROJECTS: ParamType = ParamType::Array(&ParamType::Object(Model::Project));
const SPECIES_LISTS: ParamType = ParamType::Array(&ParamType::Object(Model::SpeciesList));
const HERBARIA: ParamType = ParamType::Array(&ParamType::Object(Model::Herbarium));
const LICENSES: ParamType = ParamType::Array(&ParamType::Object(Model::License));
const OBSERVATION_IDS: ParamType = ParamType::Array(&ParamType::Id(Model::Observation));

/// Size names accepted by the `size` range.
pub const IMAGE_SIZE_NAMES: &[&str] = &["thumbnail", "small", "medium", "large", "huge"];
/// Models a comment can be attached to.
pub const COMMENT_TARGETS: &[&str] = &[
    "Location",
    "LocationDescription",
    "Name",
    "NameDescription",
    "Observation",
    "Project",
    "SpeciesList",
];
pub const MISSPELLINGS: &[&str] = &["no", "either", "only"];
pub const JOIN_DESC: &[&str] = &["default", "any"];

const TIMESTAMPS: &[Declaration] = &[opt("created_at", TIMES), opt("updated_at", TIMES)];
const OWNED: &[Declaration] = &[opt("users", USERS)];
const NAME_FILTERS: &[Declaration] = &[
    opt("names", NAMES),
    opt("include_synonyms", Boolean),
    opt("include_subtaxa", Boolean),
    opt("include_immediate_subtaxa", Boolean),
    opt("exclude_original_names", Boolean),
];
const BOUNDING_BOX: &[Declaration] = &[
    opt("north", Float),
    opt("south", Float),
    opt("east", Float),
    opt("west", Float),
];

const COMMENT: &[Declaration] = &[
    opt("types", STRINGS),
    opt("summary_has", Text),
    opt("content_has", Text),
];
const HERBARIUM: &[Declaration] = &[
    opt("code", STRINGS),
    opt("name_has", Text),
    opt("description_has", Text),
    opt("mailing_address_has", Text),
    opt("nonpersonal", Boolean),
];
const HERBARIUM_RECORD: &[Declaration] = &[
    opt("herbaria", HERBARIA),
    opt("observations", OBSERVATION_IDS),
    opt("initial_det_has", Text),
    opt("accession_number_has", Text),
    opt("notes_has", Text),
    opt("has_notes", Boolean),
];
const IMAGE: &[Declaration] = &[
    opt("date", DATES),
    opt("locations", LOCATIONS),
    opt("projects", PROJECTS),
    opt("species_lists", SPECIES_LISTS),
    opt("size", ParamType::Array(&ParamType::Enum(IMAGE_SIZE_NAMES))),
    opt("content_types", STRINGS),
    opt("has_notes", Boolean),
    opt("notes_has", Text),
    opt("copyright_holder_has", Text),
    opt("license", LICENSES),
    opt("has_votes", Boolean),
    opt("quality", FLOATS),
    opt("confidence", FLOATS),
    opt("ok_for_export", Boolean),
    opt("has_observations", Boolean),
];
const LICENSE: &[Declaration] = &[opt("deprecated", Boolean)];
const LOCATION: &[Declaration] = &[
    opt("has_notes", Boolean),
    opt("notes_has", Text),
    opt("has_observations", Boolean),
    opt("has_descriptions", Boolean),
];
const LOCATION_DESCRIPTION: &[Declaration] = &[
    opt("types", STRINGS),
    opt("locations", LOCATIONS),
    opt("content_has", Text),
];
const NAME_DESCRIPTION: &[Declaration] = &[
    opt("types", STRINGS),
    opt("names", NAMES),
    opt("projects", PROJECTS),
    opt("content_has", Text),
];
const NAME: &[Declaration] = &[
    opt("misspellings", ParamType::Enum(MISSPELLINGS)),
    opt("deprecated", Boolean),
    opt("rank", STRINGS),
    opt("has_synonyms", Boolean),
    opt("text_name_has", Text),
    opt("author_has", Text),
    opt("citation_has", Text),
    opt("classification_has", Text),
    opt("notes_has", Text),
    opt("has_author", Boolean),
    opt("has_citation", Boolean),
    opt("has_classification", Boolean),
    opt("has_notes", Boolean),
    opt("has_comments", Boolean),
    opt("comments_has", Text),
    opt("has_observations", Boolean),
    opt("has_default_desc", Boolean),
    opt("join_desc", ParamType::Enum(JOIN_DESC)),
    opt("desc_type", STRINGS),
    opt("desc_project", PROJECTS),
    opt("desc_creator", USERS),
    opt("desc_content", Text),
    opt("ok_for_export", Boolean),
    opt("locations", LOCATIONS),
    opt("species_lists", SPECIES_LISTS),
];
const OBSERVATION: &[Declaration] = &[
    opt("date", DATES),
    opt("locations", LOCATIONS),
    opt("projects", PROJECTS),
    opt("species_lists", SPECIES_LISTS),
    opt("herbaria", HERBARIA),
    opt("confidence", FLOATS),
    opt("notes_has", Text),
    opt("is_collection_location", Boolean),
    opt("has_location", Boolean),
    opt("has_name", Boolean),
    opt("has_public_lat_lng", Boolean),
    opt("has_notes", Boolean),
    opt("has_notes_fields", STRINGS),
    opt("has_comments", Boolean),
    opt("comments_has", Text),
    opt("has_specimen", Boolean),
    opt("has_images", Boolean),
    opt("has_sequences", Boolean),
];
const PROJECT: &[Declaration] = &[opt("title_has", Text), opt("summary_has", Text)];
const RSS_LOG: &[Declaration] = &[opt("type", Text)];
const SEQUENCE: &[Declaration] = &[
    opt("locus", STRINGS),
    opt("archive", STRINGS),
    opt("accession", STRINGS),
    opt("locus_has", Text),
    opt("accession_has", Text),
    opt("notes_has", Text),
    opt("observations", OBSERVATION_IDS),
    opt("obs_date", DATES),
    opt("has_notes_fields", STRINGS),
];
const SPECIES_LIST: &[Declaration] = &[
    opt("date", DATES),
    opt("locations", LOCATIONS),
    opt("title_has", Text),
    opt("notes_has", Text),
    opt("has_notes", Boolean),
    opt("projects", PROJECTS),
];

/// Model-level declaration groups, in merge order.
pub fn declarations(model: Model) -> Vec<&'static [Declaration]> {
    let mut groups = vec![TIMESTAMPS];
    if model.has_column("user_id") {
        groups.push(OWNED);
    }
    groups.extend(match model {
        Model::Comment => vec![COMMENT],
        Model::Herbarium => vec![HERBARIUM],
        Model::HerbariumRecord => vec![HERBARIUM_RECORD],
        Model::Image => vec![IMAGE, NAME_FILTERS],
        Model::License => vec![LICENSE],
        Model::Location => vec![LOCATION, BOUNDING_BOX],
        Model::LocationDescription => vec![LOCATION_DESCRIPTION],
        Model::Name => vec![NAME, NAME_FILTERS],
        Model::NameDescription => vec![NAME_DESCRIPTION],
        Model::Observation => vec![OBSERVATION, NAME_FILTERS, BOUNDING_BOX],
        Model::Project => vec![PROJECT],
        Model::RssLog => vec![RSS_LOG],
        Model::Sequence => vec![SEQUENCE],
        Model::SpeciesList => vec![SPECIES_LIST, NAME_FILTERS],
        Model::User => vec![],
    });
    groups
}

fn is_set(col: Sql) -> (Sql, Sql) {
    (col.clone().is_not_null(), col.is_null())
}

/// Non-blank text versus blank or NULL.
fn has_text(table: &'static str, column: &'static str) -> (Sql, Sql) {
    let value = coalesced(table, column);
    (
        value.clone().not_equals(Sql::raw("''")),
        value.equals(Sql::raw("''")),
    )
}

fn is_true(col: Sql) -> (Sql, Sql) {
    (col.clone().equals(Token::TRUE), col.equals(Token::FALSE))
}

/// Applies the model-level filters.
pub fn init(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let model = b.model();
    let table = model.table();
    b.add_time("created_at", Sql::column(table, "created_at"), &[]);
    b.add_time("updated_at", Sql::column(table, "updated_at"), &[]);
    if model.has_column("user_id") {
        b.add_objects("users", LookupKind::Users, Sql::column(table, "user_id"), &[])?;
    }
    match model {
        Model::Comment => comment(b),
        Model::Herbarium => herbarium(b),
        Model::HerbariumRecord => herbarium_record(b)?,
        Model::Image => image(b)?,
        Model::License => {
            let (t, f) = is_true(Sql::column("licenses", "deprecated"));
            b.add_boolean("deprecated", t, f, &[]);
        }
        Model::Location => location(b),
        Model::LocationDescription => {
            b.add_indexed_enum_set("types", Sql::column(table, "source_type"), SOURCE_TYPES, &[]);
            b.add_objects("locations", LookupKind::Locations, Sql::column(table, "location_id"), &[])?;
            b.add_search("content_has", &note_fields(table, LOCATION_NOTE_FIELDS), &[]);
        }
        Model::NameDescription => {
            b.add_indexed_enum_set("types", Sql::column(table, "source_type"), SOURCE_TYPES, &[]);
            b.add_names(Sql::column(table, "name_id"), &[])?;
            b.add_objects("projects", LookupKind::Projects, Sql::column(table, "project_id"), &[])?;
            b.add_search("content_has", &note_fields(table, NAME_NOTE_FIELDS), &[]);
        }
        Model::Name => name(b)?,
        Model::Observation => observation(b)?,
        Model::Project => {
            b.add_search("title_has", &[Sql::column(table, "title")], &[]);
            b.add_search("summary_has", &[coalesced(table, "summary")], &[]);
        }
        Model::RssLog => b.add_rss_types("type"),
        Model::Sequence => sequence(b),
        Model::SpeciesList => species_list(b)?,
        Model::User => {}
    }
    Ok(())
}

fn comment(b: &mut ConditionBuilder<'_>) {
    b.add_enum_set("types", Sql::column("comments", "target_type"), COMMENT_TARGETS, &[]);
    b.add_search("summary_has", &[Sql::column("comments", "summary")], &[]);
    b.add_search(
        "content_has",
        &[Sql::column("comments", "summary"), coalesced("comments", "comment")],
        &[],
    );
}

fn herbarium(b: &mut ConditionBuilder<'_>) {
    b.add_exact_match("code", Sql::column("herbaria", "code"), &[]);
    b.add_search("name_has", &[Sql::column("herbaria", "name")], &[]);
    b.add_search("description_has", &[coalesced("herbaria", "description")], &[]);
    b.add_search("mailing_address_has", &[coalesced("herbaria", "mailing_address")], &[]);
    let (personal, institutional) = is_set(Sql::column("herbaria", "personal_user_id"));
    b.add_boolean("nonpersonal", institutional, personal, &[]);
}

fn herbarium_record(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let t = "herbarium_records";
    b.add_objects("herbaria", LookupKind::Herbaria, Sql::column(t, "herbarium_id"), &[])?;
    let observations: Vec<i64> = b
        .params()
        .array("observations")
        .iter()
        .filter_map(|v| v.as_i64())
        .collect();
    if !observations.is_empty() {
        b.add_ids(
            Sql::column("observation_herbarium_records", "observation_id"),
            &observations,
            &["observation_herbarium_records"],
        );
    }
    b.add_search("initial_det_has", &[Sql::column(t, "initial_det")], &[]);
    b.add_search("accession_number_has", &[Sql::column(t, "accession_number")], &[]);
    b.add_search("notes_has", &[coalesced(t, "notes")], &[]);
    let (t_, f) = has_text(t, "notes");
    b.add_boolean("has_notes", t_, f, &[]);
    Ok(())
}

const IMAGE_OBSERVATIONS: &[&str] = &["observation_images", "observations"];

fn image(b: &mut ConditionBuilder<'_>) -> Result<()> {
    b.add_date("date", Sql::column("images", "when"), &[]);
    b.add_names(Sql::column("observations", "name_id"), IMAGE_OBSERVATIONS)?;
    if b.params().contains("locations") {
        b.add_locations("locations", "observations", IMAGE_OBSERVATIONS)?;
    }
    b.add_objects(
        "projects",
        LookupKind::Projects,
        Sql::column("project_images", "project_id"),
        &["project_images"],
    )?;
    b.add_objects(
        "species_lists",
        LookupKind::SpeciesLists,
        Sql::column("species_list_observations", "species_list_id"),
        &["observation_images", "observations", "species_list_observations"],
    )?;
    b.add_image_size("size");
    b.add_image_types("content_types");
    let (t, f) = has_text("images", "notes");
    b.add_boolean("has_notes", t, f, &[]);
    b.add_search("notes_has", &[coalesced("images", "notes")], &[]);
    b.add_search("copyright_holder_has", &[coalesced("images", "copyright_holder")], &[]);
    b.add_objects("license", LookupKind::Licenses, Sql::column("images", "license_id"), &[])?;
    let (t, f) = is_set(Sql::column("images", "vote_cache"));
    b.add_boolean("has_votes", t, f, &[]);
    b.add_range("quality", Sql::column("images", "vote_cache"), &[]);
    b.add_range("confidence", Sql::column("observations", "vote_cache"), IMAGE_OBSERVATIONS);
    let (t, f) = is_true(Sql::column("images", "ok_for_export"));
    b.add_boolean("ok_for_export", t, f, &[]);
    b.add_join_if("has_observations", &["observation_images"]);
    Ok(())
}

fn location(b: &mut ConditionBuilder<'_>) {
    b.add_bounding_box(false);
    let (t, f) = has_text("locations", "notes");
    b.add_boolean("has_notes", t, f, &[]);
    b.add_search("notes_has", &[coalesced("locations", "notes")], &[]);
    b.add_join_if("has_observations", &["observations"]);
    let (t, f) = is_set(Sql::column("locations", "description_id"));
    b.add_boolean("has_descriptions", t, f, &[]);
}

fn name(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let n = |c: &'static str| Sql::column("names", c);
    match b.params().text("misspellings").unwrap_or("no") {
        "no" => b.where_(n("correct_spelling_id").is_null()),
        "only" => b.where_(n("correct_spelling_id").is_not_null()),
        _ => {}
    }
    let (t, f) = is_true(n("deprecated"));
    b.add_boolean("deprecated", t, f, &[]);
    b.add_rank("rank", &[])?;
    let (t, f) = is_set(n("synonym_id"));
    b.add_boolean("has_synonyms", t, f, &[]);
    b.add_search("text_name_has", &[n("text_name")], &[]);
    b.add_search("author_has", &[coalesced("names", "author")], &[]);
    b.add_search("citation_has", &[coalesced("names", "citation")], &[]);
    b.add_search("classification_has", &[coalesced("names", "classification")], &[]);
    b.add_search("notes_has", &[coalesced("names", "notes")], &[]);
    for (key, column) in [
        ("has_author", "author"),
        ("has_citation", "citation"),
        ("has_classification", "classification"),
        ("has_notes", "notes"),
    ] {
        let (t, f) = has_text("names", column);
        b.add_boolean(key, t, f, &[]);
    }
    b.add_join_if("has_comments", &["comments"]);
    b.add_search(
        "comments_has",
        &[Sql::column("comments", "summary"), coalesced("comments", "comment")],
        &["comments"],
    );
    b.add_join_if("has_observations", &["observations"]);
    let (t, f) = is_set(n("description_id"));
    b.add_boolean("has_default_desc", t, f, &[]);

    let desc: &[&str] = if b.params().text("join_desc") == Some("default") {
        &["name_descriptions.default"]
    } else {
        &["name_descriptions"]
    };
    if b.params().text("join_desc").is_some() {
        b.join(desc);
    }
    b.add_indexed_enum_set(
        "desc_type",
        Sql::column("name_descriptions", "source_type"),
        SOURCE_TYPES,
        desc,
    );
    b.add_objects(
        "desc_project",
        LookupKind::Projects,
        Sql::column("name_descriptions", "project_id"),
        desc,
    )?;
    b.add_objects(
        "desc_creator",
        LookupKind::Users,
        Sql::column("name_descriptions", "user_id"),
        desc,
    )?;
    b.add_search("desc_content", &note_fields("name_descriptions", NAME_NOTE_FIELDS), desc);

    let (t, f) = is_true(n("ok_for_export"));
    b.add_boolean("ok_for_export", t, f, &[]);
    b.add_objects(
        "locations",
        LookupKind::Locations,
        Sql::column("observations", "location_id"),
        &["observations"],
    )?;
    b.add_objects(
        "species_lists",
        LookupKind::SpeciesLists,
        Sql::column("species_list_observations", "species_list_id"),
        &["observations", "species_list_observations"],
    )?;
    b.add_names(n("id"), &[])
}

fn observation(b: &mut ConditionBuilder<'_>) -> Result<()> {
    let o = |c: &'static str| Sql::column("observations", c);
    b.add_date("date", o("when"), &[]);
    b.add_names(o("name_id"), &[])?;
    if b.params().contains("locations") {
        b.add_locations("locations", "observations", &[])?;
    }
    b.add_objects(
        "projects",
        LookupKind::Projects,
        Sql::column("project_observations", "project_id"),
        &["project_observations"],
    )?;
    b.add_objects(
        "species_lists",
        LookupKind::SpeciesLists,
        Sql::column("species_list_observations", "species_list_id"),
        &["species_list_observations"],
    )?;
    b.add_objects(
        "herbaria",
        LookupKind::Herbaria,
        Sql::column("herbarium_records", "herbarium_id"),
        &["observation_herbarium_records", "herbarium_records"],
    )?;
    b.add_range("confidence", o("vote_cache"), &[]);
    b.add_search("notes_has", &[coalesced("observations", "notes")], &[]);
    let (t, f) = is_true(o("is_collection_location"));
    b.add_boolean("is_collection_location", t, f, &[]);
    let (t, f) = is_set(o("location_id"));
    b.add_boolean("has_location", t, f, &[]);
    let rank = || Sql::column("names", "rank");
    b.add_boolean(
        "has_name",
        Sql::or_any([rank().le(Sql::param(GENUS_RANK)), rank().equals(Sql::param(GROUP_RANK))]),
        Sql::and_all([rank().gt(Sql::param(GENUS_RANK)), rank().lt(Sql::param(GROUP_RANK))]),
        &["names"],
    );
    b.add_boolean(
        "has_public_lat_lng",
        Sql::and_all([o("lat").is_not_null(), o("gps_hidden").equals(Token::FALSE)]),
        Sql::or_any([o("lat").is_null(), o("gps_hidden").equals(Token::TRUE)]),
        &[],
    );
    let (t, f) = has_text("observations", "notes");
    b.add_boolean("has_notes", t, f, &[]);
    b.add_notes_fields("has_notes_fields", o("notes"), &[]);
    b.add_join_if("has_comments", &["comments"]);
    b.add_search(
        "comments_has",
        &[Sql::column("comments", "summary"), coalesced("comments", "comment")],
        &["comments"],
    );
    let (t, f) = is_true(o("specimen"));
    b.add_boolean("has_specimen", t, f, &[]);
    let (t, f) = is_set(o("thumb_image_id"));
    b.add_boolean("has_images", t, f, &[]);
    b.add_join_if("has_sequences", &["sequences"]);
    b.add_bounding_box(true);
    Ok(())
}

fn sequence(b: &mut ConditionBuilder<'_>) {
    let s = |c: &'static str| Sql::column("sequences", c);
    b.add_exact_match("locus", s("locus"), &[]);
    b.add_exact_match("archive", s("archive"), &[]);
    b.add_exact_match("accession", s("accession"), &[]);
    b.add_search("locus_has", &[s("locus")], &[]);
    b.add_search("accession_has", &[coalesced("sequences", "accession")], &[]);
    b.add_search("notes_has", &[coalesced("sequences", "notes")], &[]);
    let observations: Vec<i64> = b
        .params()
        .array("observations")
        .iter()
        .filter_map(|v| v.as_i64())
        .collect();
    if !observations.is_empty() {
        b.add_ids(s("observation_id"), &observations, &[]);
    }
    b.add_date("obs_date", Sql::column("observations", "when"), &["observations"]);
    b.add_notes_fields("has_notes_fields", Sql::column("observations", "notes"), &["observations"]);
}

fn species_list(b: &mut ConditionBuilder<'_>) -> Result<()> {
    b.add_date("date", Sql::column("species_lists", "when"), &[]);
    b.add_names(
        Sql::column("observations", "name_id"),
        &["species_list_observations", "observations"],
    )?;
    if b.params().contains("locations") {
        b.add_locations("locations", "species_lists", &[])?;
    }
    b.add_search("title_has", &[Sql::column("species_lists", "title")], &[]);
    b.add_search("notes_has", &[coalesced("species_lists", "notes")], &[]);
    let (t, f) = has_text("species_lists", "notes");
    b.add_boolean("has_notes", t, f, &[]);
    b.add_objects(
        "projects",
        LookupKind::Projects,
        Sql::column("project_species_lists", "project_id"),
        &["project_species_lists"],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::QueryConfig, params::Params, schema::DeclarationSet, variant::Variant};
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

    #[test]
    fn test_model_declarations_merge_cleanly() {
        for model in Model::ALL {
            let mut set = DeclarationSet::new();
            for group in declarations(model) {
                set.extend(group).unwrap();
            }
            assert!(set.get("created_at").is_some(), "{model}");
            assert_eq!(set.get("users").is_some(), model.has_column("user_id"), "{model}");
        }
    }

    #[test]
    fn test_names_hide_misspellings_by_default() {
        let params = Params::new();
        let mut b = ConditionBuilder::new(Model::Name, Variant::All, &params, &Empty, QueryConfig::default());
        init(&mut b).unwrap();
        let assembly = b.finish();
        assert_eq!(assembly.wheres.len(), 1);
        assert_eq!(
            assembly.wheres[0].sql(Dialect::SQLite),
            r#""names"."correct_spelling_id" IS NULL"#
        );
    }

    #[test]
    fn test_observation_flags_and_joins() {
        let mut params = Params::new();
        params.insert("has_specimen", true);
        params.insert("has_comments", true);
        params.insert("projects", 7i64);
        let mut b = ConditionBuilder::new(Model::Observation, Variant::All, &params, &Empty, QueryConfig::default());
        init(&mut b).unwrap();
        let assembly = b.finish();
        let wheres: Vec<String> = assembly.wheres.iter().map(|w| w.sql(Dialect::SQLite)).collect();
        assert!(wheres.contains(&r#""observations"."specimen" = TRUE"#.to_owned()));
        assert!(wheres.contains(&r#""project_observations"."project_id" IN (?)"#.to_owned()));
        assert!(assembly.joins.contains("comments"));
        assert!(assembly.joins.contains("project_observations"));
    }

    #[test]
    fn test_description_source_types_by_position() {
        let mut params = Params::new();
        params.insert("types", crate::params::ParamValue::Array(vec!["user, public".into()]));
        let mut b = ConditionBuilder::new(
            Model::NameDescription,
            Variant::All,
            &params,
            &Empty,
            QueryConfig::default(),
        );
        init(&mut b).unwrap();
        let (sql, values) = b.finish().wheres[0].build(Dialect::SQLite);
        assert_eq!(sql, r#""name_descriptions"."source_type" IN (?, ?)"#);
        assert_eq!(values, vec![Value::Integer(5), Value::Integer(1)]);
    }
}
