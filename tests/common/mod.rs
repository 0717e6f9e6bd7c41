#![cfg(feature = "rusqlite")]
#![allow(dead_code)]

use mycoquery::{Model, sqlite::SqliteStore};
use rusqlite::Connection;

/// Join tables and their columns, beside the per-model tables.
const LINK_TABLES: &[(&str, &[&str])] = &[
    ("observation_images", &["observation_id", "image_id", "rank"]),
    ("project_images", &["project_id", "image_id"]),
    ("project_observations", &["project_id", "observation_id"]),
    ("project_species_lists", &["project_id", "species_list_id"]),
    ("species_list_observations", &["species_list_id", "observation_id"]),
    ("observation_herbarium_records", &["observation_id", "herbarium_record_id"]),
    ("namings", &["id", "observation_id", "name_id", "user_id", "vote_cache"]),
    ("image_votes", &["id", "image_id", "user_id", "value"]),
    ("location_description_authors", &["location_description_id", "user_id"]),
    ("location_description_editors", &["location_description_id", "user_id"]),
    ("name_description_authors", &["name_description_id", "user_id"]),
    ("name_description_editors", &["name_description_id", "user_id"]),
    ("locations_versions", &["id", "location_id", "user_id"]),
    ("names_versions", &["id", "name_id", "user_id"]),
];

const SEED: &str = r#"
INSERT INTO users (id, login, name) VALUES
    (1, 'rolf', 'Rolf Singer'),
    (2, 'mary', 'Mary Newbie'),
    (3, 'dick', NULL);

INSERT INTO names (id, text_name, search_name, sort_name, rank, synonym_id, correct_spelling_id, classification, deprecated, user_id) VALUES
    (1, 'Agaricus', 'Agaricus', 'Agaricus', 9, NULL, NULL, 'Kingdom: _Fungi_', FALSE, 1),
    (2, 'Agaricus campestris', 'Agaricus campestris', 'Agaricus campestris', 4, 100, NULL, 'Kingdom: _Fungi_ Genus: _Agaricus_', FALSE, 1),
    (3, 'Agaricus campestras', 'Agaricus campestras', 'Agaricus campestras', 4, NULL, 2, '', TRUE, 2),
    (4, 'Psalliota campestris', 'Psalliota campestris', 'Psalliota campestris', 4, 100, NULL, '', TRUE, 2),
    (5, 'Amanita', 'Amanita', 'Amanita', 9, NULL, NULL, 'Kingdom: _Fungi_', FALSE, 1),
    (6, 'Amanita muscaria', 'Amanita muscaria', 'Amanita muscaria', 4, NULL, NULL, 'Kingdom: _Fungi_ Genus: _Amanita_', FALSE, 1);

INSERT INTO locations (id, name, north, south, east, west, user_id) VALUES
    (1, 'Albion, California, USA', 39.25, 39.2, -123.75, -123.8, 1),
    (2, 'Burbank, California, USA', 34.2, 34.15, -118.3, -118.35, 2);

INSERT INTO observations (id, user_id, "when", name_id, location_id, "where", specimen, thumb_image_id, vote_cache, notes, rss_log_id, created_at) VALUES
    (1, 1, '2020-01-15', 2, 1, NULL, TRUE, 2, 2.0, 'found in a meadow', 1, '2020-01-15 10:00:00'),
    (2, 1, '2020-02-20', 6, 2, NULL, FALSE, NULL, 1.0, NULL, NULL, '2020-02-20 10:00:00'),
    (3, 2, '2021-11-30', 4, 1, NULL, FALSE, 3, 3.0, NULL, NULL, '2021-11-30 10:00:00'),
    (4, 2, '2019-06-01', 5, NULL, 'Somewhere, Oregon', FALSE, NULL, 0.5, 'under oaks', NULL, '2019-06-01 10:00:00');

INSERT INTO images (id, user_id, "when", vote_cache, original_name, created_at) VALUES
    (1, 1, '2020-01-15', 1.0, 'cap.jpg', '2020-01-16 09:00:00'),
    (2, 1, '2020-01-15', 3.0, 'gills.jpg', '2020-01-16 09:05:00'),
    (3, 2, '2021-11-30', 2.0, 'psalliota.jpg', '2021-12-01 08:00:00'),
    (4, 3, '2022-05-05', NULL, 'loose.jpg', '2022-05-05 08:00:00');

INSERT INTO observation_images (observation_id, image_id, rank) VALUES (1, 1, 1), (1, 2, 2), (3, 3, 1);

INSERT INTO projects (id, title, summary, user_id) VALUES (1, 'Bolete Project', 'Boletes of the west', 1);
INSERT INTO project_observations (project_id, observation_id) VALUES (1, 1), (1, 3);

INSERT INTO species_lists (id, title, "when", user_id) VALUES (1, 'Mendocino Foray', '2020-02-20', 1);
INSERT INTO species_list_observations (species_list_id, observation_id) VALUES (1, 2);

INSERT INTO comments (id, user_id, summary, comment, target_type, target_id, created_at) VALUES
    (1, 2, 'Nice find', 'Looks like campestris to me.', 'Observation', 1, '2020-01-17 12:00:00'),
    (2, 1, 'Question', NULL, 'Name', 5, '2020-03-01 12:00:00');

INSERT INTO rss_logs (id, observation_id, updated_at) VALUES (1, 1, '2020-01-17 12:00:00');
"#;

/// `CREATE TABLE` for a table whose `id` (when present) is the rowid.
fn create_table(conn: &Connection, table: &str, columns: &[&str]) {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| match *c {
            "id" => "\"id\" INTEGER PRIMARY KEY".to_owned(),
            other => format!("\"{other}\""),
        })
        .collect();
    conn.execute_batch(&format!("CREATE TABLE \"{table}\" ({});", defs.join(", ")))
        .unwrap_or_else(|e| panic!("Failed to create {table}: {e}"));
}

fn create_tables(conn: &Connection) {
    for model in Model::ALL {
        create_table(conn, model.table(), model.columns());
    }
    for (table, columns) in LINK_TABLES {
        create_table(conn, table, columns);
    }
}

/// An in-memory store with the fixture schema and rows.
pub fn setup_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("Failed to create in-memory store");
    create_tables(store.connection());
    store
        .connection()
        .execute_batch(SEED)
        .expect("Failed to seed fixture");
    store
}
