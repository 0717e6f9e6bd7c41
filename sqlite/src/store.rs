use crate::functions::register_regexp;
use mycoquery_core::{
    Dialect, Id, QueryRecord, RecordStore, Sql, Storage, StorageError, Value, error::Result,
    myco_trace_query,
};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::{path::Path, time::Duration};

/// DDL for the cache table. `description` is unique so concurrent creators
/// of the same record collide in the database rather than duplicate it.
pub const QUERY_RECORDS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS query_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL UNIQUE,
    access_count INTEGER NOT NULL DEFAULT 0
)";

/// A rusqlite connection serving both statement execution and cache records.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Wraps an open connection, registering `REGEXP` and creating the cache table.
    pub fn new(conn: Connection) -> Result<Self> {
        register_regexp(&conn)?;
        conn.execute_batch(QUERY_RECORDS_SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// The underlying connection, for schema setup and fixtures.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }

    fn prepare_sql(&self, sql: &Sql) -> (String, Vec<Value>) {
        let (text, params) = sql.build(Dialect::SQLite);
        myco_trace_query!(&text, params.len());
        (text, params)
    }
}

impl Storage for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    fn select_ids(&self, sql: &Sql) -> Result<Vec<Id>> {
        let (text, params) = self.prepare_sql(sql);
        let mut stmt = self.conn.prepare(&text)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| row.get::<_, Id>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn select_rows(&self, sql: &Sql) -> Result<Vec<Vec<Value>>> {
        let (text, params) = self.prepare_sql(sql);
        let mut stmt = self.conn.prepare(&text)?;
        let width = stmt.column_count();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn select_value(&self, sql: &Sql) -> Result<Option<Value>> {
        let (text, params) = self.prepare_sql(sql);
        let mut stmt = self.conn.prepare(&text)?;
        Ok(stmt
            .query_row(params_from_iter(params.iter()), |row| row.get::<_, Value>(0))
            .optional()?)
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueryRecord> {
    Ok(QueryRecord {
        id: row.get(0)?,
        description: row.get(1)?,
        access_count: row.get(2)?,
    })
}

impl RecordStore for SqliteStore {
    fn find_record(&self, description: &str) -> Result<Option<QueryRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, description, access_count FROM query_records WHERE description = ?1",
                params![description],
                record_from_row,
            )
            .optional()?)
    }

    fn find_record_by_id(&self, id: Id) -> Result<Option<QueryRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, description, access_count FROM query_records WHERE id = ?1",
                params![id],
                record_from_row,
            )
            .optional()?)
    }

    fn insert_record(&self, description: &str) -> Result<QueryRecord> {
        let inserted = self.conn.execute(
            "INSERT INTO query_records (description, access_count) VALUES (?1, 0)",
            params![description],
        );
        match inserted {
            Ok(_) => Ok(QueryRecord {
                id: self.conn.last_insert_rowid(),
                description: description.to_owned(),
                access_count: 0,
            }),
            Err(err) => {
                let err = StorageError::from(err);
                if err.is_conflict() {
                    Err(StorageError::Conflict(description.to_owned()))
                } else {
                    Err(err)
                }
            }
        }
    }

    fn increment_access(&self, id: Id) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE query_records SET access_count = access_count + 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycoquery_core::Token;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TABLE names (id INTEGER PRIMARY KEY, text_name TEXT);
                 INSERT INTO names VALUES (1, 'Agaricus'), (2, 'Amanita'), (3, 'Boletus');",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_select_ids_binds_params() {
        let store = store();
        let sql = Sql::token(Token::SELECT)
            .append(Sql::column("names", "id"))
            .push(Token::FROM)
            .append(Sql::ident("names"))
            .push(Token::WHERE)
            .append(Sql::column("names", "text_name").like("A%"))
            .push(Token::ORDER_BY)
            .append(Sql::column("names", "id"));
        assert_eq!(store.select_ids(&sql).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_select_value_empty_is_none() {
        let store = store();
        let sql = Sql::token(Token::SELECT)
            .append(Sql::column("names", "id"))
            .push(Token::FROM)
            .append(Sql::ident("names"))
            .push(Token::WHERE)
            .push(Token::FALSE);
        assert_eq!(store.select_value(&sql).unwrap(), None);
    }

    #[test]
    fn test_record_conflict() {
        let store = store();
        let rec = store.insert_record("{\"model\":\"Name\"}").unwrap();
        let err = store.insert_record("{\"model\":\"Name\"}").unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        store.increment_access(rec.id).unwrap();
        let found = store.find_record("{\"model\":\"Name\"}").unwrap().unwrap();
        assert_eq!(found.id, rec.id);
        assert_eq!(found.access_count, 1);
    }

    #[test]
    fn test_shared_file_sees_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let a = SqliteStore::open(&path).unwrap();
        let b = SqliteStore::open(&path).unwrap();
        let first = a.insert_record("k").unwrap();
        assert!(b.insert_record("k").unwrap_err().is_conflict());
        assert_eq!(b.find_record("k").unwrap().unwrap().id, first.id);
    }
}
