//! The storage boundary.
//!
//! Query assembly never opens a connection; it hands rendered [`Sql`] to a
//! [`Storage`] and persists cache records through a [`RecordStore`].

use crate::{Dialect, Id, Sql, Value, error::Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Read-only statement execution.
pub trait Storage {
    /// Dialect the store renders statements for.
    fn dialect(&self) -> Dialect;

    /// Runs `sql` and returns the first column of every row as an id.
    fn select_ids(&self, sql: &Sql) -> Result<Vec<Id>>;

    /// Runs `sql` and returns every row.
    fn select_rows(&self, sql: &Sql) -> Result<Vec<Vec<Value>>>;

    /// Runs `sql` and returns the first column of the first row, if any.
    fn select_value(&self, sql: &Sql) -> Result<Option<Value>>;
}

/// A persisted cache row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: Id,
    /// Canonical sorted-key JSON description.
    pub description: String,
    pub access_count: i64,
}

/// Persistence for [`QueryRecord`]s.
///
/// `description` is unique; `insert_record` must fail with
/// [`crate::StorageError::Conflict`] (or a backend error for which
/// [`crate::StorageError::is_conflict`] holds) rather than create a duplicate.
pub trait RecordStore {
    fn find_record(&self, description: &str) -> Result<Option<QueryRecord>>;

    fn find_record_by_id(&self, id: Id) -> Result<Option<QueryRecord>>;

    fn insert_record(&self, description: &str) -> Result<QueryRecord>;

    fn increment_access(&self, id: Id) -> Result<()>;
}

// ==================== forwarding impls ====================

impl<T: Storage + ?Sized> Storage for &T {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn select_ids(&self, sql: &Sql) -> Result<Vec<Id>> {
        (**self).select_ids(sql)
    }

    fn select_rows(&self, sql: &Sql) -> Result<Vec<Vec<Value>>> {
        (**self).select_rows(sql)
    }

    fn select_value(&self, sql: &Sql) -> Result<Option<Value>> {
        (**self).select_value(sql)
    }
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn find_record(&self, description: &str) -> Result<Option<QueryRecord>> {
        (**self).find_record(description)
    }

    fn find_record_by_id(&self, id: Id) -> Result<Option<QueryRecord>> {
        (**self).find_record_by_id(id)
    }

    fn insert_record(&self, description: &str) -> Result<QueryRecord> {
        (**self).insert_record(description)
    }

    fn increment_access(&self, id: Id) -> Result<()> {
        (**self).increment_access(id)
    }
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn find_record(&self, description: &str) -> Result<Option<QueryRecord>> {
        (**self).find_record(description)
    }

    fn find_record_by_id(&self, id: Id) -> Result<Option<QueryRecord>> {
        (**self).find_record_by_id(id)
    }

    fn insert_record(&self, description: &str) -> Result<QueryRecord> {
        (**self).insert_record(description)
    }

    fn increment_access(&self, id: Id) -> Result<()> {
        (**self).increment_access(id)
    }
}
