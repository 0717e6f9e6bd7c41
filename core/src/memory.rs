//! In-process [`RecordStore`] for tests and single-process deployments.

use crate::{
    Id,
    error::{Result, StorageError},
    storage::{QueryRecord, RecordStore},
};
use hashbrown::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Records {
    rows: Vec<QueryRecord>,
    by_description: HashMap<String, usize>,
}

/// Query records held in memory behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: Mutex<Records>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |records| records.rows.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Execution("record store lock poisoned".into()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn find_record(&self, description: &str) -> Result<Option<QueryRecord>> {
        let records = self.lock()?;
        Ok(records
            .by_description
            .get(description)
            .map(|&i| records.rows[i].clone()))
    }

    fn find_record_by_id(&self, id: Id) -> Result<Option<QueryRecord>> {
        let records = self.lock()?;
        Ok(row_index(id)
            .and_then(|i| records.rows.get(i))
            .cloned())
    }

    fn insert_record(&self, description: &str) -> Result<QueryRecord> {
        let mut records = self.lock()?;
        if records.by_description.contains_key(description) {
            return Err(StorageError::Conflict(format!(
                "duplicate query record description: {description}"
            )));
        }
        let index = records.rows.len();
        let record = QueryRecord {
            id: index as Id + 1,
            description: description.to_owned(),
            access_count: 0,
        };
        records.rows.push(record.clone());
        records.by_description.insert(description.to_owned(), index);
        Ok(record)
    }

    fn increment_access(&self, id: Id) -> Result<()> {
        let mut records = self.lock()?;
        let row = row_index(id)
            .and_then(|i| records.rows.get_mut(i))
            .ok_or(StorageError::NotFound)?;
        row.access_count += 1;
        Ok(())
    }
}

/// Ids are assigned from 1 in insertion order.
fn row_index(id: Id) -> Option<usize> {
    id.checked_sub(1).and_then(|i| usize::try_from(i).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find() {
        let store = MemoryRecordStore::new();
        let rec = store.insert_record("{\"model\":\"Name\"}").unwrap();
        assert_eq!(rec.id, 1);
        assert_eq!(store.find_record("{\"model\":\"Name\"}").unwrap(), Some(rec.clone()));
        assert_eq!(store.find_record_by_id(1).unwrap(), Some(rec));
        assert_eq!(store.find_record_by_id(0).unwrap(), None);
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let store = MemoryRecordStore::new();
        store.insert_record("x").unwrap();
        let err = store.insert_record("x").unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_increment_access() {
        let store = MemoryRecordStore::new();
        let rec = store.insert_record("x").unwrap();
        store.increment_access(rec.id).unwrap();
        store.increment_access(rec.id).unwrap();
        assert_eq!(store.find_record_by_id(rec.id).unwrap().unwrap().access_count, 2);
        assert!(matches!(store.increment_access(9), Err(StorageError::NotFound)));
    }

    #[test]
    fn test_out_of_range_ids_miss() {
        let store = MemoryRecordStore::new();
        store.insert_record("x").unwrap();
        for id in [i64::MIN, -1, 0] {
            assert_eq!(store.find_record_by_id(id).unwrap(), None);
            assert!(matches!(store.increment_access(id), Err(StorageError::NotFound)));
        }
    }
}
