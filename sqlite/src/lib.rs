//! SQLite storage for mycoquery
//!
//! Provides [`SqliteStore`], a rusqlite-backed implementation of both storage
//! boundary traits, including the `query_records` cache table.

#[cfg(feature = "rusqlite")]
mod functions;
#[cfg(feature = "rusqlite")]
mod store;

#[cfg(feature = "rusqlite")]
pub use functions::register_regexp;
#[cfg(feature = "rusqlite")]
pub use store::{QUERY_RECORDS_SCHEMA, SqliteStore};

pub use mycoquery_core::{Dialect, QueryRecord, RecordStore, Storage, StorageError};
