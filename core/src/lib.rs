//! Dialect-neutral building blocks for mycoquery: SQL fragments with bound
//! values, the join tree, and the storage boundary traits.

pub mod dialect;
pub mod error;
pub mod join;
pub mod memory;
pub mod sql;
pub mod storage;
pub mod tracing;
pub mod value;

// Re-export key types and traits
pub use dialect::{DatePart, Dialect};
pub use error::{Result, StorageError};
pub use join::{JoinGraph, JoinSpec, JoinStep};
pub use memory::MemoryRecordStore;
pub use sql::{Chunk, Sql, Token};
pub use storage::{QueryRecord, RecordStore, Storage};
pub use value::{Id, Value};
