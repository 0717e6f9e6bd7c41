use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Error executing a statement
    #[error("Execution error: {0}")]
    Execution(String),

    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No rows returned when at least one was expected
    #[error("No rows found")]
    NotFound,

    /// Error mapping a row into a value
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// True for uniqueness violations, whatever the backend reported them as.
    pub fn is_conflict(&self) -> bool {
        match self {
            StorageError::Conflict(_) => true,
            #[cfg(feature = "rusqlite")]
            StorageError::Rusqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            }
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
