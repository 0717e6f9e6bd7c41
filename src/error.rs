use crate::{model::Model, variant::Variant};
use compact_str::CompactString;
use mycoquery_core::StorageError;
use std::fmt;
use thiserror::Error;

/// One problem with a caller-supplied parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown parameter `{0}`")]
    UnknownParameter(CompactString),

    #[error("missing required parameter `{0}`")]
    MissingParameter(CompactString),

    /// The value could not be read as the declared type.
    #[error("parameter `{key}` expects {expected}, got {got}")]
    InvalidValue {
        key: CompactString,
        expected: String,
        got: String,
    },
}

/// Every parameter problem found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaErrors(pub Vec<SchemaError>);

impl SchemaErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, err: SchemaError) {
        self.0.push(err);
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> std::result::Result<(), SchemaErrors> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

/// A by-name reference that could not be narrowed to a single record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no {kind} matches `{name}`")]
    NotFound { kind: &'static str, name: String },

    #[error("`{name}` matches {count} {kind} records")]
    Ambiguous {
        kind: &'static str,
        name: String,
        count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// The models share no relationship at all.
    #[error("{from} queries cannot be turned into {to} queries")]
    Unrelated { from: Model, to: Model },

    /// The models are related but this variant has no mapping.
    #[error("{model} {variant} queries have no {target} equivalent")]
    Unsupported {
        model: Model,
        variant: Variant,
        target: Model,
    },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid parameters: {0}")]
    Schema(SchemaErrors),

    /// Two declarations disagree about a parameter's type.
    #[error("parameter `{name}` redeclared as {new} (was {old})")]
    SchemaDefinition {
        name: &'static str,
        old: String,
        new: String,
    },

    #[error("{model} has no `{variant}` variant")]
    NoSuchVariant { model: Model, variant: Variant },

    #[error("unknown model `{0}`")]
    UnknownModel(String),

    #[error("unknown variant `{0}`")]
    UnknownVariant(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// No foreign key connects the two tables.
    #[error("don't know how to join `{from}` to `{to}`")]
    JoinConflict { from: String, to: String },

    #[error("unknown rank `{0}`")]
    UnknownRank(String),

    #[error("invalid search: {0}")]
    InvalidSearch(String),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<SchemaErrors> for QueryError {
    fn from(errors: SchemaErrors) -> Self {
        QueryError::Schema(errors)
    }
}

impl From<SchemaError> for QueryError {
    fn from(err: SchemaError) -> Self {
        QueryError::Schema(SchemaErrors(vec![err]))
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_display_all() {
        let errors = SchemaErrors(vec![
            SchemaError::UnknownParameter("colour".into()),
            SchemaError::MissingParameter("user".into()),
        ]);
        assert_eq!(
            errors.to_string(),
            "unknown parameter `colour`; missing required parameter `user`"
        );
        assert!(SchemaErrors::default().into_result().is_ok());
    }
}
