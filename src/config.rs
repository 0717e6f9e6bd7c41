//! Engine settings, loadable from TOML.

use crate::error::{QueryError, Result};
use mycoquery_core::Dialect;
use serde::Deserialize;

/// Knobs shared by every query built under one configuration.
///
/// ```toml
/// dialect = "sqlite"
/// max_array = 500
/// like_escape = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Dialect used by [`crate::Query::to_sql_string`].
    pub dialect: Dialect,
    /// Upper bound on id lists and array parameters; longer inputs are truncated.
    pub max_array: usize,
    /// Emit `ESCAPE '\'` after LIKE patterns.
    pub like_escape: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::SQLite,
            max_array: 1000,
            like_escape: true,
        }
    }
}

impl QueryConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| QueryError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueryConfig::default();
        assert_eq!(config.dialect, Dialect::SQLite);
        assert_eq!(config.max_array, 1000);
        assert!(config.like_escape);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = QueryConfig::from_toml_str("dialect = \"mysql\"\nmax_array = 3\n").unwrap();
        assert_eq!(config.dialect, Dialect::MySQL);
        assert_eq!(config.max_array, 3);
        assert!(config.like_escape);
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let err = QueryConfig::from_toml_str("colour = 1").unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }
}
