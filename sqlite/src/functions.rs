//! Scalar functions SQLite lacks out of the box.

use regex::Regex;
use rusqlite::{Connection, Error, functions::FunctionFlags};
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registers `regexp(pattern, text)`, which backs the `text REGEXP pattern` operator.
///
/// The compiled pattern is cached per statement; a NULL subject never matches.
pub fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let regexp: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;
            let text = ctx
                .get_raw(1)
                .as_str_or_null()
                .map_err(|e| Error::UserFunctionError(e.into()))?;
            Ok(text.is_some_and(|text| regexp.is_match(text)))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regexp_operator() {
        let conn = Connection::open_in_memory().unwrap();
        register_regexp(&conn).unwrap();
        let hit: bool = conn
            .query_row("SELECT 'Amanita muscaria' REGEXP '^Amanita '", [], |r| r.get(0))
            .unwrap();
        let miss: bool = conn
            .query_row("SELECT 'Boletus' REGEXP '^Amanita'", [], |r| r.get(0))
            .unwrap();
        let null: bool = conn
            .query_row("SELECT NULL REGEXP 'x'", [], |r| r.get(0))
            .unwrap();
        assert!(hit);
        assert!(!miss);
        assert!(!null);
    }
}
