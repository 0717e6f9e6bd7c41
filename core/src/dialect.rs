//! SQL dialects understood by the fragment renderer.
//!
//! Fragments are dialect-neutral until [`crate::Sql::build`] renders them;
//! identifier quoting, date-part extraction and the LIKE escape literal
//! differ at render time. Statement shape differs only for `DISTINCT` with
//! ordering, see [`Dialect::distinct_orders_by_selected_only`].

use core::fmt::Write;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    SQLite,
    MySQL,
}

/// Calendar component extracted from a date or timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Month,
    Day,
}

impl Dialect {
    /// Writes a quoted identifier.
    pub fn write_ident(&self, buf: &mut impl Write, name: &str) {
        let quote = match self {
            Dialect::SQLite => '"',
            Dialect::MySQL => '`',
        };
        let _ = buf.write_char(quote);
        for c in name.chars() {
            if c == quote {
                let _ = buf.write_char(quote);
            }
            let _ = buf.write_char(c);
        }
        let _ = buf.write_char(quote);
    }

    /// Writes the positional placeholder for the 1-based `index`.
    #[inline]
    pub fn write_placeholder(&self, buf: &mut impl Write, _index: usize) {
        let _ = buf.write_char('?');
    }

    /// Opens a date-part extraction; the caller writes the expression and then
    /// calls [`Dialect::close_date_part`].
    pub fn open_date_part(&self, buf: &mut impl Write, part: DatePart) {
        let _ = match (self, part) {
            (Dialect::SQLite, DatePart::Month) => buf.write_str("CAST(strftime('%m', "),
            (Dialect::SQLite, DatePart::Day) => buf.write_str("CAST(strftime('%d', "),
            (Dialect::MySQL, DatePart::Month) => buf.write_str("MONTH("),
            (Dialect::MySQL, DatePart::Day) => buf.write_str("DAY("),
        };
    }

    pub fn close_date_part(&self, buf: &mut impl Write) {
        let _ = match self {
            Dialect::SQLite => buf.write_str(") AS INTEGER)"),
            Dialect::MySQL => buf.write_char(')'),
        };
    }

    /// Whether `SELECT DISTINCT` rejects ordering by columns outside the
    /// select list (MySQL under `ONLY_FULL_GROUP_BY`).
    #[inline]
    pub const fn distinct_orders_by_selected_only(&self) -> bool {
        matches!(self, Dialect::MySQL)
    }

    /// The string literal naming the LIKE escape character (a backslash).
    pub const fn like_escape_literal(&self) -> &'static str {
        match self {
            Dialect::SQLite => r"'\'",
            Dialect::MySQL => r"'\\'",
        }
    }
}

impl core::fmt::Display for Dialect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Dialect::SQLite => "sqlite",
            Dialect::MySQL => "mysql",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_quoting() {
        let mut buf = String::new();
        Dialect::SQLite.write_ident(&mut buf, "when");
        assert_eq!(buf, "\"when\"");

        let mut buf = String::new();
        Dialect::MySQL.write_ident(&mut buf, "odd`name");
        assert_eq!(buf, "`odd``name`");
    }

    #[test]
    fn test_date_part() {
        let mut buf = String::new();
        Dialect::SQLite.open_date_part(&mut buf, DatePart::Month);
        buf.push_str("x");
        Dialect::SQLite.close_date_part(&mut buf);
        assert_eq!(buf, "CAST(strftime('%m', x) AS INTEGER)");

        let mut buf = String::new();
        Dialect::MySQL.open_date_part(&mut buf, DatePart::Day);
        buf.push_str("x");
        Dialect::MySQL.close_date_part(&mut buf);
        assert_eq!(buf, "DAY(x)");
    }
}
