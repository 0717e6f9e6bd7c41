mod chunk;
mod tokens;

use crate::{DatePart, Dialect, Value};
pub use chunk::*;
use chunk::chunk_needs_space;
use core::fmt::{Display, Write};
use smallvec::SmallVec;
use std::borrow::Cow;
pub use tokens::*;

/// SQL fragment builder with flat chunk storage.
///
/// Fragments own their bound values so they can be stored on a query and
/// rendered any number of times. Rendering never splices a [`Value`] into
/// the statement text; each one becomes a placeholder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    pub chunks: SmallVec<[Chunk; 8]>,
}

impl Sql {
    // ==================== constructors ====================

    /// Creates an empty SQL fragment
    #[inline]
    pub const fn empty() -> Self {
        Self {
            chunks: SmallVec::new_const(),
        }
    }

    /// Creates SQL with a single token
    #[inline]
    pub fn token(t: Token) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Token(t)],
        }
    }

    /// Creates SQL with a quoted identifier
    #[inline]
    pub fn ident(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Ident(name.into())],
        }
    }

    /// Creates SQL with raw text (unquoted). Only for trusted text.
    #[inline]
    pub fn raw(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Raw(text.into())],
        }
    }

    /// Creates SQL with a trusted integer literal.
    #[inline]
    pub fn number(value: i64) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Number(value)],
        }
    }

    /// Creates SQL with a single parameter value
    #[inline]
    pub fn param(value: impl Into<Value>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Param(value.into())],
        }
    }

    /// Creates SQL referencing `"table"."column"`
    #[inline]
    pub fn column(table: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            chunks: smallvec::smallvec![Chunk::Column {
                table: table.into(),
                name: name.into(),
            }],
        }
    }

    /// Creates SQL for a function call: NAME(args)
    #[inline]
    pub fn func(name: &'static str, args: Sql) -> Self {
        Sql::from(Chunk::Function(name))
            .push(Token::LPAREN)
            .append(args)
            .push(Token::RPAREN)
    }

    /// Month or day extracted from `expr`, rendered per dialect.
    #[inline]
    pub fn date_part(part: DatePart, expr: Sql) -> Self {
        Self::from(Chunk::DatePart {
            part,
            expr: Box::new(expr),
        })
    }

    /// A condition that never matches.
    #[inline]
    pub fn never() -> Self {
        Self::token(Token::FALSE)
    }

    // ==================== builder methods ====================

    /// Append another SQL fragment (flat extend)
    #[inline]
    pub fn append(mut self, other: impl Into<Sql>) -> Self {
        self.append_mut(other);
        self
    }

    #[inline]
    pub fn append_mut(&mut self, other: impl Into<Sql>) {
        let other = other.into();
        if self.chunks.is_empty() {
            self.chunks = other.chunks;
            return;
        }
        self.chunks.extend(other.chunks);
    }

    /// Push a single chunk
    #[inline]
    pub fn push(mut self, chunk: impl Into<Chunk>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    #[inline]
    pub fn push_mut(&mut self, chunk: impl Into<Chunk>) {
        self.chunks.push(chunk.into());
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Bound values in render order.
    pub fn params(&self) -> Vec<&Value> {
        let mut out = Vec::new();
        collect_params(&self.chunks, &mut out);
        out
    }

    // ==================== combinators ====================

    /// Joins multiple SQL fragments with a separator, skipping empty ones.
    pub fn join<T>(sqls: T, separator: Token) -> Sql
    where
        T: IntoIterator,
        T::Item: Into<Sql>,
    {
        let mut result = Sql::empty();
        for item in sqls {
            let other = item.into();
            if other.is_empty() {
                continue;
            }
            if !result.is_empty() {
                result.chunks.push(Chunk::Token(separator));
            }
            result.chunks.extend(other.chunks);
        }
        result
    }

    /// `(a) AND (b) AND ...`, each operand parenthesized.
    pub fn and_all<T>(sqls: T) -> Sql
    where
        T: IntoIterator<Item = Sql>,
    {
        Self::join(
            sqls.into_iter().filter(|s| !s.is_empty()).map(Sql::parens),
            Token::AND,
        )
    }

    /// `a OR b OR ...`, wrapped in parentheses when there is more than one.
    pub fn or_any<T>(sqls: T) -> Sql
    where
        T: IntoIterator<Item = Sql>,
    {
        let parts: Vec<Sql> = sqls.into_iter().filter(|s| !s.is_empty()).collect();
        if parts.len() > 1 {
            Self::join(parts, Token::OR).parens()
        } else {
            Self::join(parts, Token::OR)
        }
    }

    /// Wrap in parentheses: (self)
    #[inline]
    pub fn parens(self) -> Self {
        Sql::token(Token::LPAREN).append(self).push(Token::RPAREN)
    }

    /// Creates an aliased version: self AS "name"
    pub fn alias(self, name: impl Into<Cow<'static, str>>) -> Sql {
        self.push(Token::AS).push(Chunk::Ident(name.into()))
    }

    /// Creates a comma-separated list of parameters.
    pub fn param_list<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let iter = values.into_iter();
        let (lower, _) = iter.size_hint();
        let mut chunks = SmallVec::with_capacity(lower.saturating_mul(2));
        for (i, v) in iter.enumerate() {
            if i > 0 {
                chunks.push(Chunk::Token(Token::COMMA));
            }
            chunks.push(Chunk::Param(v.into()));
        }
        Sql { chunks }
    }

    // ==================== operators ====================

    /// `self <op> rhs`
    #[inline]
    pub fn compare(self, op: Token, rhs: impl Into<Sql>) -> Sql {
        self.push(op).append(rhs)
    }

    #[inline]
    pub fn equals(self, rhs: impl Into<Sql>) -> Sql {
        self.compare(Token::EQ, rhs)
    }

    #[inline]
    pub fn not_equals(self, rhs: impl Into<Sql>) -> Sql {
        self.compare(Token::NE, rhs)
    }

    #[inline]
    pub fn ge(self, rhs: impl Into<Sql>) -> Sql {
        self.compare(Token::GE, rhs)
    }

    #[inline]
    pub fn le(self, rhs: impl Into<Sql>) -> Sql {
        self.compare(Token::LE, rhs)
    }

    #[inline]
    pub fn gt(self, rhs: impl Into<Sql>) -> Sql {
        self.compare(Token::GT, rhs)
    }

    #[inline]
    pub fn lt(self, rhs: impl Into<Sql>) -> Sql {
        self.compare(Token::LT, rhs)
    }

    /// `self IN (?, ?, ...)`
    pub fn in_list<I>(self, values: I) -> Sql
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.push(Token::IN).append(Sql::param_list(values).parens())
    }

    /// `self NOT IN (?, ?, ...)`
    pub fn not_in_list<I>(self, values: I) -> Sql
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.push(Token::NOT)
            .push(Token::IN)
            .append(Sql::param_list(values).parens())
    }

    /// `self LIKE ? ESCAPE '\'`
    pub fn like(self, pattern: impl Into<Value>) -> Sql {
        self.push(Token::LIKE)
            .push(Chunk::Param(pattern.into()))
            .push(Token::ESCAPE)
            .push(Chunk::EscapeLiteral)
    }

    /// `self NOT LIKE ? ESCAPE '\'`
    pub fn not_like(self, pattern: impl Into<Value>) -> Sql {
        self.push(Token::NOT).like(pattern)
    }

    pub fn is_null(self) -> Sql {
        self.push(Token::IS).push(Token::NULL)
    }

    pub fn is_not_null(self) -> Sql {
        self.push(Token::IS).push(Token::NOT).push(Token::NULL)
    }

    /// `NOT (self)`
    pub fn negate(self) -> Sql {
        Sql::token(Token::NOT).append(self.parens())
    }

    // ==================== output methods ====================

    /// Returns the SQL string for `dialect`.
    pub fn sql(&self, dialect: Dialect) -> String {
        self.build(dialect).0
    }

    /// Generates the SQL string and collects parameter values in a single pass.
    pub fn build(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let sql_cap = self.chunks.len().saturating_mul(8).max(128);
        let mut buf = String::with_capacity(sql_cap);
        let mut params = Vec::with_capacity(self.chunks.len().saturating_div(4).max(4));
        let mut index = 1usize;
        render(&self.chunks, dialect, &mut buf, &mut params, &mut index);
        (buf, params)
    }
}

fn render(
    chunks: &[Chunk],
    dialect: Dialect,
    buf: &mut String,
    params: &mut Vec<Value>,
    index: &mut usize,
) {
    for (i, chunk) in chunks.iter().enumerate() {
        match chunk {
            Chunk::Param(value) => {
                dialect.write_placeholder(buf, *index);
                *index += 1;
                params.push(value.clone());
            }
            Chunk::DatePart { part, expr } => {
                dialect.open_date_part(buf, *part);
                render(&expr.chunks, dialect, buf, params, index);
                dialect.close_date_part(buf);
            }
            _ => chunk.write(dialect, buf),
        }

        if let Some(next) = chunks.get(i + 1)
            && chunk_needs_space(chunk, next)
        {
            let _ = buf.write_char(' ');
        }
    }
}

fn collect_params<'s>(chunks: &'s [Chunk], out: &mut Vec<&'s Value>) {
    for chunk in chunks {
        match chunk {
            Chunk::Param(value) => out.push(value),
            Chunk::DatePart { expr, .. } => collect_params(&expr.chunks, out),
            _ => {}
        }
    }
}

// ==================== conversions ====================

impl From<Token> for Sql {
    #[inline]
    fn from(value: Token) -> Self {
        Sql::token(value)
    }
}

impl From<Chunk> for Sql {
    #[inline]
    fn from(value: Chunk) -> Self {
        Self {
            chunks: smallvec::smallvec![value],
        }
    }
}

impl From<Value> for Sql {
    #[inline]
    fn from(value: Value) -> Self {
        Sql::param(value)
    }
}

impl Display for Sql {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.sql(Dialect::SQLite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_and_params() {
        let sql = Sql::column("observations", "when").ge(Sql::param("2020-01-01"));
        let (text, params) = sql.build(Dialect::SQLite);
        assert_eq!(text, r#""observations"."when" >= ?"#);
        assert_eq!(params, vec![Value::from("2020-01-01")]);
    }

    #[test]
    fn test_function_spacing() {
        let sql = Sql::func(
            "COUNT",
            Sql::token(Token::DISTINCT).append(Sql::column("names", "id")),
        );
        assert_eq!(sql.sql(Dialect::SQLite), r#"COUNT(DISTINCT "names"."id")"#);
    }

    #[test]
    fn test_in_list_and_like() {
        let sql = Sql::column("t", "id").in_list([1i64, 2, 3]);
        assert_eq!(sql.sql(Dialect::SQLite), r#""t"."id" IN (?, ?, ?)"#);

        let sql = Sql::column("t", "notes").like("%x%");
        assert_eq!(sql.sql(Dialect::SQLite), r#""t"."notes" LIKE ? ESCAPE '\'"#);
        assert_eq!(sql.sql(Dialect::MySQL), r#"`t`.`notes` LIKE ? ESCAPE '\\'"#);
    }

    #[test]
    fn test_and_all_skips_empty() {
        let sql = Sql::and_all([
            Sql::column("a", "x").is_null(),
            Sql::empty(),
            Sql::column("a", "y").is_not_null(),
        ]);
        assert_eq!(
            sql.sql(Dialect::SQLite),
            r#"("a"."x" IS NULL) AND ("a"."y" IS NOT NULL)"#
        );
    }

    #[test]
    fn test_or_any_single_is_bare() {
        let one = Sql::or_any([Sql::never()]);
        assert_eq!(one.sql(Dialect::SQLite), "FALSE");
        let two = Sql::or_any([Sql::never(), Sql::token(Token::TRUE)]);
        assert_eq!(two.sql(Dialect::SQLite), "(FALSE OR TRUE)");
    }

    #[test]
    fn test_date_part_params_in_order() {
        let col = Sql::column("o", "when");
        let sql = Sql::date_part(DatePart::Month, col.clone())
            .gt(Sql::param(11i64))
            .push(Token::OR)
            .append(Sql::date_part(DatePart::Day, col).le(Sql::param(2i64)));
        let (text, params) = sql.build(Dialect::SQLite);
        assert_eq!(
            text,
            r#"CAST(strftime('%m', "o"."when") AS INTEGER) > ? OR CAST(strftime('%d', "o"."when") AS INTEGER) <= ?"#
        );
        assert_eq!(params, vec![Value::Integer(11), Value::Integer(2)]);
        assert_eq!(sql.params().len(), 2);
    }
}
