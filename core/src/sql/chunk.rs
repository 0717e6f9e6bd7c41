use super::{Sql, tokens::Token};
use crate::{DatePart, Dialect, Value};
use std::borrow::Cow;
use core::fmt::Write;

/// A SQL chunk represents one part of a statement.
///
/// - `Token` - keywords, operators and punctuation
/// - `Ident` - quoted identifiers (table names, aliases)
/// - `Column` - qualified column reference, rendered `"table"."column"`
/// - `Raw` - trusted, unquoted text (constant expressions)
/// - `Number` - trusted integer literal
/// - `Param` - a bound value rendered as a placeholder
/// - `Function` - function name immediately followed by `(`
/// - `DatePart` - dialect-specific month/day extraction
/// - `EscapeLiteral` - the dialect's LIKE escape character literal
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Token(Token),
    Ident(Cow<'static, str>),
    Column {
        table: Cow<'static, str>,
        name: Cow<'static, str>,
    },
    Raw(Cow<'static, str>),
    Number(i64),
    Param(Value),
    Function(&'static str),
    DatePart {
        part: DatePart,
        expr: Box<Sql>,
    },
    EscapeLiteral,
}

impl Chunk {
    // ==================== const constructors ====================

    #[inline]
    pub const fn token(t: Token) -> Self {
        Self::Token(t)
    }

    #[inline]
    pub const fn ident_static(name: &'static str) -> Self {
        Self::Ident(Cow::Borrowed(name))
    }

    #[inline]
    pub const fn raw_static(text: &'static str) -> Self {
        Self::Raw(Cow::Borrowed(text))
    }

    #[inline]
    pub const fn column_static(table: &'static str, name: &'static str) -> Self {
        Self::Column {
            table: Cow::Borrowed(table),
            name: Cow::Borrowed(name),
        }
    }

    // ==================== write implementation ====================

    /// Writes everything except parameters, which the caller numbers.
    pub(crate) fn write(&self, dialect: Dialect, buf: &mut impl Write) {
        match self {
            Chunk::Token(token) => {
                let _ = buf.write_str(token.as_str());
            }
            Chunk::Ident(name) => dialect.write_ident(buf, name),
            Chunk::Column { table, name } => {
                dialect.write_ident(buf, table);
                let _ = buf.write_char('.');
                dialect.write_ident(buf, name);
            }
            Chunk::Raw(text) => {
                let _ = buf.write_str(text);
            }
            Chunk::Number(n) => {
                let _ = write!(buf, "{n}");
            }
            Chunk::Param(_) => dialect.write_placeholder(buf, 0),
            Chunk::Function(name) => {
                let _ = buf.write_str(name);
            }
            Chunk::DatePart { .. } => {}
            Chunk::EscapeLiteral => {
                let _ = buf.write_str(dialect.like_escape_literal());
            }
        }
    }

    /// Word-like chunks need a space between each other.
    #[inline]
    pub(crate) const fn is_word_like(&self) -> bool {
        match self {
            Chunk::Token(t) => !t.is_punctuation() && !t.is_operator(),
            Chunk::Ident(_)
            | Chunk::Column { .. }
            | Chunk::Raw(_)
            | Chunk::Number(_)
            | Chunk::Param(_)
            | Chunk::Function(_)
            | Chunk::DatePart { .. }
            | Chunk::EscapeLiteral => true,
        }
    }
}

/// Spacing rule between two adjacent chunks.
pub(crate) fn chunk_needs_space(current: &Chunk, next: &Chunk) -> bool {
    if let Chunk::Raw(text) = current
        && text.ends_with(' ')
    {
        return false;
    }
    if let Chunk::Raw(text) = next
        && text.starts_with(' ')
    {
        return false;
    }

    match (current, next) {
        // NAME( with no gap
        (Chunk::Function(_), Chunk::Token(Token::LPAREN)) => false,
        (_, Chunk::Token(Token::RPAREN | Token::COMMA | Token::DOT)) => false,
        (Chunk::Token(Token::LPAREN | Token::DOT), _) => false,
        (Chunk::Token(Token::COMMA), _) => true,
        (Chunk::Token(Token::RPAREN), next) => next.is_word_like(),
        (current, Chunk::Token(Token::LPAREN)) => current.is_word_like(),
        (Chunk::Token(t), _) if t.is_operator() => true,
        (_, Chunk::Token(t)) if t.is_operator() => true,
        _ => current.is_word_like() && next.is_word_like(),
    }
}

// ==================== From implementations ====================

impl From<Token> for Chunk {
    #[inline]
    fn from(value: Token) -> Self {
        Self::Token(value)
    }
}

impl From<Value> for Chunk {
    #[inline]
    fn from(value: Value) -> Self {
        Self::Param(value)
    }
}
