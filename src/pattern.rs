//! Google-style search strings.
//!
//! `agaricus "white spores" -edible amanita OR lepiota` parses to three
//! required groups and one excluded term. Each required group is an OR of
//! alternatives; every group must match. An excluded term must match none of
//! the searched columns.

use compact_str::CompactString;
use mycoquery_core::{Chunk, Sql, Token};

/// One search term and its `OR` alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term(pub Vec<CompactString>);

impl Term {
    fn single(text: &str) -> Self {
        Self(vec![text.into()])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerms {
    pub required: Vec<Term>,
    pub excluded: Vec<Term>,
}

impl SearchTerms {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty()
    }
}

/// Splits off a leading item: a quoted phrase closed before a space or the
/// end of input, otherwise the run of non-space characters.
fn take_item(s: &str) -> (&str, &str) {
    if let Some(body) = s.strip_prefix('"')
        && let Some(close) = body.find('"')
        && close > 0
    {
        let rest = &body[close + 1..];
        if rest.is_empty() || rest.starts_with(' ') {
            return (&body[..close], rest);
        }
    }
    let end = s.find(' ').unwrap_or(s.len());
    (&s[..end], &s[end..])
}

pub fn parse(raw: &str) -> SearchTerms {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut terms = SearchTerms::default();
    let mut rest = normalized.as_str();
    while !rest.is_empty() {
        if let Some(negated) = rest.strip_prefix('-')
            && !negated.is_empty()
            && !negated.starts_with(' ')
        {
            let (item, tail) = take_item(negated);
            terms.excluded.push(Term::single(item));
            rest = tail.trim_start();
            continue;
        }
        let (first, mut tail) = take_item(rest);
        let mut alternatives = vec![CompactString::from(first)];
        while let Some(after_or) = tail.strip_prefix(" OR ")
            && !after_or.is_empty()
        {
            let (item, next) = take_item(after_or);
            alternatives.push(item.into());
            tail = next;
        }
        terms.required.push(Term(alternatives));
        rest = tail.trim_start();
    }
    terms
}

/// Escapes LIKE wildcards in user text and maps `*` to `%`.
pub fn clean_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '\\' | '%' => {
                out.push('\\');
                out.push(c);
            }
            '*' => out.push('%'),
            _ => out.push(c),
        }
    }
    out
}

/// `expr LIKE ?`, with an explicit backslash escape clause when `escape` is set.
pub(crate) fn like(expr: Sql, pattern: String, escape: bool) -> Sql {
    let sql = expr.push(Token::LIKE).push(Chunk::Param(pattern.into()));
    if escape {
        sql.push(Token::ESCAPE).push(Chunk::EscapeLiteral)
    } else {
        sql
    }
}

fn any_column(columns: &[Sql], text: &str, escape: bool) -> Vec<Sql> {
    let pattern = format!("%{}%", clean_pattern(text));
    columns
        .iter()
        .map(|col| like(col.clone(), pattern.clone(), escape))
        .collect()
}

/// Compiles terms against `columns`; empty terms compile to an empty fragment.
pub fn compile(terms: &SearchTerms, columns: &[Sql]) -> Sql {
    compile_with(terms, columns, true)
}

pub fn compile_with(terms: &SearchTerms, columns: &[Sql], escape: bool) -> Sql {
    if columns.is_empty() {
        return Sql::empty();
    }
    let required = terms.required.iter().map(|term| {
        Sql::or_any(
            term.0
                .iter()
                .flat_map(|alt| any_column(columns, alt, escape)),
        )
    });
    let excluded = terms.excluded.iter().map(|term| {
        Sql::join(
            term.0.iter().flat_map(|alt| any_column(columns, alt, escape)),
            Token::OR,
        )
        .negate()
    });
    Sql::join(required.chain(excluded), Token::AND)
}
