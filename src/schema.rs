//! Parameter declarations and validation of raw caller input.
//!
//! A query's declarations are built by merging, base first: the global
//! parameters, then the model's filters, then the variant's own. A later
//! layer may add keys or tighten an optional key to required; giving an
//! existing key a different type is a [`QueryError::SchemaDefinition`].

use crate::{
    config::QueryConfig,
    error::{QueryError, SchemaError, SchemaErrors},
    model::Model,
    params::{ParamValue, Params, Subquery},
    registry,
    variant::{self, Variant},
};
use compact_str::CompactString;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::{fmt, sync::LazyLock};

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());
static FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(\d+(\.\d*)?|\.\d+)([eE][-+]?\d+)?$").unwrap());
static RECORD_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[1-9]\d*$").unwrap());
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d\d\d\d(-\d\d?){0,2}|\d\d?(-\d\d?)?)$").unwrap());
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d\d\d\d(-\d\d?){0,5}|\d\d?(-\d\d?){0,4})$").unwrap());
static LIST_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").unwrap());

/// The type a parameter's value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    /// `YYYY[-MM[-DD]]` or `MM[-DD]`.
    Date,
    /// `YYYY[-MM[-DD[-hh[-mm[-ss]]]]]` or the same without the year.
    Time,
    /// A record id of the given model.
    Id(Model),
    /// A record id or a name to be looked up at initialization.
    Object(Model),
    /// One of a fixed set of literals.
    Enum(&'static [&'static str]),
    Array(&'static ParamType),
    /// A nested query descriptor rooted at the given model.
    Subquery(Model),
}

impl ParamType {
    /// Whether a bare string should be split on commas and whitespace.
    const fn splits(self) -> bool {
        matches!(
            self,
            ParamType::Integer
                | ParamType::Float
                | ParamType::Date
                | ParamType::Time
                | ParamType::Id(_)
                | ParamType::Enum(_)
        )
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => f.write_str("a string"),
            ParamType::Integer => f.write_str("an integer"),
            ParamType::Float => f.write_str("a number"),
            ParamType::Boolean => f.write_str("a boolean"),
            ParamType::Date => f.write_str("a date"),
            ParamType::Time => f.write_str("a time"),
            ParamType::Id(model) => write!(f, "a {model} id"),
            ParamType::Object(model) => write!(f, "a {model} id or name"),
            ParamType::Enum(allowed) => write!(f, "one of {}", allowed.join(", ")),
            ParamType::Array(inner) => write!(f, "a list of {inner}"),
            ParamType::Subquery(model) => write!(f, "a {model} query"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub name: &'static str,
    pub required: bool,
    pub ty: ParamType,
}

/// An optional parameter.
pub const fn opt(name: &'static str, ty: ParamType) -> Declaration {
    Declaration {
        name,
        required: false,
        ty,
    }
}

/// A required parameter.
pub const fn req(name: &'static str, ty: ParamType) -> Declaration {
    Declaration {
        name,
        required: true,
        ty,
    }
}

/// Ordered, duplicate-free declarations for one (model, variant) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationSet {
    decls: Vec<Declaration>,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slice(decls: &[Declaration]) -> Result<Self, QueryError> {
        let mut set = Self::new();
        set.extend(decls)?;
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.decls.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter()
    }

    /// Adds one declaration under the extension rules.
    pub fn declare(&mut self, decl: Declaration) -> Result<(), QueryError> {
        match self.decls.iter_mut().find(|d| d.name == decl.name) {
            Some(existing) if existing.ty != decl.ty => Err(QueryError::SchemaDefinition {
                name: decl.name,
                old: existing.ty.to_string(),
                new: decl.ty.to_string(),
            }),
            Some(existing) => {
                existing.required |= decl.required;
                Ok(())
            }
            None => {
                self.decls.push(decl);
                Ok(())
            }
        }
    }

    pub fn extend(&mut self, decls: &[Declaration]) -> Result<(), QueryError> {
        decls.iter().try_for_each(|d| self.declare(*d))
    }

    /// `self` extended by `ext`, leaving `self` untouched.
    pub fn merge(&self, ext: &DeclarationSet) -> Result<DeclarationSet, QueryError> {
        let mut merged = self.clone();
        merged.extend(&ext.decls)?;
        Ok(merged)
    }
}

/// Checks `raw` against `decls`, collecting every problem before failing.
///
/// Blank values (null, empty or whitespace strings, empty arrays) count as
/// absent. Arrays longer than [`QueryConfig::max_array`] are truncated.
pub fn validate(
    decls: &DeclarationSet,
    raw: &Map<String, JsonValue>,
    config: &QueryConfig,
) -> Result<Params, SchemaErrors> {
    let mut errors = SchemaErrors::default();
    let mut params = Params::new();
    for (key, value) in raw {
        let Some(decl) = decls.get(key) else {
            errors.push(SchemaError::UnknownParameter(key.into()));
            continue;
        };
        match validate_value(decl.name, decl.ty, value, config) {
            Ok(Some(value)) => params.insert(decl.name, value),
            Ok(None) => {}
            Err(err) => errors.push(err),
        }
    }
    for decl in decls.iter().filter(|d| d.required) {
        if !params.contains(decl.name) && !raw.get(decl.name).is_some_and(|v| !is_blank(v)) {
            errors.push(SchemaError::MissingParameter(decl.name.into()));
        }
    }
    errors.into_result()?;
    Ok(params)
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Dates and times of `0` mean "unset".
fn is_blank_for(ty: ParamType, value: &JsonValue) -> bool {
    is_blank(value)
        || matches!(ty, ParamType::Date | ParamType::Time)
            && match value {
                JsonValue::String(s) => s.trim() == "0",
                JsonValue::Number(n) => n.as_i64() == Some(0),
                _ => false,
            }
}

fn invalid(key: &str, ty: ParamType, value: &JsonValue) -> SchemaError {
    let mut got = value.to_string();
    if got.len() > 60 {
        let cut = (0..=60).rev().find(|&i| got.is_char_boundary(i)).unwrap_or(0);
        got.truncate(cut);
        got.push_str("...");
    }
    SchemaError::InvalidValue {
        key: key.into(),
        expected: ty.to_string(),
        got,
    }
}

fn validate_value(
    key: &str,
    ty: ParamType,
    value: &JsonValue,
    config: &QueryConfig,
) -> Result<Option<ParamValue>, SchemaError> {
    if is_blank_for(ty, value) {
        return Ok(None);
    }
    match ty {
        ParamType::Array(inner) => validate_array(key, *inner, value, config),
        ParamType::Subquery(model) => validate_subquery(key, model, value, config).map(Some),
        scalar => validate_scalar(key, scalar, value).map(Some),
    }
}

fn validate_array(
    key: &str,
    inner: ParamType,
    value: &JsonValue,
    config: &QueryConfig,
) -> Result<Option<ParamValue>, SchemaError> {
    let split: Vec<JsonValue>;
    let items: &[JsonValue] = match value {
        JsonValue::Array(items) => items,
        JsonValue::String(s) if inner.splits() => {
            split = LIST_SEPARATOR
                .split(s.trim())
                .filter(|part| !part.is_empty())
                .map(|part| JsonValue::String(part.to_owned()))
                .collect();
            &split
        }
        other => std::slice::from_ref(other),
    };

    let mut out = Vec::with_capacity(items.len().min(config.max_array));
    for item in items.iter().take(config.max_array) {
        if is_blank_for(inner, item) {
            out.push(ParamValue::Null);
            continue;
        }
        out.push(match inner {
            ParamType::Subquery(model) => validate_subquery(key, model, item, config)?,
            ParamType::Array(_) => return Err(invalid(key, ParamType::Array(&ParamType::String), item)),
            scalar => validate_scalar(key, scalar, item)?,
        });
    }
    while out.last().is_some_and(ParamValue::is_null) {
        out.pop();
    }
    if out.is_empty() {
        return Ok(None);
    }
    if out.iter().all(|v| v.as_i64().is_some_and(|i| i > 0)) {
        let mut seen = hashbrown::HashSet::with_capacity(out.len());
        out.retain(|v| seen.insert(v.as_i64()));
    }
    Ok(Some(ParamValue::Array(out)))
}

fn validate_scalar(key: &str, ty: ParamType, value: &JsonValue) -> Result<ParamValue, SchemaError> {
    let text = match value {
        JsonValue::String(s) => Some(s.trim()),
        _ => None,
    };
    let parsed = match ty {
        ParamType::String => match value {
            JsonValue::String(s) => Some(ParamValue::Text(CompactString::from(s.trim()))),
            JsonValue::Number(n) => Some(ParamValue::Text(n.to_string().into())),
            _ => None,
        },
        ParamType::Integer => match value {
            JsonValue::Number(n) => n.as_i64().map(ParamValue::Integer),
            _ => text
                .filter(|t| INTEGER.is_match(t))
                .and_then(|t| t.parse().ok())
                .map(ParamValue::Integer),
        },
        ParamType::Float => match value {
            JsonValue::Number(n) => n.as_f64(),
            _ => text.filter(|t| FLOAT.is_match(t)).and_then(|t| t.parse().ok()),
        }
        // non-finite values would not survive a json round trip
        .filter(|f: &f64| f.is_finite())
        .map(ParamValue::Float),
        ParamType::Boolean => match value {
            JsonValue::Bool(b) => Some(ParamValue::Bool(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(0) => Some(ParamValue::Bool(false)),
                Some(1) => Some(ParamValue::Bool(true)),
                _ => None,
            },
            _ => text.and_then(parse_bool).map(ParamValue::Bool),
        },
        ParamType::Date | ParamType::Time => {
            let regex = if ty == ParamType::Date { &DATE } else { &TIME };
            let text = match value {
                JsonValue::Number(n) => n.as_u64().map(|n| n.to_string()),
                _ => text.map(str::to_owned),
            };
            text.filter(|t| regex.is_match(t))
                .map(|t| ParamValue::Text(t.into()))
        }
        ParamType::Id(_) => record_id(value).map(ParamValue::Integer),
        ParamType::Object(_) => match record_id(value) {
            Some(id) => Some(ParamValue::Integer(id)),
            None => text
                .filter(|t| !INTEGER.is_match(t))
                .map(|t| ParamValue::Text(collapse_whitespace(t).into())),
        },
        ParamType::Enum(allowed) => text
            .and_then(|t| allowed.iter().find(|a| **a == t))
            .map(|a| ParamValue::Text(CompactString::from(*a))),
        ParamType::Array(_) | ParamType::Subquery(_) => None,
    };
    parsed.ok_or_else(|| invalid(key, ty, value))
}

fn record_id(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().filter(|&i| i > 0),
        JsonValue::String(s) => {
            let s = s.trim();
            RECORD_ID.is_match(s).then(|| s.parse().ok()).flatten()
        }
        _ => None,
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn validate_subquery(
    key: &str,
    model: Model,
    value: &JsonValue,
    config: &QueryConfig,
) -> Result<ParamValue, SchemaError> {
    let ty = ParamType::Subquery(model);
    let JsonValue::Object(raw) = value else {
        return Err(invalid(key, ty, value));
    };
    let variant = match raw.get("variant") {
        None => Variant::All,
        Some(JsonValue::String(name)) => name
            .parse::<Variant>()
            .ok()
            .filter(|v| variant::is_allowed(model, *v))
            .ok_or_else(|| invalid(key, ty, value))?,
        Some(_) => return Err(invalid(key, ty, value)),
    };
    let decls = registry::declarations(model, variant).map_err(|_| invalid(key, ty, value))?;
    let mut nested = raw.clone();
    nested.remove("variant");
    let params = validate(&decls, &nested, config).map_err(|errors| SchemaError::InvalidValue {
        key: key.into(),
        expected: ty.to_string(),
        got: errors.to_string(),
    })?;
    Ok(ParamValue::Subquery(Box::new(Subquery { variant, params })))
}

/// Raw parameter value for a calendar date.
#[cfg(feature = "chrono")]
pub fn date_value(date: chrono::NaiveDate) -> JsonValue {
    use chrono::Datelike;
    JsonValue::String(format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day()))
}

/// Raw parameter value for a timestamp, to the second.
#[cfg(feature = "chrono")]
pub fn time_value(time: chrono::NaiveDateTime) -> JsonValue {
    use chrono::{Datelike, Timelike};
    JsonValue::String(format!(
        "{:04}-{:02}-{:02}-{:02}-{:02}-{:02}",
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    ))
}
