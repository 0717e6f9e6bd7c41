//! Validated parameter values.

use crate::variant::Variant;
use compact_str::CompactString;
use mycoquery_core::{Id, Value};
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::collections::BTreeMap;

/// A parameter value after validation.
///
/// Object references keep whatever the caller gave (an id or a name) so the
/// canonical key never depends on database contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A blank slot inside a positional array such as a `[min, max]` range.
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(CompactString),
    Array(Vec<ParamValue>),
    Subquery(Box<Subquery>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// Elements of an array value; a scalar is a one-element slice.
    pub fn elements(&self) -> &[ParamValue] {
        match self {
            ParamValue::Array(items) => items,
            ParamValue::Null => &[],
            other => std::slice::from_ref(other),
        }
    }

    /// Plain-text rendering for title arguments.
    pub fn display(&self) -> String {
        match self {
            ParamValue::Null => String::new(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Integer(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Text(s) => s.to_string(),
            ParamValue::Array(items) => items
                .iter()
                .map(ParamValue::display)
                .collect::<Vec<_>>()
                .join(", "),
            ParamValue::Subquery(sub) => sub.variant.name().to_owned(),
        }
    }
}

impl From<&ParamValue> for Value {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Bool(b) => Value::from(*b),
            ParamValue::Integer(i) => Value::Integer(*i),
            ParamValue::Float(f) => Value::Real(*f),
            ParamValue::Text(s) => Value::Text(s.to_string()),
            ParamValue::Null | ParamValue::Array(_) | ParamValue::Subquery(_) => Value::Null,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Vec<Id>> for ParamValue {
    fn from(ids: Vec<Id>) -> Self {
        ParamValue::Array(ids.into_iter().map(ParamValue::Integer).collect())
    }
}

/// A nested query descriptor: the variant plus its own validated parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub variant: Variant,
    pub params: Params,
}

impl Serialize for Subquery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.len() + 1))?;
        let mut variant_written = false;
        for (key, value) in self.params.iter() {
            if !variant_written && key > "variant" {
                map.serialize_entry("variant", self.variant.name())?;
                variant_written = true;
            }
            map.serialize_entry(key, value)?;
        }
        if !variant_written {
            map.serialize_entry("variant", self.variant.name())?;
        }
        map.end()
    }
}

/// Validated parameters keyed by name, always iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<CompactString, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<CompactString>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|k, _| keep(k));
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ParamValue::as_i64)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ParamValue::as_f64)
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ParamValue::as_bool)
    }

    /// Array elements (a missing key is an empty slice).
    pub fn array(&self, key: &str) -> &[ParamValue] {
        self.get(key).map_or(&[] as &[ParamValue], ParamValue::elements)
    }

    /// Text elements of an array parameter, skipping blanks.
    pub fn strings(&self, key: &str) -> Vec<&str> {
        self.array(key).iter().filter_map(ParamValue::as_str).collect()
    }

    /// Element `index` of a positional array, `None` when blank or absent.
    pub fn slot(&self, key: &str, index: usize) -> Option<&ParamValue> {
        self.array(key).get(index).filter(|v| !v.is_null())
    }

    pub fn subquery(&self, key: &str) -> Option<&Subquery> {
        match self.get(key) {
            Some(ParamValue::Subquery(sub)) => Some(sub),
            _ => None,
        }
    }
}

impl FromIterator<(CompactString, ParamValue)> for Params {
    fn from_iter<T: IntoIterator<Item = (CompactString, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_sorted() {
        let mut params = Params::new();
        params.insert("user", 5i64);
        params.insert("has_images", true);
        params.insert("date", ParamValue::Array(vec![ParamValue::Null, "2020".into()]));
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"date":[null,"2020"],"has_images":true,"user":5}"#
        );
    }

    #[test]
    fn test_subquery_injects_variant_in_order() {
        let mut params = Params::new();
        params.insert("user", 1i64);
        params.insert("by", "date");
        let sub = Subquery {
            variant: Variant::ByUser,
            params,
        };
        assert_eq!(
            serde_json::to_string(&sub).unwrap(),
            r#"{"by":"date","user":1,"variant":"by_user"}"#
        );
    }

    #[test]
    fn test_slot_skips_blank() {
        let mut params = Params::new();
        params.insert("date", ParamValue::Array(vec![ParamValue::Null, "2020".into()]));
        assert_eq!(params.slot("date", 0), None);
        assert_eq!(params.slot("date", 1).and_then(ParamValue::as_str), Some("2020"));
        assert_eq!(params.slot("missing", 0), None);
    }
}
