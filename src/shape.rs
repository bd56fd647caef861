//! Uniform access to materials/products collections
//!
//! Reference data ships these collections either as a keyed object
//! (`{"0": {...}, "1": {...}}`) or as a plain list. [`Collection`] resolves
//! the shape once and hands out [`RawEntry`] values either way.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::models::TypeId;

/// Why a single raw entry was left out of a canonical list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    MissingField(&'static str),
    WrongType(&'static str),
    NonPositive(&'static str),
}

/// A materials or products collection with its shape resolved
#[derive(Debug, Clone, Copy)]
pub enum Collection<'a> {
    Mapping(&'a Map<String, Value>),
    Sequence(&'a [Value]),
    Empty,
}

impl<'a> Collection<'a> {
    /// Anything that is neither an object nor an array reads as empty.
    pub fn detect(raw: Option<&'a Value>) -> Self {
        match raw {
            Some(Value::Object(map)) if !map.is_empty() => Collection::Mapping(map),
            Some(Value::Array(items)) if !items.is_empty() => Collection::Sequence(items),
            _ => Collection::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Collection::Empty)
    }

    /// Record-like entries in native order. Malformed elements are skipped.
    pub fn entries(&self) -> Entries<'a> {
        match *self {
            Collection::Mapping(map) => Entries::Mapping(map.values()),
            Collection::Sequence(items) => Entries::Sequence(items.iter()),
            Collection::Empty => Entries::Empty,
        }
    }

    /// Record-like entries in priority order: mapping keys sorted by
    /// [`key_order`], list elements as given.
    pub fn prioritized(&self) -> Vec<RawEntry<'a>> {
        match *self {
            Collection::Mapping(map) => {
                let mut keyed: Vec<(&String, &Value)> = map.iter().collect();
                keyed.sort_by(|(a, _), (b, _)| key_order(a, b));
                keyed
                    .into_iter()
                    .filter_map(|(_, value)| RawEntry::from_value(value))
                    .collect()
            }
            _ => self.entries().collect(),
        }
    }
}

pub enum Entries<'a> {
    Mapping(serde_json::map::Values<'a>),
    Sequence(std::slice::Iter<'a, Value>),
    Empty,
}

impl<'a> Iterator for Entries<'a> {
    type Item = RawEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let value = match self {
                Entries::Mapping(values) => values.next()?,
                Entries::Sequence(items) => items.next()?,
                Entries::Empty => return None,
            };
            if let Some(entry) = RawEntry::from_value(value) {
                return Some(entry);
            }
        }
    }
}

/// Numeric keys first by value, then everything else lexicographically
pub fn key_order(a: &str, b: &str) -> Ordering {
    match (is_numeric_key(a), is_numeric_key(b)) {
        (true, true) => {
            let (x, y) = (a.trim_start_matches('0'), b.trim_start_matches('0'));
            x.len().cmp(&y.len()).then_with(|| x.cmp(y)).then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

fn is_numeric_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// One element of a collection: an object with named fields, or a
/// `[type_id, quantity, probability?]` tuple.
#[derive(Debug, Clone, Copy)]
pub enum RawEntry<'a> {
    Record(&'a Map<String, Value>),
    Tuple(&'a [Value]),
}

impl<'a> RawEntry<'a> {
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Object(record) => Some(RawEntry::Record(record)),
            Value::Array(items) if (2..=3).contains(&items.len()) => Some(RawEntry::Tuple(items)),
            _ => None,
        }
    }

    fn field(&self, names: &[&str], position: usize) -> Option<&'a Value> {
        let value = match *self {
            RawEntry::Record(record) => names.iter().find_map(|name| record.get(*name)),
            RawEntry::Tuple(items) => items.get(position),
        };
        value.filter(|value| !value.is_null())
    }

    pub fn type_id(&self) -> Result<TypeId, Skip> {
        positive(self.field(&["type_id", "typeID"], 0), "type_id")
    }

    pub fn quantity(&self) -> Result<i64, Skip> {
        positive(self.field(&["quantity"], 1), "quantity")
    }

    /// `None` when absent or unparsable
    pub fn probability(&self) -> Option<f64> {
        self.field(&["probability"], 2).and_then(float_value)
    }
}

fn positive(value: Option<&Value>, name: &'static str) -> Result<i64, Skip> {
    let value = value.ok_or(Skip::MissingField(name))?;
    let n = int_value(value).ok_or(Skip::WrongType(name))?;
    if n > 0 { Ok(n) } else { Err(Skip::NonPositive(name)) }
}

/// Integer from a JSON integer, float (truncated) or numeric string
pub fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < i64::MAX as f64).then(|| f.trunc() as i64)
}

/// Finite float from a JSON number or numeric string
pub fn float_value(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}
