//! Core data types for query execution.
//!
//! This module contains the two types every pipeline stage operates on:
//! - [`FieldValue`] - the closed value sum type records are made of
//! - [`Record`] - the generic row flowing through filter/join/aggregation

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// A value in a record field.
///
/// The engine's comparison and formatting rules are written against this
/// closed set, so adding a variant forces every coercion site to be revisited.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Ordered list of values
    Array(Vec<FieldValue>),
    /// String-keyed map of values (labels, selectors, annotations)
    Map(HashMap<String, FieldValue>),
    /// Absent / null
    Null,
}

impl FieldValue {
    /// True for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric coercion used by ordering comparisons and SUM/AVG/MIN/MAX.
    ///
    /// Integers and floats convert directly; strings are parsed. Everything
    /// else (booleans, lists, maps, null) is non-numeric and returns `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Convert a JSON document value into a field value.
    ///
    /// Numbers become `Integer` when they are whole, `Float` otherwise, so
    /// restart counts and replica numbers compare as integers.
    pub fn from_json(value: serde_json::Value) -> FieldValue {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Integer(i)
                } else {
                    FieldValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from_json).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// String coercion used by equality/LIKE/IN comparisons, DISTINCT keys,
/// group keys, and join keys. Numeric and textual values compare uniformly
/// through this rendering.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, ""),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            FieldValue::Map(map) => {
                // Sort keys so the rendering is deterministic
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", k, map[*k])?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Integer(i) => serializer.serialize_i64(*i),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for v in arr {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            FieldValue::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

/// A generic row: field name to value.
///
/// Column order for output is carried separately by the engine's column
/// list, so the map itself is unordered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub fields: HashMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Record {
            fields: HashMap::new(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    /// Plain lookup by exact key.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Field lookup supporting the reference forms used in joined and nested
    /// rows, tried in order:
    ///
    /// 1. exact key match (includes prefixed keys like `pod.name`)
    /// 2. `alias.field` - the first two dotted segments as a stored key,
    ///    with an optional third segment reaching into a map value
    /// 3. `field.subkey` - the first segment as a stored map, indexed by the
    ///    remainder (e.g. `labels.app`)
    ///
    /// Returns [`FieldValue::Null`] when nothing resolves, so callers can
    /// treat missing and null fields uniformly.
    pub fn resolve(&self, field: &str) -> FieldValue {
        if let Some(value) = self.fields.get(field) {
            return value.clone();
        }

        let parts: Vec<&str> = field.splitn(3, '.').collect();
        if parts.len() >= 2 {
            // "alias.field" stored key, optionally reaching into a map value
            let key = format!("{}.{}", parts[0], parts[1]);
            if let Some(value) = self.fields.get(&key) {
                if parts.len() == 3 {
                    if let FieldValue::Map(map) = value {
                        return map.get(parts[2]).cloned().unwrap_or(FieldValue::Null);
                    }
                }
                return value.clone();
            }

            // "field.subkey" into a map-typed field
            if let Some(FieldValue::Map(map)) = self.fields.get(parts[0]) {
                let sub = field[parts[0].len() + 1..].to_string();
                return map.get(&sub).cloned().unwrap_or(FieldValue::Null);
            }
        }

        FieldValue::Null
    }

    /// Merge two rows; `right` wins field-name collisions.
    pub fn merged(left: &Record, right: &Record) -> Record {
        let mut fields = HashMap::with_capacity(left.fields.len() + right.fields.len());
        for (k, v) in &left.fields {
            fields.insert(k.clone(), v.clone());
        }
        for (k, v) in &right.fields {
            fields.insert(k.clone(), v.clone());
        }
        Record { fields }
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut out = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            out.serialize_entry(k, v)?;
        }
        out.end()
    }
}

impl From<HashMap<String, FieldValue>> for Record {
    fn from(fields: HashMap<String, FieldValue>) -> Self {
        Record { fields }
    }
}
