//! FILENAME: grid-model/src/value.rs
//! PURPOSE: The JSON-like value model shared by every engine.
//! CONTEXT: Filter values, cell values read through column accessors, and
//! the text codec's decoded output are all `StructuredValue`s. Maps are
//! key-sorted so serialization (and anything hashed from it) is stable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered map used for the object variant.
pub type ValueMap = BTreeMap<String, StructuredValue>;

/// A scalar, an array of values, or a string-keyed map of values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<StructuredValue>),
    Map(ValueMap),
}

/// Target type when re-typing the codec's string output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    String,
    Number,
    Boolean,
}

impl StructuredValue {
    /// Builds a map value from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, StructuredValue)>,
    {
        StructuredValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array<I: IntoIterator<Item = StructuredValue>>(items: I) -> Self {
        StructuredValue::Array(items.into_iter().collect())
    }

    /// True for values the codec never writes: null and non-finite numbers.
    pub fn is_absent(&self) -> bool {
        match self {
            StructuredValue::Null => true,
            StructuredValue::Number(n) => !n.is_finite(),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StructuredValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StructuredValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StructuredValue::Number(n) => Some(*n),
            StructuredValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StructuredValue::Bool(b) => Some(*b),
            StructuredValue::String(s) => parse_bool(s),
            StructuredValue::Number(n) if *n == 0.0 => Some(false),
            StructuredValue::Number(n) if *n == 1.0 => Some(true),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[StructuredValue]> {
        match self {
            StructuredValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            StructuredValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key on a map value.
    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Resolves a dotted accessor path ("address.city", "tags.0").
    /// Returns `None` when any segment is missing.
    pub fn path(&self, accessor: &str) -> Option<&StructuredValue> {
        let mut current = self;
        for segment in accessor.split('.') {
            current = match current {
                StructuredValue::Map(map) => map.get(segment)?,
                StructuredValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Re-types string scalars (the codec's output) into `kind`.
    /// Arrays are coerced element-wise, maps are left alone, and strings
    /// that do not parse stay strings. An empty string becomes null unless
    /// the target is `String`.
    pub fn coerce(&self, kind: ScalarKind) -> StructuredValue {
        match self {
            StructuredValue::Array(items) => {
                StructuredValue::Array(items.iter().map(|v| v.coerce(kind)).collect())
            }
            StructuredValue::String(s) => match kind {
                ScalarKind::String => self.clone(),
                _ if s.is_empty() => StructuredValue::Null,
                ScalarKind::Number => match s.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => StructuredValue::Number(n),
                    _ => self.clone(),
                },
                ScalarKind::Boolean => parse_bool(s)
                    .map(StructuredValue::Bool)
                    .unwrap_or_else(|| self.clone()),
            },
            StructuredValue::Bool(b) if kind == ScalarKind::String => {
                StructuredValue::String(if *b { "1" } else { "0" }.to_string())
            }
            StructuredValue::Number(n) if kind == ScalarKind::String && n.is_finite() => {
                StructuredValue::String(format_number(*n))
            }
            _ => self.clone(),
        }
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => StructuredValue::Null,
            serde_json::Value::Bool(b) => StructuredValue::Bool(b),
            serde_json::Value::Number(n) => {
                n.as_f64().map(StructuredValue::Number).unwrap_or_default()
            }
            serde_json::Value::String(s) => StructuredValue::String(s),
            serde_json::Value::Array(items) => {
                StructuredValue::Array(items.into_iter().map(StructuredValue::from_json).collect())
            }
            serde_json::Value::Object(map) => StructuredValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, StructuredValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            StructuredValue::Null => serde_json::Value::Null,
            StructuredValue::Bool(b) => serde_json::Value::Bool(*b),
            StructuredValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            StructuredValue::String(s) => serde_json::Value::String(s.clone()),
            StructuredValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(StructuredValue::to_json).collect())
            }
            StructuredValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "1" | "true" | "TRUE" | "True" => Some(true),
        "0" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Formats a number the way the codec writes it: integral values carry no
/// fractional part.
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for StructuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuredValue::Null => Ok(()),
            StructuredValue::Bool(b) => write!(f, "{}", b),
            StructuredValue::Number(n) => write!(f, "{}", format_number(*n)),
            StructuredValue::String(s) => write!(f, "{}", s),
            StructuredValue::Array(_) | StructuredValue::Map(_) => {
                write!(f, "{}", self.to_json())
            }
        }
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<&str> for StructuredValue {
    fn from(value: &str) -> Self {
        StructuredValue::String(value.to_string())
    }
}

impl From<String> for StructuredValue {
    fn from(value: String) -> Self {
        StructuredValue::String(value)
    }
}

impl From<f64> for StructuredValue {
    fn from(value: f64) -> Self {
        StructuredValue::Number(value)
    }
}

impl From<i64> for StructuredValue {
    fn from(value: i64) -> Self {
        StructuredValue::Number(value as f64)
    }
}

impl From<i32> for StructuredValue {
    fn from(value: i32) -> Self {
        StructuredValue::Number(f64::from(value))
    }
}

impl From<bool> for StructuredValue {
    fn from(value: bool) -> Self {
        StructuredValue::Bool(value)
    }
}

impl From<Vec<StructuredValue>> for StructuredValue {
    fn from(value: Vec<StructuredValue>) -> Self {
        StructuredValue::Array(value)
    }
}

impl From<ValueMap> for StructuredValue {
    fn from(value: ValueMap) -> Self {
        StructuredValue::Map(value)
    }
}

impl<T: Into<StructuredValue>> From<Option<T>> for StructuredValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl From<serde_json::Value> for StructuredValue {
    fn from(value: serde_json::Value) -> Self {
        StructuredValue::from_json(value)
    }
}
