//! FILENAME: grouping-engine/src/key.rs
//! Row identity and group key serialization.

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use grid_model::{format_number, StructuredValue};
use layout_engine::{ColumnLayout, ColumnLookup};

// ============================================================================
// ROW KEYS
// ============================================================================

/// Identity of a row across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RowKey {
    Text(String),
    Number(i64),
    /// Position in the current row list. Not stable across refetches.
    Index(usize),
}

impl RowKey {
    /// Key from a primary-key value. Absent values fall back to `index`.
    pub fn from_value(value: Option<&StructuredValue>, index: usize) -> RowKey {
        match value {
            None | Some(StructuredValue::Null) => RowKey::Index(index),
            Some(StructuredValue::String(s)) => RowKey::Text(s.clone()),
            Some(StructuredValue::Number(n)) if !n.is_finite() => RowKey::Index(index),
            Some(StructuredValue::Number(n)) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                RowKey::Number(*n as i64)
            }
            Some(StructuredValue::Number(n)) => RowKey::Text(format_number(*n)),
            Some(other) => RowKey::Text(other.to_json().to_string()),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Text(s) => write!(f, "{}", s),
            RowKey::Number(n) => write!(f, "{}", n),
            RowKey::Index(i) => write!(f, "#{}", i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKeyStrategy {
    Identity,
    PrimaryKey,
    Positional,
}

/// How row keys are derived: a caller-supplied identity function, the
/// table's primary-key column, or the row position.
pub enum RowKeyResolver<R> {
    Identity(Arc<dyn Fn(&R) -> RowKey + Send + Sync>),
    PrimaryKey(String),
    Positional,
}

impl<R> RowKeyResolver<R> {
    pub fn identity(f: impl Fn(&R) -> RowKey + Send + Sync + 'static) -> Self {
        RowKeyResolver::Identity(Arc::new(f))
    }

    /// The layout's primary-key column, or positional keys without one.
    pub fn from_layout(layout: &ColumnLayout<R>) -> Self {
        match layout.primary_key() {
            Some(column) => RowKeyResolver::PrimaryKey(column.key.clone()),
            None => {
                log::debug!(
                    target: "GROUPING",
                    "table '{}' has no primary key column; rows are keyed by position",
                    layout.table_id
                );
                RowKeyResolver::Positional
            }
        }
    }

    pub fn strategy(&self) -> RowKeyStrategy {
        match self {
            RowKeyResolver::Identity(_) => RowKeyStrategy::Identity,
            RowKeyResolver::PrimaryKey(_) => RowKeyStrategy::PrimaryKey,
            RowKeyResolver::Positional => RowKeyStrategy::Positional,
        }
    }

    pub fn key<L>(&self, row: &R, index: usize, lookup: &L) -> RowKey
    where
        L: ColumnLookup<R> + ?Sized,
    {
        match self {
            RowKeyResolver::Identity(f) => f(row),
            RowKeyResolver::PrimaryKey(column) => {
                RowKey::from_value(lookup.cell_value(column, row).as_ref(), index)
            }
            RowKeyResolver::Positional => RowKey::Index(index),
        }
    }
}

impl<R> Clone for RowKeyResolver<R> {
    fn clone(&self) -> Self {
        match self {
            RowKeyResolver::Identity(f) => RowKeyResolver::Identity(Arc::clone(f)),
            RowKeyResolver::PrimaryKey(column) => RowKeyResolver::PrimaryKey(column.clone()),
            RowKeyResolver::Positional => RowKeyResolver::Positional,
        }
    }
}

impl<R> fmt::Debug for RowKeyResolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKeyResolver::Identity(_) => f.write_str("Identity(..)"),
            RowKeyResolver::PrimaryKey(column) => f.debug_tuple("PrimaryKey").field(column).finish(),
            RowKeyResolver::Positional => f.write_str("Positional"),
        }
    }
}

// ============================================================================
// GROUP KEYS
// ============================================================================

/// Separator between key parts. JSON text never contains a raw U+0001.
pub const KEY_SEPARATOR: char = '\u{1}';

/// Stand-in for a missing value. Not valid JSON, so it cannot collide with
/// the serialization of any present value (including `null`).
pub const MISSING_VALUE: &str = "undefined";

/// One `(column, value)` part of a group key.
pub fn key_part(column: &str, value: Option<&StructuredValue>) -> String {
    let column = serde_json::Value::String(column.to_string()).to_string();
    let value = value.map_or_else(|| MISSING_VALUE.to_string(), |v| v.to_json().to_string());
    format!("{column}{KEY_SEPARATOR}{value}")
}

/// The key of a group: every ancestor's part plus its own, root first.
pub fn composite_key<'v, I>(parts: I) -> String
where
    I: IntoIterator<Item = (&'v str, Option<&'v StructuredValue>)>,
{
    let mut key = String::new();
    for (index, (column, value)) in parts.into_iter().enumerate() {
        if index > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(&key_part(column, value));
    }
    key
}

/// Extends a parent group's key with one more part.
pub fn group_key(parent: Option<&str>, column: &str, value: Option<&StructuredValue>) -> String {
    let part = key_part(column, value);
    match parent {
        Some(parent) => format!("{parent}{KEY_SEPARATOR}{part}"),
        None => part,
    }
}
