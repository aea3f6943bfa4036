//! FILENAME: codec/src/encode.rs
//! PURPOSE: StructuredValue -> encoded text.
//!
//! GRAMMAR (written form):
//!   document := pair ("&" pair)*
//!   pair     := key "=" value
//!   value    := item ("," item)*
//!   item     := scalar | object
//!   object   := "(" entry (";" entry)* ")"
//!   entry    := key ":" value
//!
//! Absent values (null, NaN) are omitted when they sit under a key and
//! written as an empty item when they sit inside an array.

use grid_model::{format_number, StructuredValue, ValueMap};
use crate::escape::escape;

/// Encodes a value as a document. Maps become `key=value` pairs; any other
/// value is written as a bare value.
pub fn stringify(value: &StructuredValue) -> String {
    match value {
        StructuredValue::Map(map) => map
            .iter()
            .filter_map(|(key, v)| encode_value(v).map(|e| format!("{}={}", escape(key), e)))
            .collect::<Vec<_>>()
            .join("&"),
        other => stringify_value(other),
    }
}

/// Encodes a single value (the right-hand side of a pair).
pub fn stringify_value(value: &StructuredValue) -> String {
    encode_value(value).unwrap_or_default()
}

/// `None` means the value must be left out entirely.
fn encode_value(value: &StructuredValue) -> Option<String> {
    if value.is_absent() {
        return None;
    }
    match value {
        StructuredValue::Array(items) if items.is_empty() => None,
        StructuredValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                push_items(item, &mut out);
            }
            Some(out.join(","))
        }
        other => Some(encode_item(other)),
    }
}

/// Nested arrays have no production of their own, so they are flattened
/// into the enclosing array.
fn push_items(value: &StructuredValue, out: &mut Vec<String>) {
    match value {
        StructuredValue::Array(items) if items.is_empty() => out.push(String::new()),
        StructuredValue::Array(items) => {
            for item in items {
                push_items(item, out);
            }
        }
        v if v.is_absent() => out.push(String::new()),
        v => out.push(encode_item(v)),
    }
}

fn encode_item(value: &StructuredValue) -> String {
    match value {
        StructuredValue::Bool(true) => "1".to_string(),
        StructuredValue::Bool(false) => "0".to_string(),
        StructuredValue::Number(n) => escape(&format_number(*n)),
        StructuredValue::String(s) => escape(s),
        StructuredValue::Map(map) => encode_object(map),
        StructuredValue::Null | StructuredValue::Array(_) => String::new(),
    }
}

fn encode_object(map: &ValueMap) -> String {
    let entries: Vec<String> = map
        .iter()
        .filter_map(|(key, v)| encode_value(v).map(|e| format!("{}:{}", escape(key), e)))
        .collect();
    format!("({})", entries.join(";"))
}
