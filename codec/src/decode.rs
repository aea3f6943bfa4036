//! FILENAME: codec/src/decode.rs
//! PURPOSE: Encoded text -> StructuredValue.
//! CONTEXT: Decoding is type-agnostic: every scalar comes back as a
//! string and callers re-type with `StructuredValue::coerce`. Nothing here
//! fails; fragments that do not fit the grammar (unbalanced parentheses,
//! an entry without ':') are kept as raw strings, since the text may come
//! from a hand-edited or stale URL.

use grid_model::{StructuredValue, ValueMap};
use crate::escape::unescape;
use crate::scanner::{enclosed, find_top_level, split_top_level};

/// Decodes a document into a map. A leading '?' is ignored, empty pairs
/// are skipped, a pair without '=' maps its key to the empty string and a
/// repeated key keeps its last value.
pub fn parse(text: &str) -> StructuredValue {
    let mut map = ValueMap::new();
    let text = text.strip_prefix('?').unwrap_or(text);

    for pair in text.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        map.insert(unescape(key), parse_value(value));
    }

    StructuredValue::Map(map)
}

/// Decodes a single value: one item is a scalar or object, two or more
/// comma-separated items are an array.
pub fn parse_value(text: &str) -> StructuredValue {
    let items = split_top_level(text, ',');
    if items.len() == 1 {
        parse_item(items[0])
    } else {
        StructuredValue::Array(items.into_iter().map(parse_item).collect())
    }
}

fn parse_item(text: &str) -> StructuredValue {
    match parse_object(text) {
        Some(map) => StructuredValue::Map(map),
        None => {
            if text.starts_with('(') {
                log::debug!(target: "CODEC", "treating malformed object as text: {}", text);
            }
            StructuredValue::String(unescape(text))
        }
    }
}

fn parse_object(text: &str) -> Option<ValueMap> {
    let inner = enclosed(text)?;
    let mut map = ValueMap::new();
    if inner.is_empty() {
        return Some(map);
    }

    for entry in split_top_level(inner, ';') {
        let colon = find_top_level(entry, ':')?;
        let key = &entry[..colon];
        let value = &entry[colon + 1..];
        map.insert(unescape(key), parse_value(value));
    }

    Some(map)
}
