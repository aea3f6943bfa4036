//! FILENAME: grid-state/src/options.rs
//! Table Options - Per-table configuration, loadable from JSON.

use serde::{Deserialize, Serialize};
use crate::error::StateError;

/// What to do with a response to a request that is no longer the latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StaleResponsePolicy {
    /// Apply only the response to the most recently issued request.
    #[default]
    DropStale,
    /// Apply every response as it arrives; the last one to resolve wins.
    LastResolvedWins,
}

/// Query-string parameter names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlKeys {
    pub page: String,
    pub per_page: String,
    pub search: String,
    pub sort: String,
    pub filter: String,
}

impl Default for UrlKeys {
    fn default() -> Self {
        UrlKeys {
            page: "page".to_string(),
            per_page: "size".to_string(),
            search: "q".to_string(),
            sort: "sort".to_string(),
            filter: "filter".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOptions {
    /// Identity used for persisted layout keys and warnings.
    pub table_id: String,
    pub per_page: usize,
    pub page_size_options: Vec<usize>,
    pub storage_prefix: String,
    pub stale_responses: StaleResponsePolicy,
    /// Read and write visibility, order and grouping through the store.
    pub persist_layout: bool,
    pub url_keys: UrlKeys,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            table_id: "table".to_string(),
            per_page: 25,
            page_size_options: vec![10, 25, 50, 100],
            storage_prefix: "grid".to_string(),
            stale_responses: StaleResponsePolicy::default(),
            persist_layout: true,
            url_keys: UrlKeys::default(),
        }
    }
}

impl TableOptions {
    pub fn new(table_id: impl Into<String>) -> Self {
        TableOptions {
            table_id: table_id.into(),
            ..Default::default()
        }
    }

    /// Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = TableOptions::from_json(r#"{ "tableId": "orders", "perPage": 50, "urlKeys": { "search": "s" } }"#).unwrap();
        assert_eq!(options.table_id, "orders");
        assert_eq!(options.per_page, 50);
        assert_eq!(options.url_keys.search, "s");
        assert_eq!(options.url_keys.page, "page");
        assert_eq!(options.stale_responses, StaleResponsePolicy::DropStale);
        assert!(options.persist_layout);
    }

    #[test]
    fn test_policy_from_json() {
        let options = TableOptions::from_json(r#"{ "staleResponses": "lastResolvedWins" }"#).unwrap();
        assert_eq!(options.stale_responses, StaleResponsePolicy::LastResolvedWins);
        assert!(TableOptions::from_json("{ not json").is_err());
    }
}
