//! FILENAME: grid-state/src/snapshot.rs
//! Table State - The serializable snapshot behind get/set state.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use filter_engine::FilterGroup;
use grid_model::{ColumnSort, GroupBy};

/// User-owned column layout. Empty collections mean "no preference".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnConfig {
    #[serde(default)]
    pub column_order: Vec<String>,
    #[serde(default)]
    pub visibility: BTreeMap<String, bool>,
    #[serde(default)]
    pub group_by: Vec<GroupBy>,
}

impl ColumnConfig {
    pub fn is_empty(&self) -> bool {
        self.column_order.is_empty() && self.visibility.is_empty() && self.group_by.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableState {
    #[serde(default)]
    pub filter: FilterGroup,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub sort: Vec<ColumnSort>,
    #[serde(default)]
    pub column_config: ColumnConfig,
}

impl TableState {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter_engine::FilterItem;
    use grid_model::{Operator, SortDirection};

    #[test]
    fn test_snapshot_survives_json() {
        let state = TableState {
            filter: FilterGroup::and(vec![FilterItem::new("id", Operator::Equals, 5).into()]),
            query: "bob".to_string(),
            sort: vec![ColumnSort::new("name", SortDirection::Desc)],
            column_config: ColumnConfig {
                column_order: vec!["name".to_string(), "id".to_string()],
                visibility: BTreeMap::from([("id".to_string(), false)]),
                group_by: vec![GroupBy::new("name", SortDirection::Asc)],
            },
        };
        let back = TableState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_missing_fields_default() {
        let state = TableState::from_json(r#"{ "query": "x" }"#).unwrap();
        assert_eq!(state.query, "x");
        assert!(state.filter.is_empty());
        assert!(state.column_config.is_empty());
    }
}
