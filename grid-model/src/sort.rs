//! FILENAME: grid-model/src/sort.rs
//! Sort and group-by descriptors.

use serde::{Deserialize, Serialize};

/// Direction of a sort or of a group-by level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Parses "asc"/"desc" (case-insensitive).
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// One entry of the active sort list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSort {
    pub column: String,
    pub direction: SortDirection,
}

impl ColumnSort {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        ColumnSort {
            column: column.into(),
            direction,
        }
    }
}

/// One level of row grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupBy {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl GroupBy {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        GroupBy {
            column: column.into(),
            direction,
        }
    }
}
