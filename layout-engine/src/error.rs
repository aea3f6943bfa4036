//! FILENAME: layout-engine/src/error.rs

use thiserror::Error;

/// Misconfigured column specs. These are programmer errors and stop the
/// layout pass; data conditions never end up here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Column '{key}' in table '{table_id}' has no accessor, value getter or child columns")]
    MissingAccessor { table_id: String, key: String },

    #[error("Column group '{key}' in table '{table_id}' has an empty child list")]
    EmptyGroup { table_id: String, key: String },
}
