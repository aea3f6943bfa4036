//! FILENAME: layout-engine/src/view.rs
//! Column View - Resolved columns and the header grid.
//!
//! Everything here is plain data: comparable by value and serializable,
//! so a renderer can diff it and a host can ship it across a bridge.

use serde::{Deserialize, Serialize};
use grid_model::{ColumnFilter, SortDirection, StructuredValue};
use crate::definition::FixedSide;

// ============================================================================
// RESOLVED COLUMN
// ============================================================================

/// A column after one layout pass. Group headers that stay merged carry
/// their children in `columns`; leaves have `columns == None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Unique within the table.
    pub key: String,
    pub accessor: Option<String>,
    pub header: String,
    pub fixed: FixedSide,
    pub sortable: bool,
    pub default_sort_dir: SortDirection,
    pub enabled: bool,
    pub can_toggle_visibility: bool,
    pub filter: Option<ColumnFilter>,
    pub editor: Option<StructuredValue>,
    pub primary_key: bool,
    pub is_visible: bool,
    pub col_span: u16,
    pub row_span: u16,
    /// Position in the active sort list.
    pub sort_index: Option<usize>,
    pub sort_direction: Option<SortDirection>,
    pub is_grouped: bool,
    /// Index of the enclosing group header in the pass's group list.
    pub parent: Option<usize>,
    /// Number of group headers above this column.
    pub depth: usize,
    pub columns: Option<Vec<Column>>,
}

impl Column {
    pub fn is_leaf(&self) -> bool {
        self.columns.is_none()
    }

    /// Visible leaves at or below this column.
    pub fn visible_leaf_count(&self) -> usize {
        match &self.columns {
            None => usize::from(self.is_visible),
            Some(children) => children.iter().map(Column::visible_leaf_count).sum(),
        }
    }
}

// ============================================================================
// HEADER GRID
// ============================================================================

/// What a header cell stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum HeaderTarget {
    /// Index into the layout's ordered leaves.
    Leaf(usize),
    /// Index into the layout's group headers.
    Group(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCell {
    pub key: String,
    pub header: String,
    pub target: HeaderTarget,
    pub fixed: FixedSide,
    pub col_span: u16,
    pub row_span: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderRow {
    pub cells: Vec<HeaderCell>,
}

impl HeaderRow {
    /// Grid columns covered by cells that start in this row.
    pub fn width(&self) -> usize {
        self.cells.iter().map(|c| c.col_span as usize).sum()
    }
}

// ============================================================================
// LOOKUP
// ============================================================================

/// Column access for consumers that only need keys and cell values
/// (grouping, sorting, client-side filtering).
pub trait ColumnLookup<R> {
    fn column(&self, key: &str) -> Option<&Column>;

    /// The cell value of `row` under column `key`. `None` for unknown keys
    /// and for accessor paths the row does not have.
    fn cell_value(&self, key: &str, row: &R) -> Option<StructuredValue>;
}
