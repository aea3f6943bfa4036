//! FILENAME: layout-engine/src/layout.rs
//! Column Layout - The full result of one layout pass.
//!
//! Bundles the hierarchical columns, the ordered leaves, the group header
//! list and the header grid, plus how to read each leaf's cell value.
//! Hosts keep a `ColumnLayout` behind an `Arc` and rebuild it only when
//! the pass inputs change.

use std::collections::BTreeMap;
use std::fmt;
use rustc_hash::FxHashMap;
use grid_model::{ColumnFilter, Diagnostics, StructuredValue};
use crate::definition::{ColumnSpec, RowAccess};
use crate::engine::{
    assemble_header_rows, filter_fields, flatten, group_headers, order_columns, resolve,
    CellSource, LayoutOptions, Resolved,
};
use crate::error::LayoutError;
use crate::view::{Column, ColumnLookup, HeaderRow};

pub struct ColumnLayout<R> {
    pub table_id: String,
    /// Hierarchical columns (merged groups keep their children).
    pub columns: Vec<Column>,
    /// Every leaf, hidden ones included, in display order.
    pub leaves: Vec<Column>,
    /// Merged group headers; `Column::parent` indexes into this list.
    pub groups: Vec<Column>,
    pub header_rows: Vec<HeaderRow>,
    leaf_index: FxHashMap<String, usize>,
    group_index: FxHashMap<String, usize>,
    sources: FxHashMap<String, CellSource<R>>,
}

impl<R> ColumnLayout<R> {
    pub fn build(
        specs: &[ColumnSpec<R>],
        options: &LayoutOptions<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, LayoutError> {
        let Resolved { mut columns, sources } = resolve(specs, options, diagnostics)?;

        let groups = group_headers(&columns);
        let mut leaves = order_columns(&flatten(&columns), options.column_order);
        let header_rows = assemble_header_rows(&leaves, &groups);

        let depth = header_rows.len();
        for leaf in leaves.iter_mut().filter(|leaf| leaf.is_visible) {
            leaf.row_span = depth.saturating_sub(leaf.depth) as u16;
        }
        let spans: FxHashMap<&str, u16> = leaves
            .iter()
            .map(|leaf| (leaf.key.as_str(), leaf.row_span))
            .collect();
        copy_row_spans(&mut columns, &spans);

        let leaf_index = leaves
            .iter()
            .enumerate()
            .map(|(index, leaf)| (leaf.key.clone(), index))
            .collect();
        let group_index = groups
            .iter()
            .enumerate()
            .map(|(index, group)| (group.key.clone(), index))
            .collect();

        Ok(ColumnLayout {
            table_id: options.table_id.to_string(),
            columns,
            leaves,
            groups,
            header_rows,
            leaf_index,
            group_index,
            sources,
        })
    }

    /// A leaf or group header by key.
    pub fn column(&self, key: &str) -> Option<&Column> {
        if let Some(&index) = self.leaf_index.get(key) {
            return self.leaves.get(index);
        }
        self.group_index.get(key).and_then(|&index| self.groups.get(index))
    }

    pub fn visible_leaves(&self) -> impl Iterator<Item = &Column> {
        self.leaves.iter().filter(|leaf| leaf.is_visible)
    }

    /// Visible leaves that render as value cells (grouped columns excluded).
    pub fn value_columns(&self) -> impl Iterator<Item = &Column> {
        self.visible_leaves().filter(|leaf| !leaf.is_grouped)
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.leaves.iter().find(|leaf| leaf.primary_key)
    }

    pub fn filter_fields(&self) -> Vec<(String, ColumnFilter)> {
        filter_fields(&self.leaves)
    }

    /// Number of header rows.
    pub fn depth(&self) -> usize {
        self.header_rows.len()
    }

    /// Current visibility of every toggleable leaf, in the shape the
    /// visibility preference store expects.
    pub fn visibility(&self) -> BTreeMap<String, bool> {
        self.leaves
            .iter()
            .filter(|leaf| leaf.enabled && leaf.can_toggle_visibility)
            .map(|leaf| (leaf.key.clone(), leaf.is_visible))
            .collect()
    }

    /// Leaf keys in display order.
    pub fn leaf_order(&self) -> Vec<String> {
        self.leaves.iter().map(|leaf| leaf.key.clone()).collect()
    }
}

impl<R: RowAccess> ColumnLookup<R> for ColumnLayout<R> {
    fn column(&self, key: &str) -> Option<&Column> {
        ColumnLayout::column(self, key)
    }

    fn cell_value(&self, key: &str, row: &R) -> Option<StructuredValue> {
        self.sources.get(key).and_then(|source| source.read(row))
    }
}

impl<R> fmt::Debug for ColumnLayout<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnLayout")
            .field("table_id", &self.table_id)
            .field("leaves", &self.leaf_order())
            .field("groups", &self.groups.len())
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

/// Mirrors the leaf row spans into the hierarchical column tree.
fn copy_row_spans(columns: &mut [Column], spans: &FxHashMap<&str, u16>) {
    for column in columns {
        match &mut column.columns {
            Some(children) => copy_row_spans(children, spans),
            None => {
                if let Some(&span) = spans.get(column.key.as_str()) {
                    column.row_span = span;
                }
            }
        }
    }
}
