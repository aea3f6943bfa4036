//! FILENAME: grouping-engine/src/tree.rs
//! Group Tree - Nests already-fetched rows under their group-by values.
//!
//! Siblings appear in the order their first row appeared, never sorted;
//! rows inside a group keep their original order. Sibling lookup goes
//! through a hash index keyed by the composite group key, so placement is
//! O(rows x depth) while first-seen order is preserved.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use grid_model::{GroupBy, StructuredValue};
use layout_engine::ColumnLookup;
use crate::key::{group_key, RowKey, RowKeyResolver, KEY_SEPARATOR};

// ============================================================================
// TREE TYPES
// ============================================================================

/// Identity and position of a row, without a borrow of the row itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowSlot {
    pub key: RowKey,
    /// Position in the input rows.
    pub row_index: usize,
}

/// A row placed in the display, borrowed from the fetched page.
#[derive(Debug, PartialEq)]
pub struct RowRef<'r, R> {
    pub key: RowKey,
    /// Position in the input rows.
    pub row_index: usize,
    pub row: &'r R,
}

impl<'r, R> Clone for RowRef<'r, R> {
    fn clone(&self) -> Self {
        RowRef {
            key: self.key.clone(),
            row_index: self.row_index,
            row: self.row,
        }
    }
}

/// Children of a group node. `T` is the row handle: `RowSlot` in a
/// [`GroupIndex`], `RowRef` once attached to the rows.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupChildren<T> {
    Groups(Vec<GroupNode<T>>),
    Rows(Vec<T>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode<T> {
    /// Composite of every (column, value) pair from the root down.
    pub key: String,
    /// 1 for top-level groups.
    pub level: usize,
    pub column: String,
    pub value: StructuredValue,
    pub children: GroupChildren<T>,
    pub first_row: T,
    /// Rows at any depth below this node.
    pub row_count: usize,
}

impl<T> GroupNode<T> {
    /// All rows below this node in display order.
    pub fn rows(&self) -> Vec<&T> {
        let mut out = Vec::with_capacity(self.row_count);
        self.collect_rows(&mut out);
        out
    }

    fn collect_rows<'a>(&'a self, out: &mut Vec<&'a T>) {
        match &self.children {
            GroupChildren::Rows(rows) => out.extend(rows.iter()),
            GroupChildren::Groups(groups) => {
                for group in groups {
                    group.collect_rows(out);
                }
            }
        }
    }

    pub fn subgroups(&self) -> &[GroupNode<T>] {
        match &self.children {
            GroupChildren::Groups(groups) => groups,
            GroupChildren::Rows(_) => &[],
        }
    }

    fn map_rows<U>(&self, f: &impl Fn(&T) -> U) -> GroupNode<U> {
        GroupNode {
            key: self.key.clone(),
            level: self.level,
            column: self.column.clone(),
            value: self.value.clone(),
            children: match &self.children {
                GroupChildren::Groups(groups) => {
                    GroupChildren::Groups(groups.iter().map(|g| g.map_rows(f)).collect())
                }
                GroupChildren::Rows(rows) => GroupChildren::Rows(rows.iter().map(f).collect()),
            },
            first_row: f(&self.first_row),
            row_count: self.row_count,
        }
    }
}

/// Result of grouping: flat rows when nothing is grouped.
#[derive(Debug, Clone, PartialEq)]
pub enum Grouped<T> {
    Flat(Vec<T>),
    Groups(Vec<GroupNode<T>>),
}

/// Group tree over row positions. Owns no rows, so it can be kept across
/// calls and attached to the rows it was built from.
pub type GroupIndex = Grouped<RowSlot>;

impl<T> Grouped<T> {
    pub fn is_grouped(&self) -> bool {
        matches!(self, Grouped::Groups(_))
    }

    pub fn row_count(&self) -> usize {
        match self {
            Grouped::Flat(rows) => rows.len(),
            Grouped::Groups(groups) => groups.iter().map(|g| g.row_count).sum(),
        }
    }

    /// Looks a group up by its composite key.
    pub fn find(&self, key: &str) -> Option<&GroupNode<T>> {
        let Grouped::Groups(groups) = self else {
            return None;
        };
        let mut siblings = groups.as_slice();
        loop {
            let node = siblings.iter().find(|g| key == g.key || is_descendant_key(key, &g.key))?;
            if node.key == key {
                return Some(node);
            }
            siblings = node.subgroups();
        }
    }

    /// Same tree shape with every row handle converted by `f`.
    pub fn map_rows<U>(&self, f: impl Fn(&T) -> U) -> Grouped<U> {
        match self {
            Grouped::Flat(rows) => Grouped::Flat(rows.iter().map(&f).collect()),
            Grouped::Groups(groups) => Grouped::Groups(groups.iter().map(|g| g.map_rows(&f)).collect()),
        }
    }
}

impl GroupIndex {
    /// Resolves every slot against `rows`. No cell values are read.
    ///
    /// # Panics
    ///
    /// If `rows` is shorter than the rows the index was built from.
    pub fn attach<'r, R>(&self, rows: &'r [R]) -> Grouped<RowRef<'r, R>> {
        self.map_rows(|slot| RowRef {
            key: slot.key.clone(),
            row_index: slot.row_index,
            row: &rows[slot.row_index],
        })
    }
}

fn is_descendant_key(key: &str, ancestor: &str) -> bool {
    key.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with(KEY_SEPARATOR))
}

// ============================================================================
// BUILD
// ============================================================================

/// Groups `rows` by `group_by` and borrows the rows into the result.
pub fn build_groups<'r, R, L>(
    rows: &'r [R],
    group_by: &[GroupBy],
    lookup: &L,
    keys: &RowKeyResolver<R>,
) -> Grouped<RowRef<'r, R>>
where
    L: ColumnLookup<R> + ?Sized,
{
    index_groups(rows, group_by, lookup, keys).attach(rows)
}

/// Groups `rows` by `group_by`, reading values through `lookup`.
///
/// Group-by entries naming a column `lookup` does not know are skipped,
/// so a stale persisted grouping degrades to fewer levels.
pub fn index_groups<R, L>(
    rows: &[R],
    group_by: &[GroupBy],
    lookup: &L,
    keys: &RowKeyResolver<R>,
) -> GroupIndex
where
    L: ColumnLookup<R> + ?Sized,
{
    // Group depth is rarely more than a few levels.
    let columns: SmallVec<[&str; 4]> = group_by
        .iter()
        .map(|g| g.column.as_str())
        .filter(|column| {
            let known = lookup.column(column).is_some();
            if !known {
                log::debug!(target: "GROUPING", "group-by column '{}' is not in the layout; skipped", column);
            }
            known
        })
        .collect();

    let slots = rows.iter().enumerate().map(|(row_index, row)| {
        let slot = RowSlot {
            key: keys.key(row, row_index, lookup),
            row_index,
        };
        (slot, row)
    });

    if columns.is_empty() {
        return Grouped::Flat(slots.map(|(slot, _)| slot).collect());
    }

    let depth = columns.len();
    let mut roots: Vec<GroupNode<RowSlot>> = Vec::new();
    // Composite key -> position among its siblings.
    let mut positions: FxHashMap<String, usize> = FxHashMap::default();

    for (slot, row) in slots {
        let mut siblings = &mut roots;
        let mut parent_key: Option<String> = None;

        for (offset, column) in columns.iter().enumerate() {
            let level = offset + 1;
            let value = lookup.cell_value(column, row);
            let key = group_key(parent_key.as_deref(), column, value.as_ref());

            let position = match positions.get(&key) {
                Some(&position) => position,
                None => {
                    siblings.push(GroupNode {
                        key: key.clone(),
                        level,
                        column: column.to_string(),
                        value: value.unwrap_or_default(),
                        children: if level == depth {
                            GroupChildren::Rows(Vec::new())
                        } else {
                            GroupChildren::Groups(Vec::new())
                        },
                        first_row: slot.clone(),
                        row_count: 0,
                    });
                    positions.insert(key.clone(), siblings.len() - 1);
                    siblings.len() - 1
                }
            };

            let node = &mut siblings[position];
            node.row_count += 1;
            match &mut node.children {
                GroupChildren::Rows(members) => {
                    members.push(slot.clone());
                    break;
                }
                GroupChildren::Groups(groups) => siblings = groups,
            }
            parent_key = Some(key);
        }
    }

    log::debug!(
        target: "GROUPING",
        "grouped {} rows by {} column(s) into {} top-level groups",
        rows.len(),
        depth,
        roots.len()
    );

    Grouped::Groups(roots)
}
