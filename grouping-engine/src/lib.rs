//! FILENAME: grouping-engine/src/lib.rs
//! Row grouping subsystem for the data grid.
//!
//! Depends on `layout-engine` only for column lookups (keys and cell
//! values) and on `grid-model` for shared types.
//!
//! Layers:
//! - `key`: Row identity and collision-free group keys
//! - `tree`: Building the nested group tree in first-seen order
//! - `expand`: Expand/collapse state and the resulting display lines

pub mod expand;
pub mod key;
pub mod tree;

pub use expand::{visible_lines, DisplayLine, ExpandedGroups};
pub use key::{
    composite_key, group_key, key_part, RowKey, RowKeyResolver, RowKeyStrategy, KEY_SEPARATOR,
    MISSING_VALUE,
};
pub use tree::{
    build_groups, index_groups, GroupChildren, GroupIndex, GroupNode, Grouped, RowRef, RowSlot,
};
