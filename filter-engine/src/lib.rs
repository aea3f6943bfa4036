//! FILENAME: filter-engine/src/lib.rs
//! Filter subsystem for the data grid.
//!
//! Layers:
//! - `model`: The filter tree (what the user asked for)
//! - `grammar`: Filter tree <-> codec value tree, with the shorthand form
//! - `path`: Pure edits of the tree by index path
//! - `evaluate`: Client-side matching of rows against a tree

pub mod evaluate;
pub mod grammar;
pub mod model;
pub mod path;

pub use evaluate::{item_matches, matches};
pub use grammar::{decode_filter_param, encode_filter_param, from_text, is_reserved_key, to_text};
pub use model::{
    shape_value, FilterField, FilterGroup, FilterItem, FilterNode, FilterSchema, GroupOperator,
};
pub use path::{
    get_at_path, insert_at_path, map_group_at_path, remove_at_path, replace_at_path,
    update_at_path,
};
