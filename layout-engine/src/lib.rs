//! FILENAME: layout-engine/src/lib.rs
//! Column layout subsystem for the data grid.
//!
//! Depends only on `grid-model` for shared types (StructuredValue,
//! ColumnFilter, sorts, diagnostics).
//!
//! Layers:
//! - `definition`: Declarative column specs (what the caller asked for)
//! - `engine`: Key assignment, visibility, collapsing, ordering, header spans
//! - `view`: Resolved columns and header rows (WHAT we display)
//! - `layout`: One pass bundled with cell value access

pub mod definition;
pub mod engine;
pub mod error;
pub mod layout;
pub mod view;

pub use definition::{ColumnSpec, FixedSide, Resolvable, RowAccess, ValueGetter};
pub use engine::{
    ancestors, build_header_rows, filter_fields, flatten, group_headers, order_columns,
    transform, AncestorChain, LayoutOptions,
};
pub use error::LayoutError;
pub use layout::ColumnLayout;
pub use view::{Column, ColumnLookup, HeaderCell, HeaderRow, HeaderTarget};
