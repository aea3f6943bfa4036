//! FILENAME: grid-model/src/lib.rs
//! PURPOSE: Shared types for the data-grid state core.
//! CONTEXT: Every engine crate (codec, filter, layout, grouping, state)
//! speaks in these types; this crate depends on none of them.

pub mod diagnostics;
pub mod filter;
pub mod sort;
pub mod value;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use filter::{ColumnFilter, FilterKind, Operator, ValueShape};
pub use sort::{ColumnSort, GroupBy, SortDirection};
pub use value::{format_number, ScalarKind, StructuredValue, ValueMap};
