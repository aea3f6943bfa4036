//! FILENAME: layout-engine/src/definition.rs
//! Column Definition - The declarative column specs supplied by the caller.
//!
//! Specs are immutable inputs to a layout pass. Scalar settings may be a
//! literal or a producer; producers are called once per pass through
//! `Resolvable::resolve`, never per row.

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use grid_model::{ColumnFilter, SortDirection, StructuredValue};

// ============================================================================
// RESOLVABLE SETTINGS
// ============================================================================

/// A setting given either as a value or as a zero-argument producer.
pub enum Resolvable<T> {
    Literal(T),
    Provider(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Clone> Resolvable<T> {
    pub fn provider(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Resolvable::Provider(Arc::new(f))
    }

    pub fn resolve(&self) -> T {
        match self {
            Resolvable::Literal(value) => value.clone(),
            Resolvable::Provider(f) => f(),
        }
    }
}

impl<T: Clone> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        match self {
            Resolvable::Literal(value) => Resolvable::Literal(value.clone()),
            Resolvable::Provider(f) => Resolvable::Provider(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolvable::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Resolvable::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl<T> From<T> for Resolvable<T> {
    fn from(value: T) -> Self {
        Resolvable::Literal(value)
    }
}

impl From<&str> for Resolvable<String> {
    fn from(value: &str) -> Self {
        Resolvable::Literal(value.to_string())
    }
}

// ============================================================================
// ROW ACCESS
// ============================================================================

/// Reads a value out of a row by accessor path. `None` means the path
/// does not exist, which is not the same as a present null.
pub trait RowAccess {
    fn field(&self, accessor: &str) -> Option<StructuredValue>;
}

impl RowAccess for StructuredValue {
    fn field(&self, accessor: &str) -> Option<StructuredValue> {
        self.path(accessor).cloned()
    }
}

/// Computes a cell value from a whole row.
pub type ValueGetter<R> = Arc<dyn Fn(&R) -> StructuredValue + Send + Sync>;

// ============================================================================
// COLUMN SPEC
// ============================================================================

/// The edge a column is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedSide {
    #[default]
    None,
    Left,
    Right,
}

/// A declarative column, or a header group when `columns` is set.
pub struct ColumnSpec<R> {
    pub key: Option<String>,
    /// Dotted path into the row; also the default key of a leaf.
    pub accessor: Option<String>,
    /// Takes precedence over `accessor` when reading cell values.
    pub get_value: Option<ValueGetter<R>>,
    pub header: Option<Resolvable<String>>,
    /// `None` inherits the side of the enclosing group.
    pub fixed: Option<Resolvable<FixedSide>>,
    pub sortable: Resolvable<bool>,
    pub default_sort_dir: Resolvable<SortDirection>,
    pub enabled: Resolvable<bool>,
    pub visible_by_default: Resolvable<bool>,
    pub can_toggle_visibility: Resolvable<bool>,
    pub filter: Option<Resolvable<ColumnFilter>>,
    /// Opaque editor configuration, passed through untouched.
    pub editor: Option<StructuredValue>,
    pub primary_key: bool,
    pub columns: Option<Vec<ColumnSpec<R>>>,
}

impl<R> Default for ColumnSpec<R> {
    fn default() -> Self {
        ColumnSpec {
            key: None,
            accessor: None,
            get_value: None,
            header: None,
            fixed: None,
            sortable: Resolvable::Literal(false),
            default_sort_dir: Resolvable::Literal(SortDirection::Asc),
            enabled: Resolvable::Literal(true),
            visible_by_default: Resolvable::Literal(true),
            can_toggle_visibility: Resolvable::Literal(true),
            filter: None,
            editor: None,
            primary_key: false,
            columns: None,
        }
    }
}

impl<R> ColumnSpec<R> {
    /// A leaf column reading `accessor` from each row.
    pub fn new(accessor: impl Into<String>) -> Self {
        ColumnSpec {
            accessor: Some(accessor.into()),
            ..Default::default()
        }
    }

    /// A leaf column whose value is computed from the row.
    pub fn computed<F>(key: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&R) -> StructuredValue + Send + Sync + 'static,
    {
        ColumnSpec {
            key: Some(key.into()),
            get_value: Some(Arc::new(getter)),
            ..Default::default()
        }
    }

    /// A header group spanning `children`.
    pub fn group(header: impl Into<Resolvable<String>>, children: Vec<ColumnSpec<R>>) -> Self {
        ColumnSpec {
            header: Some(header.into()),
            columns: Some(children),
            ..Default::default()
        }
    }

    pub fn is_group(&self) -> bool {
        self.columns.is_some()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn header(mut self, header: impl Into<Resolvable<String>>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn fixed(mut self, side: impl Into<Resolvable<FixedSide>>) -> Self {
        self.fixed = Some(side.into());
        self
    }

    pub fn sortable(mut self, sortable: impl Into<Resolvable<bool>>) -> Self {
        self.sortable = sortable.into();
        self
    }

    pub fn default_sort_dir(mut self, direction: SortDirection) -> Self {
        self.default_sort_dir = direction.into();
        self
    }

    pub fn enabled(mut self, enabled: impl Into<Resolvable<bool>>) -> Self {
        self.enabled = enabled.into();
        self
    }

    pub fn visible_by_default(mut self, visible: impl Into<Resolvable<bool>>) -> Self {
        self.visible_by_default = visible.into();
        self
    }

    pub fn can_toggle_visibility(mut self, can_toggle: impl Into<Resolvable<bool>>) -> Self {
        self.can_toggle_visibility = can_toggle.into();
        self
    }

    pub fn filter(mut self, filter: impl Into<Resolvable<ColumnFilter>>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn editor(mut self, editor: impl Into<StructuredValue>) -> Self {
        self.editor = Some(editor.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn value_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(&R) -> StructuredValue + Send + Sync + 'static,
    {
        self.get_value = Some(Arc::new(getter));
        self
    }
}
