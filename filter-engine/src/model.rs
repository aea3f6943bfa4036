//! FILENAME: filter-engine/src/model.rs
//! Filter Model - The in-memory filter tree.
//!
//! A `FilterGroup` is a tree of arbitrary depth. The root always exists;
//! an empty AND group is the "no filter" identity.

use serde::{Deserialize, Serialize};
use grid_model::{ColumnFilter, DiagnosticKind, Diagnostics, Operator, StructuredValue, ValueShape};
use crate::grammar::is_reserved_key;

// ============================================================================
// TREE NODES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOperator {
    #[default]
    And,
    Or,
}

impl GroupOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOperator::And => "and",
            GroupOperator::Or => "or",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "and" => Some(GroupOperator::And),
            "or" => Some(GroupOperator::Or),
            _ => None,
        }
    }
}

/// A single condition on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterItem {
    pub column: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: StructuredValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<StructuredValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    pub group_operator: GroupOperator,
    #[serde(default)]
    pub filters: Vec<FilterNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Group(FilterGroup),
    Item(FilterItem),
}

impl From<FilterItem> for FilterNode {
    fn from(item: FilterItem) -> Self {
        FilterNode::Item(item)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        FilterNode::Group(group)
    }
}

// ============================================================================
// ITEMS
// ============================================================================

impl FilterItem {
    /// Creates an item, shaping `value` to what `operator` expects.
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<StructuredValue>) -> Self {
        FilterItem {
            column: column.into(),
            operator,
            value: shape_value(value.into(), operator.value_shape()),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: impl Into<StructuredValue>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Switches the operator, carrying the entered value over into the
    /// new operator's shape: a scalar becomes `[value, null]` for a range
    /// or `[value]` for a list, and a range or list collapses to its first
    /// element for a scalar operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.value = shape_value(std::mem::take(&mut self.value), operator.value_shape());
        self.operator = operator;
        self
    }

    /// True when the value fits the operator well enough to filter on.
    /// Ranges may be open on one side.
    pub fn is_complete(&self) -> bool {
        match self.operator.value_shape() {
            ValueShape::Empty => true,
            ValueShape::Scalar => !is_blank(&self.value) && self.value.as_array().is_none(),
            ValueShape::Range => match self.value.as_array() {
                Some(bounds) if bounds.len() == 2 => bounds.iter().any(|b| !is_blank(b)),
                _ => false,
            },
            ValueShape::List => self
                .value
                .as_array()
                .map(|items| items.iter().any(|v| !is_blank(v)))
                .unwrap_or(false),
        }
    }
}

fn is_blank(value: &StructuredValue) -> bool {
    value.is_absent() || value.as_str().map(str::is_empty).unwrap_or(false)
}

/// Coerces `value` into `shape` without discarding entered data where the
/// target shape can hold it.
pub fn shape_value(value: StructuredValue, shape: ValueShape) -> StructuredValue {
    match shape {
        ValueShape::Empty => StructuredValue::Null,
        ValueShape::Scalar => match value {
            StructuredValue::Array(items) => items.into_iter().next().unwrap_or_default(),
            other => other,
        },
        ValueShape::Range => match value {
            StructuredValue::Array(items) => {
                let mut items = items.into_iter();
                let low = items.next().unwrap_or_default();
                let high = items.next().unwrap_or_default();
                StructuredValue::Array(vec![low, high])
            }
            other => StructuredValue::Array(vec![other, StructuredValue::Null]),
        },
        ValueShape::List => match value {
            StructuredValue::Array(items) => {
                StructuredValue::Array(items.into_iter().filter(|v| !v.is_absent()).collect())
            }
            StructuredValue::Null => StructuredValue::Array(Vec::new()),
            other => StructuredValue::Array(vec![other]),
        },
    }
}

// ============================================================================
// GROUPS
// ============================================================================

impl Default for FilterGroup {
    fn default() -> Self {
        FilterGroup::and(Vec::new())
    }
}

impl FilterGroup {
    pub fn new(group_operator: GroupOperator, filters: Vec<FilterNode>) -> Self {
        FilterGroup {
            group_operator,
            filters,
        }
    }

    pub fn and(filters: Vec<FilterNode>) -> Self {
        FilterGroup::new(GroupOperator::And, filters)
    }

    pub fn or(filters: Vec<FilterNode>) -> Self {
        FilterGroup::new(GroupOperator::Or, filters)
    }

    pub fn with(mut self, node: impl Into<FilterNode>) -> Self {
        self.filters.push(node.into());
        self
    }

    /// True when the tree holds no items at any depth.
    pub fn is_empty(&self) -> bool {
        self.filters.iter().all(|node| match node {
            FilterNode::Group(group) => group.is_empty(),
            FilterNode::Item(_) => false,
        })
    }

    /// All items in depth-first order.
    pub fn items(&self) -> Vec<&FilterItem> {
        let mut out = Vec::new();
        collect_items(self, &mut out);
        out
    }

    /// Distinct columns referenced anywhere in the tree, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for item in self.items() {
            if !columns.contains(&item.column.as_str()) {
                columns.push(&item.column);
            }
        }
        columns
    }

    /// Copy without incomplete items and without groups left empty.
    pub fn prune_incomplete(&self) -> FilterGroup {
        let filters = self
            .filters
            .iter()
            .filter_map(|node| match node {
                FilterNode::Item(item) if item.is_complete() => Some(node.clone()),
                FilterNode::Item(_) => None,
                FilterNode::Group(group) => {
                    let pruned = group.prune_incomplete();
                    if pruned.filters.is_empty() {
                        None
                    } else {
                        Some(FilterNode::Group(pruned))
                    }
                }
            })
            .collect();
        FilterGroup::new(self.group_operator, filters)
    }
}

fn collect_items<'a>(group: &'a FilterGroup, out: &mut Vec<&'a FilterItem>) {
    for node in &group.filters {
        match node {
            FilterNode::Group(sub) => collect_items(sub, out),
            FilterNode::Item(item) => out.push(item),
        }
    }
}

// ============================================================================
// FILTER SCHEMA
// ============================================================================

/// A filterable column as the translator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    pub key: String,
    pub filter: ColumnFilter,
}

impl FilterField {
    pub fn new(key: impl Into<String>, filter: ColumnFilter) -> Self {
        FilterField {
            key: key.into(),
            filter,
        }
    }
}

/// The filterable columns of one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSchema {
    pub table_id: String,
    pub fields: Vec<FilterField>,
}

impl FilterSchema {
    pub fn new(table_id: impl Into<String>, fields: Vec<FilterField>) -> Self {
        FilterSchema {
            table_id: table_id.into(),
            fields,
        }
    }

    /// Like `new`, but leaves out columns whose key is a grammar keyword
    /// (`and`, `or`, `op`, `meta`). Filters on those could not be written
    /// to text unambiguously.
    pub fn checked(
        table_id: impl Into<String>,
        fields: Vec<FilterField>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let table_id = table_id.into();
        let fields = fields
            .into_iter()
            .filter(|field| {
                if !is_reserved_key(&field.key) {
                    return true;
                }
                diagnostics.record(
                    &table_id,
                    DiagnosticKind::ReservedFilterColumn,
                    field.key.as_str(),
                    format!("column '{}' is not filterable: its key is a filter keyword", field.key),
                );
                false
            })
            .collect();
        FilterSchema { table_id, fields }
    }

    pub fn field(&self, key: &str) -> Option<&ColumnFilter> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.filter)
    }
}
