//! FILENAME: filter-engine/src/evaluate.rs
//! PURPOSE: Client-side evaluation of a filter tree against one row.
//! CONTEXT: Used when the table is fed a static array instead of a
//! remote data source. Incomplete items do not filter anything.

use std::cmp::Ordering;
use grid_model::{Operator, StructuredValue};
use crate::model::{FilterGroup, FilterItem, FilterNode, GroupOperator};

/// True when the row passes `group`. `cell` returns the row's value for a
/// column key (`None` for an absent value).
pub fn matches<F>(group: &FilterGroup, cell: &F) -> bool
where
    F: Fn(&str) -> Option<StructuredValue>,
{
    let mut results = group.filters.iter().filter_map(|node| match node {
        FilterNode::Group(sub) if sub.is_empty() => None,
        FilterNode::Group(sub) => Some(matches(sub, cell)),
        FilterNode::Item(item) if !item.is_complete() => None,
        FilterNode::Item(item) => Some(item_matches(item, cell(&item.column).as_ref())),
    });

    match group.group_operator {
        GroupOperator::And => results.all(|r| r),
        GroupOperator::Or => {
            let mut any_evaluated = false;
            for r in results.by_ref() {
                if r {
                    return true;
                }
                any_evaluated = true;
            }
            !any_evaluated
        }
    }
}

pub fn item_matches(item: &FilterItem, cell: Option<&StructuredValue>) -> bool {
    let cell = cell.filter(|v| !is_blank(v));

    match item.operator {
        Operator::IsNull => cell.is_none(),
        Operator::IsNotNull => cell.is_some(),
        Operator::NotEquals => !cell.is_some_and(|c| loose_eq(c, &item.value)),
        Operator::NotContains => !cell.is_some_and(|c| contains(c, &item.value)),
        Operator::NoneOf => !cell.is_some_and(|c| any_of(c, &item.value)),
        Operator::NotBetween => cell.is_some_and(|c| !between(c, &item.value)),
        _ => {
            let Some(c) = cell else {
                return false;
            };
            match item.operator {
                Operator::Equals => loose_eq(c, &item.value),
                Operator::EqualsIgnoreCase => {
                    c.to_string().to_lowercase() == item.value.to_string().to_lowercase()
                }
                Operator::GreaterThan => compare(c, &item.value) == Some(Ordering::Greater),
                Operator::GreaterThanOrEqual => {
                    matches!(compare(c, &item.value), Some(Ordering::Greater | Ordering::Equal))
                }
                Operator::LessThan => compare(c, &item.value) == Some(Ordering::Less),
                Operator::LessThanOrEqual => {
                    matches!(compare(c, &item.value), Some(Ordering::Less | Ordering::Equal))
                }
                Operator::Between => between(c, &item.value),
                Operator::Contains => contains(c, &item.value),
                Operator::BeginsWith => lower(c).starts_with(&lower(&item.value)),
                Operator::EndsWith => lower(c).ends_with(&lower(&item.value)),
                Operator::AnyOf => any_of(c, &item.value),
                _ => false,
            }
        }
    }
}

fn is_blank(value: &StructuredValue) -> bool {
    value.is_absent() || value.as_str().is_some_and(str::is_empty)
}

fn lower(value: &StructuredValue) -> String {
    value.to_string().to_lowercase()
}

fn contains(cell: &StructuredValue, needle: &StructuredValue) -> bool {
    lower(cell).contains(&lower(needle))
}

/// Numeric comparison when both sides read as numbers, text otherwise.
fn compare(a: &StructuredValue, b: &StructuredValue) -> Option<Ordering> {
    if is_blank(b) {
        return None;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => Some(a.to_string().cmp(&b.to_string())),
    }
}

fn loose_eq(a: &StructuredValue, b: &StructuredValue) -> bool {
    if let (StructuredValue::Bool(_), _) | (_, StructuredValue::Bool(_)) = (a, b) {
        return a.as_bool().is_some() && a.as_bool() == b.as_bool();
    }
    compare(a, b) == Some(Ordering::Equal)
}

/// Inclusive; a null bound is open.
fn between(cell: &StructuredValue, range: &StructuredValue) -> bool {
    let Some(bounds) = range.as_array() else {
        return false;
    };
    let low_ok = bounds
        .first()
        .filter(|b| !is_blank(b))
        .map_or(true, |low| matches!(compare(cell, low), Some(Ordering::Greater | Ordering::Equal)));
    let high_ok = bounds
        .get(1)
        .filter(|b| !is_blank(b))
        .map_or(true, |high| matches!(compare(cell, high), Some(Ordering::Less | Ordering::Equal)));
    low_ok && high_ok
}

fn any_of(cell: &StructuredValue, list: &StructuredValue) -> bool {
    let candidates = list.as_array().unwrap_or_default();
    match cell {
        StructuredValue::Array(values) => values
            .iter()
            .any(|v| candidates.iter().any(|c| loose_eq(v, c))),
        single => candidates.iter().any(|c| loose_eq(single, c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: f64, name: &str) -> impl Fn(&str) -> Option<StructuredValue> {
        let name = name.to_string();
        move |column: &str| match column {
            "id" => Some(StructuredValue::Number(id)),
            "name" => Some(StructuredValue::from(name.as_str())),
            _ => None,
        }
    }

    #[test]
    fn test_and_or_semantics() {
        let group = FilterGroup::or(vec![])
            .with(FilterItem::new("id", Operator::Equals, 5))
            .with(FilterItem::new("name", Operator::Contains, "ad"));
        assert!(matches(&group, &row(5.0, "Zed")));
        assert!(matches(&group, &row(1.0, "Ada")));
        assert!(!matches(&group, &row(1.0, "Bob")));
    }

    #[test]
    fn test_empty_group_matches_everything() {
        assert!(matches(&FilterGroup::default(), &row(1.0, "x")));
        assert!(matches(&FilterGroup::or(vec![]), &row(1.0, "x")));
    }

    #[test]
    fn test_numeric_comparisons_on_text_values() {
        let item = FilterItem::new("id", Operator::GreaterThan, "10");
        assert!(item_matches(&item, Some(&StructuredValue::Number(11.0))));
        assert!(!item_matches(&item, Some(&StructuredValue::Number(9.0))));
    }

    #[test]
    fn test_open_range() {
        let item = FilterItem::new(
            "id",
            Operator::Between,
            StructuredValue::array(vec![StructuredValue::Number(3.0), StructuredValue::Null]),
        );
        assert!(item_matches(&item, Some(&StructuredValue::Number(100.0))));
        assert!(!item_matches(&item, Some(&StructuredValue::Number(2.0))));
    }

    #[test]
    fn test_presence_and_lists() {
        let null = FilterItem::new("x", Operator::IsNull, StructuredValue::Null);
        assert!(item_matches(&null, None));
        assert!(item_matches(&null, Some(&StructuredValue::from(""))));

        let any = FilterItem::new("x", Operator::AnyOf, StructuredValue::array(vec!["a".into(), "b".into()]));
        assert!(item_matches(&any, Some(&StructuredValue::from("b"))));
        let none = any.clone().with_operator(Operator::NoneOf);
        assert!(!item_matches(&none, Some(&StructuredValue::from("b"))));
        assert!(item_matches(&none, None));
    }

    #[test]
    fn test_incomplete_items_are_ignored() {
        let group = FilterGroup::and(vec![]).with(FilterItem::new("name", Operator::Equals, ""));
        assert!(matches(&group, &row(1.0, "anyone")));
    }
}
