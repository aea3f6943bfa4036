//! FILENAME: filter-engine/src/grammar.rs
//! PURPOSE: Filter tree <-> codec value tree.
//! CONTEXT: Encoding picks the smallest equivalent form. Decoding accepts
//! both forms and infers the shape of every value it meets.
//!
//! FORMS:
//!   shorthand := { column: value, ... }             ; flat AND, default operators, no meta
//!   general   := [ entry, ... ]                     ; implicit AND
//!              | { "and"|"or": [ entry, ... ] }
//!   entry     := { column: value, op?, meta? }      ; one item, op omitted when default
//!              | { "and"|"or": [ entry, ... ] }     ; nested group
//!
//! Presence operators (nul/nnul) on a column whose default is a presence
//! operator are written as `column: true` (nul) or `column: false` (nnul).

use grid_model::{
    ColumnFilter, DiagnosticKind, Diagnostics, Operator, StructuredValue, ValueMap, ValueShape,
};
use crate::model::{shape_value, FilterGroup, FilterItem, FilterNode, FilterSchema, GroupOperator};

const OP_KEY: &str = "op";
const META_KEY: &str = "meta";

/// Keys the grammar gives a meaning of its own. A column with one of
/// these keys cannot be told apart from a group or an item option.
pub fn is_reserved_key(key: &str) -> bool {
    matches!(key, "and" | "or" | OP_KEY | META_KEY)
}

// ============================================================================
// ENCODING
// ============================================================================

/// Encodes a filter tree into the codec's value model.
pub fn to_text(group: &FilterGroup, schema: &FilterSchema) -> StructuredValue {
    if let Some(map) = shorthand(group, schema) {
        return StructuredValue::Map(map);
    }

    let entries = encode_entries(group, schema);
    match group.group_operator {
        GroupOperator::And => StructuredValue::Array(entries),
        GroupOperator::Or => StructuredValue::map([("or", StructuredValue::Array(entries))]),
    }
}

/// The compact `{column: value}` form, when the group qualifies for it.
fn shorthand(group: &FilterGroup, schema: &FilterSchema) -> Option<ValueMap> {
    if group.group_operator != GroupOperator::And {
        return None;
    }

    let mut map = ValueMap::new();
    for node in &group.filters {
        let FilterNode::Item(item) = node else {
            return None;
        };
        if item.meta.is_some() || is_reserved_key(&item.column) || map.contains_key(&item.column) {
            return None;
        }
        let filter = schema.field(&item.column)?;
        map.insert(item.column.clone(), default_form_value(item, filter)?);
    }

    Some(map)
}

/// The value written under the column key when no `op` is needed, or
/// `None` when the item's operator is not the column's default.
fn default_form_value(item: &FilterItem, filter: &ColumnFilter) -> Option<StructuredValue> {
    let default = filter.default_operator();
    if item.operator.is_presence() && default.is_presence() {
        Some(StructuredValue::Bool(item.operator == Operator::IsNull))
    } else if item.operator == default {
        Some(item.value.clone())
    } else {
        None
    }
}

/// Items on reserved column keys are left out: no entry form can carry them.
fn encode_entries(group: &FilterGroup, schema: &FilterSchema) -> Vec<StructuredValue> {
    group
        .filters
        .iter()
        .filter_map(|node| match node {
            FilterNode::Group(sub) => Some(StructuredValue::map([(
                sub.group_operator.as_str(),
                StructuredValue::Array(encode_entries(sub, schema)),
            )])),
            FilterNode::Item(item) if is_reserved_key(&item.column) => {
                log::warn!(
                    target: "FILTER",
                    "[{}] filter on reserved column key '{}' cannot be encoded; skipped",
                    schema.table_id,
                    item.column
                );
                None
            }
            FilterNode::Item(item) => Some(StructuredValue::Map(encode_item(item, schema))),
        })
        .collect()
}

fn encode_item(item: &FilterItem, schema: &FilterSchema) -> ValueMap {
    let mut map = ValueMap::new();

    match schema.field(&item.column).and_then(|f| default_form_value(item, f)) {
        Some(value) => {
            map.insert(item.column.clone(), value);
        }
        None => {
            // Presence operators carry no value; a placeholder keeps the
            // column key from being dropped by the codec.
            let value = if item.operator.is_presence() {
                StructuredValue::Bool(true)
            } else {
                item.value.clone()
            };
            map.insert(item.column.clone(), value);
            map.insert(OP_KEY.to_string(), StructuredValue::from(item.operator.tag()));
        }
    }

    if let Some(meta) = &item.meta {
        map.insert(META_KEY.to_string(), meta.clone());
    }

    map
}

// ============================================================================
// DECODING
// ============================================================================

/// Decodes a codec value tree into a filter tree. Entries naming unknown
/// columns or disallowed operators are dropped and reported through
/// `diagnostics`; the rest of the tree survives.
pub fn from_text(
    value: &StructuredValue,
    schema: &FilterSchema,
    diagnostics: &mut Diagnostics,
) -> FilterGroup {
    let mut decoder = Decoder { schema, diagnostics };

    match value {
        StructuredValue::Map(map) => {
            if let Some((op, children)) = nested_group(map) {
                return FilterGroup::new(op, decoder.entries(children, op));
            }
            FilterGroup::and(decoder.entry(value, GroupOperator::And))
        }
        StructuredValue::Array(entries) => {
            FilterGroup::and(decoder.entries(entries, GroupOperator::And))
        }
        StructuredValue::String(s) if s.is_empty() => FilterGroup::default(),
        StructuredValue::Null => FilterGroup::default(),
        other => {
            decoder.invalid(other);
            FilterGroup::default()
        }
    }
}

/// `{and: [...]}` or `{or: [...]}`: exactly one key, and it is a group
/// operator. A lone child arrives as a bare value (array sugar).
fn nested_group(map: &ValueMap) -> Option<(GroupOperator, &[StructuredValue])> {
    if map.len() != 1 {
        return None;
    }
    let (key, value) = map.iter().next()?;
    let op = GroupOperator::parse(key)?;
    let children = match value {
        StructuredValue::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    Some((op, children))
}

/// An `op` and/or `meta` key next to exactly one column key.
fn explicit_item(map: &ValueMap) -> Option<(&String, &StructuredValue)> {
    let has_op = map.contains_key(OP_KEY);
    let has_meta = map.contains_key(META_KEY);
    if !has_op && !has_meta {
        return None;
    }
    let mut columns = map.iter().filter(|(k, _)| k.as_str() != OP_KEY && k.as_str() != META_KEY);
    let column = columns.next()?;
    if columns.next().is_some() {
        return None;
    }
    Some(column)
}

struct Decoder<'a> {
    schema: &'a FilterSchema,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Decoder<'a> {
    fn entries(&mut self, entries: &[StructuredValue], parent: GroupOperator) -> Vec<FilterNode> {
        entries.iter().flat_map(|entry| self.entry(entry, parent)).collect()
    }

    /// One list entry can produce zero nodes (dropped), one node, or
    /// several sibling items (a shorthand map under an AND parent).
    fn entry(&mut self, value: &StructuredValue, parent: GroupOperator) -> Vec<FilterNode> {
        let StructuredValue::Map(map) = value else {
            self.invalid(value);
            return Vec::new();
        };

        if let Some((op, children)) = nested_group(map) {
            let filters = self.entries(children, op);
            return vec![FilterNode::Group(FilterGroup::new(op, filters))];
        }

        if let Some((column, raw)) = explicit_item(map) {
            return self
                .item(column, raw, map.get(OP_KEY), map.get(META_KEY))
                .map(FilterNode::Item)
                .into_iter()
                .collect();
        }

        let items: Vec<FilterNode> = map
            .iter()
            .filter_map(|(column, raw)| self.item(column, raw, None, None))
            .map(FilterNode::Item)
            .collect();

        if parent == GroupOperator::Or && items.len() > 1 {
            vec![FilterNode::Group(FilterGroup::and(items))]
        } else {
            items
        }
    }

    fn item(
        &mut self,
        column: &str,
        raw: &StructuredValue,
        op: Option<&StructuredValue>,
        meta: Option<&StructuredValue>,
    ) -> Option<FilterItem> {
        let Some(filter) = self.schema.field(column) else {
            self.diagnostics.record(
                &self.schema.table_id,
                DiagnosticKind::UnknownFilterColumn,
                column,
                format!("dropping filter on unknown column '{}'", column),
            );
            return None;
        };

        let default = filter.default_operator();
        let operator = match op {
            None if default.is_presence() => {
                match raw.as_bool() {
                    Some(false) => Operator::IsNotNull,
                    _ => Operator::IsNull,
                }
            }
            None => default,
            Some(tag) => match tag.as_str().and_then(Operator::from_tag) {
                Some(operator) => operator,
                None => {
                    self.unknown_operator(column, &tag.to_string());
                    return None;
                }
            },
        };

        if !filter.allows(operator) {
            self.unknown_operator(column, operator.tag());
            return None;
        }

        let value = match operator.value_shape() {
            ValueShape::Empty => StructuredValue::Null,
            shape => shape_value(raw.coerce(filter.kind.scalar_kind()), shape),
        };

        Some(FilterItem {
            column: column.to_string(),
            operator,
            value,
            meta: meta.cloned(),
        })
    }

    fn unknown_operator(&mut self, column: &str, tag: &str) {
        self.diagnostics.record(
            &self.schema.table_id,
            DiagnosticKind::UnknownOperator,
            format!("{}:{}", column, tag),
            format!("dropping filter on '{}': operator '{}' is not allowed", column, tag),
        );
    }

    fn invalid(&mut self, value: &StructuredValue) {
        let text = value.to_string();
        self.diagnostics.record(
            &self.schema.table_id,
            DiagnosticKind::InvalidFilterEntry,
            text.clone(),
            format!("dropping unreadable filter entry '{}'", text),
        );
    }
}

// ============================================================================
// TEXT HELPERS
// ============================================================================

/// Encodes a filter tree as a single query-string value.
pub fn encode_filter_param(group: &FilterGroup, schema: &FilterSchema) -> String {
    codec::stringify_value(&to_text(group, schema))
}

/// Decodes a query-string value produced by `encode_filter_param`.
pub fn decode_filter_param(
    text: &str,
    schema: &FilterSchema,
    diagnostics: &mut Diagnostics,
) -> FilterGroup {
    from_text(&codec::parse_value(text), schema, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_model::FilterKind;
    use crate::model::FilterField;

    fn schema() -> FilterSchema {
        FilterSchema::new(
            "people",
            vec![
                FilterField::new("id", ColumnFilter::new(FilterKind::Number)),
                FilterField::new("name", ColumnFilter::new(FilterKind::String)),
                FilterField::new("tag", ColumnFilter::new(FilterKind::Enum)),
                FilterField::new("deleted", ColumnFilter::new(FilterKind::Presence)),
                FilterField::new("active", ColumnFilter::new(FilterKind::Boolean)),
            ],
        )
    }

    fn n(value: f64) -> StructuredValue {
        StructuredValue::Number(value)
    }

    #[test]
    fn test_shorthand_end_to_end() {
        let schema = schema();
        let mut diag = Diagnostics::new();

        let decoded = from_text(&codec::parse("id=5"), &schema, &mut diag);
        assert_eq!(
            decoded,
            FilterGroup::and(vec![FilterItem::new("id", Operator::Equals, 5).into()])
        );
        assert_eq!(codec::stringify(&to_text(&decoded, &schema)), "id=5");
        assert!(diag.is_empty());
    }

    #[test]
    fn test_canonical_round_trip() {
        let schema = schema();
        let group = FilterGroup::and(vec![])
            .with(FilterItem::new("name", Operator::Equals, "Ada"))
            .with(FilterItem::new("id", Operator::Equals, 7))
            .with(FilterItem::new("tag", Operator::AnyOf, StructuredValue::array(vec!["a".into(), "b".into()])));

        let text = codec::stringify(&to_text(&group, &schema));
        assert_eq!(text, "id=7&name=Ada&tag=a,b");

        let decoded = from_text(&codec::parse(&text), &schema, &mut Diagnostics::new());
        assert_eq!(decoded.filters.len(), 3);
        for item in group.items() {
            assert!(decoded.items().contains(&item));
        }
    }

    #[test]
    fn test_single_list_value_keeps_list_shape() {
        let schema = schema();
        let group = FilterGroup::and(vec![])
            .with(FilterItem::new("tag", Operator::AnyOf, StructuredValue::array(vec!["a".into()])));
        let text = codec::stringify(&to_text(&group, &schema));
        assert_eq!(text, "tag=a");
        let decoded = from_text(&codec::parse(&text), &schema, &mut Diagnostics::new());
        assert_eq!(decoded, group);
    }

    #[test]
    fn test_general_form_example() {
        let schema = schema();
        let group = FilterGroup::or(vec![])
            .with(FilterItem::new("id", Operator::Equals, 5))
            .with(FilterItem::new("name", Operator::Contains, "x"));
        assert_eq!(
            encode_filter_param(&group, &schema),
            "(or:(id:5),(name:x;op:con))"
        );
        let decoded = decode_filter_param("(or:(id:5),(name:x;op:con))", &schema, &mut Diagnostics::new());
        assert_eq!(decoded, group);
    }

    #[test]
    fn test_general_round_trip_with_nesting_and_meta() {
        let schema = schema();
        let group = FilterGroup::and(vec![])
            .with(FilterItem::new("active", Operator::Equals, true))
            .with(
                FilterGroup::or(vec![])
                    .with(
                        FilterItem::new("id", Operator::Between, StructuredValue::array(vec![n(1.0), n(10.0)]))
                            .with_meta(StructuredValue::map([("label", "Range".into())])),
                    )
                    .with(FilterItem::new("name", Operator::BeginsWith, "Jo")),
            );

        let text = encode_filter_param(&group, &schema);
        let decoded = decode_filter_param(&text, &schema, &mut Diagnostics::new());
        assert_eq!(decoded, group);
    }

    #[test]
    fn test_open_range_survives() {
        let schema = schema();
        let group = FilterGroup::and(vec![])
            .with(FilterItem::new("id", Operator::GreaterThan, 3))
            .with(FilterItem::new("id", Operator::Between, StructuredValue::array(vec![n(5.0), StructuredValue::Null])));
        let text = encode_filter_param(&group, &schema);
        let decoded = decode_filter_param(&text, &schema, &mut Diagnostics::new());
        assert_eq!(decoded, group);
    }

    #[test]
    fn test_presence_collapses_to_boolean() {
        let schema = schema();
        let group = FilterGroup::and(vec![])
            .with(FilterItem::new("deleted", Operator::IsNotNull, StructuredValue::Null));
        let text = codec::stringify(&to_text(&group, &schema));
        assert_eq!(text, "deleted=0");
        let decoded = from_text(&codec::parse(&text), &schema, &mut Diagnostics::new());
        assert_eq!(decoded, group);
    }

    #[test]
    fn test_presence_on_value_column_uses_explicit_op() {
        let schema = schema();
        let group = FilterGroup::or(vec![])
            .with(FilterItem::new("name", Operator::IsNull, StructuredValue::Null))
            .with(FilterItem::new("id", Operator::Equals, 1));
        let text = encode_filter_param(&group, &schema);
        assert_eq!(text, "(or:(name:1;op:nul),(id:1))");
        let decoded = decode_filter_param(&text, &schema, &mut Diagnostics::new());
        assert_eq!(decoded, group);
    }

    #[test]
    fn test_duplicate_column_forces_general_form() {
        let schema = schema();
        let group = FilterGroup::and(vec![])
            .with(FilterItem::new("id", Operator::Equals, 1))
            .with(FilterItem::new("id", Operator::Equals, 2));
        assert_eq!(encode_filter_param(&group, &schema), "(id:1),(id:2)");
    }

    #[test]
    fn test_single_explicit_item_at_root() {
        let schema = schema();
        let decoded = decode_filter_param("(name:x;op:ncon)", &schema, &mut Diagnostics::new());
        assert_eq!(
            decoded,
            FilterGroup::and(vec![FilterItem::new("name", Operator::NotContains, "x").into()])
        );
    }

    #[test]
    fn test_multi_key_map_inside_or_becomes_and_group() {
        let schema = schema();
        let decoded = decode_filter_param("(or:(id:1;name:a),(id:2))", &schema, &mut Diagnostics::new());
        assert_eq!(decoded.group_operator, GroupOperator::Or);
        assert_eq!(decoded.filters.len(), 2);
        assert!(matches!(&decoded.filters[0], FilterNode::Group(g) if g.filters.len() == 2));
    }

    #[test]
    fn test_unknown_column_is_dropped_and_reported() {
        let schema = schema();
        let mut diag = Diagnostics::new();
        let decoded = from_text(&codec::parse("id=1&ghost=2"), &schema, &mut diag);
        assert_eq!(decoded.columns(), vec!["id"]);
        assert!(diag.has_pending(DiagnosticKind::UnknownFilterColumn));
    }

    #[test]
    fn test_disallowed_operator_is_dropped() {
        let schema = schema();
        let mut diag = Diagnostics::new();
        let decoded = decode_filter_param("(active:x;op:con),(id:2)", &schema, &mut diag);
        assert_eq!(decoded.columns(), vec!["id"]);
        assert!(diag.has_pending(DiagnosticKind::UnknownOperator));

        let decoded = decode_filter_param("(id:1;op:zz)", &schema, &mut diag);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_empty_inputs_decode_to_identity() {
        let schema = schema();
        let mut diag = Diagnostics::new();
        assert_eq!(decode_filter_param("", &schema, &mut diag), FilterGroup::default());
        assert_eq!(to_text(&FilterGroup::default(), &schema), StructuredValue::Map(ValueMap::new()));
    }

    #[test]
    fn test_reserved_column_keys_are_kept_out() {
        let mut diag = Diagnostics::new();
        let mut fields = schema().fields;
        fields.push(FilterField::new("or", ColumnFilter::new(FilterKind::String)));
        fields.push(FilterField::new("op", ColumnFilter::new(FilterKind::String)));
        let checked = FilterSchema::checked("people", fields.clone(), &mut diag);
        assert!(checked.field("or").is_none());
        assert!(checked.field("op").is_none());
        assert!(checked.field("id").is_some());
        assert!(diag.has_pending(DiagnosticKind::ReservedFilterColumn));

        // Even with an unchecked schema the encoder never writes an entry
        // that would read back as a group or an option key.
        let loose = FilterSchema::new("people", fields);
        let group = FilterGroup::and(vec![
            FilterItem::new("or", Operator::Equals, "x").into(),
            FilterItem::new("id", Operator::Equals, 1).into(),
        ]);
        let encoded = to_text(&group, &loose);
        assert_eq!(
            encoded,
            StructuredValue::array(vec![StructuredValue::map([("id", n(1.0))])])
        );
        let decoded = from_text(&encoded, &loose, &mut Diagnostics::new());
        assert_eq!(decoded.columns(), vec!["id"]);
    }
}
