//! FILENAME: layout-engine/src/engine.rs
//! Layout Engine - Turns column specs into resolved columns and a header grid.
//!
//! One layout pass:
//!   transform  : specs -> hierarchical columns (keys, visibility, group collapsing)
//!   flatten    : hierarchical columns -> leaves, plus the group header list
//!   ordering   : fixed-left + normal (persisted order) + fixed-right
//!   header rows: one row per nesting level, spans filled so the grid has no holes

use std::collections::BTreeMap;
use std::sync::Arc;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use grid_model::{ColumnFilter, ColumnSort, DiagnosticKind, Diagnostics, GroupBy, StructuredValue};
use crate::definition::{ColumnSpec, FixedSide, Resolvable, RowAccess, ValueGetter};
use crate::error::LayoutError;
use crate::view::{Column, HeaderCell, HeaderRow, HeaderTarget};

/// Ancestor chain of a column, root first.
pub type AncestorChain = SmallVec<[usize; 4]>;

/// Per-pass inputs besides the specs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutOptions<'a> {
    /// Prefix of synthesized keys and the identity warnings are reported under.
    pub table_id: &'a str,
    /// Persisted visibility preferences by column key.
    pub visibility: Option<&'a BTreeMap<String, bool>>,
    /// Persisted order of leaf keys.
    pub column_order: Option<&'a [String]>,
    pub group_by: &'a [GroupBy],
    pub sorts: &'a [ColumnSort],
}

// ============================================================================
// CELL SOURCES
// ============================================================================

/// How a leaf's cell value is read.
pub(crate) enum CellSource<R> {
    Getter(ValueGetter<R>),
    Accessor(String),
}

impl<R: RowAccess> CellSource<R> {
    pub(crate) fn read(&self, row: &R) -> Option<StructuredValue> {
        match self {
            CellSource::Getter(getter) => Some(getter(row)),
            CellSource::Accessor(accessor) => row.field(accessor),
        }
    }
}

pub(crate) struct Resolved<R> {
    pub columns: Vec<Column>,
    pub sources: FxHashMap<String, CellSource<R>>,
}

// ============================================================================
// TRANSFORM
// ============================================================================

/// Resolves `specs` into hierarchical columns.
///
/// Header groups with fewer than two visible leaves are spliced into their
/// parent's list. Surviving groups get `col_span` = sum of their visible
/// children's spans and are numbered in pre-order; that number is what
/// `Column::parent` refers to (see `group_headers`).
pub fn transform<R>(
    specs: &[ColumnSpec<R>],
    options: &LayoutOptions<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Column>, LayoutError> {
    resolve(specs, options, diagnostics).map(|resolved| resolved.columns)
}

pub(crate) fn resolve<R>(
    specs: &[ColumnSpec<R>],
    options: &LayoutOptions<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<Resolved<R>, LayoutError> {
    let mut resolver = Resolver {
        options: *options,
        diagnostics,
        keys: FxHashSet::default(),
        primary_key: None,
        fixed_left: None,
        fixed_right: None,
        sources: FxHashMap::default(),
    };
    let top = Inherited {
        key: None,
        fixed: FixedSide::None,
        enabled: true,
    };
    let mut columns = resolver.resolve_level(specs, &top)?;

    let mut next_group = 0;
    number_groups(&mut columns, None, 0, &mut next_group);

    log::debug!(
        target: "LAYOUT",
        "table '{}': {} top-level columns, {} group headers",
        options.table_id,
        columns.len(),
        next_group
    );

    Ok(Resolved {
        columns,
        sources: resolver.sources,
    })
}

/// What a spec takes over from its enclosing group spec.
struct Inherited<'p> {
    key: Option<&'p str>,
    fixed: FixedSide,
    enabled: bool,
}

struct Resolver<'a, 'd, R> {
    options: LayoutOptions<'a>,
    diagnostics: &'d mut Diagnostics,
    keys: FxHashSet<String>,
    primary_key: Option<String>,
    fixed_left: Option<String>,
    fixed_right: Option<String>,
    sources: FxHashMap<String, CellSource<R>>,
}

impl<'a, 'd, R> Resolver<'a, 'd, R> {
    fn resolve_level(
        &mut self,
        specs: &[ColumnSpec<R>],
        inherited: &Inherited<'_>,
    ) -> Result<Vec<Column>, LayoutError> {
        let mut out = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            let key = self.assign_key(spec, index, inherited.key);

            let Some(children) = &spec.columns else {
                if let Some(leaf) = self.resolve_leaf(spec, key, inherited)? {
                    out.push(leaf);
                }
                continue;
            };

            if children.is_empty() {
                return Err(LayoutError::EmptyGroup {
                    table_id: self.options.table_id.to_string(),
                    key,
                });
            }

            let fixed = self.resolve_fixed(spec, &key, inherited.fixed);
            let enabled = inherited.enabled && spec.enabled.resolve();
            let resolved = self.resolve_level(
                children,
                &Inherited {
                    key: Some(&key),
                    fixed,
                    enabled,
                },
            )?;

            let visible: usize = resolved.iter().map(Column::visible_leaf_count).sum();
            if visible <= 1 {
                out.extend(resolved);
                continue;
            }

            let col_span = resolved
                .iter()
                .filter(|c| c.is_visible)
                .map(|c| c.col_span)
                .sum();
            let header = spec
                .header
                .as_ref()
                .map(Resolvable::resolve)
                .unwrap_or_else(|| key.clone());

            out.push(Column {
                key,
                accessor: None,
                header,
                fixed,
                sortable: false,
                default_sort_dir: spec.default_sort_dir.resolve(),
                enabled,
                can_toggle_visibility: false,
                filter: None,
                editor: None,
                primary_key: false,
                is_visible: true,
                col_span,
                row_span: 1,
                sort_index: None,
                sort_direction: None,
                is_grouped: false,
                parent: None,
                depth: 0,
                columns: Some(resolved),
            });
        }

        Ok(out)
    }

    /// `Ok(None)` drops a leaf that cannot be read inside a header group.
    fn resolve_leaf(
        &mut self,
        spec: &ColumnSpec<R>,
        key: String,
        inherited: &Inherited<'_>,
    ) -> Result<Option<Column>, LayoutError> {
        let source = match (&spec.get_value, &spec.accessor) {
            (Some(getter), _) => CellSource::Getter(Arc::clone(getter)),
            (None, Some(accessor)) => CellSource::Accessor(accessor.clone()),
            (None, None) => {
                let Some(group) = inherited.key else {
                    return Err(LayoutError::MissingAccessor {
                        table_id: self.options.table_id.to_string(),
                        key,
                    });
                };
                self.diagnostics.record(
                    self.options.table_id,
                    DiagnosticKind::UnreachableLeaf,
                    key.as_str(),
                    format!("column '{key}' in group '{group}' has no accessor or value getter and is skipped"),
                );
                return Ok(None);
            }
        };

        let fixed = self.resolve_fixed(spec, &key, inherited.fixed);
        let enabled = inherited.enabled && spec.enabled.resolve();
        let can_toggle_visibility = spec.can_toggle_visibility.resolve();
        let preference = if can_toggle_visibility {
            self.options
                .visibility
                .and_then(|prefs| prefs.get(&key).copied())
        } else {
            None
        };
        let is_visible = enabled && preference.unwrap_or_else(|| spec.visible_by_default.resolve());
        let primary_key = spec.primary_key && self.claim_primary_key(&key);
        let sort = self
            .options
            .sorts
            .iter()
            .enumerate()
            .find(|(_, sort)| sort.column == key);
        let header = spec
            .header
            .as_ref()
            .map(Resolvable::resolve)
            .or_else(|| spec.accessor.clone())
            .unwrap_or_else(|| key.clone());

        self.sources.insert(key.clone(), source);

        Ok(Some(Column {
            is_grouped: self.options.group_by.iter().any(|g| g.column == key),
            accessor: spec.accessor.clone(),
            header,
            fixed,
            sortable: spec.sortable.resolve(),
            default_sort_dir: spec.default_sort_dir.resolve(),
            enabled,
            can_toggle_visibility,
            filter: spec.filter.as_ref().map(Resolvable::resolve),
            editor: spec.editor.clone(),
            primary_key,
            is_visible,
            col_span: 1,
            row_span: 1,
            sort_index: sort.map(|(index, _)| index),
            sort_direction: sort.map(|(_, sort)| sort.direction),
            parent: None,
            depth: 0,
            columns: None,
            key,
        }))
    }

    /// Explicit key, else a leaf's accessor, else `{parent|table}_c{index}`.
    /// A key already taken in this pass gets a numeric suffix.
    fn assign_key(&mut self, spec: &ColumnSpec<R>, index: usize, parent: Option<&str>) -> String {
        let base = spec
            .key
            .clone()
            .or_else(|| if spec.is_group() { None } else { spec.accessor.clone() })
            .unwrap_or_else(|| format!("{}_c{}", parent.unwrap_or(self.options.table_id), index));

        if self.keys.insert(base.clone()) {
            return base;
        }

        let mut suffix = 2;
        let key = loop {
            let candidate = format!("{base}_{suffix}");
            if self.keys.insert(candidate.clone()) {
                break candidate;
            }
            suffix += 1;
        };
        self.diagnostics.record(
            self.options.table_id,
            DiagnosticKind::DuplicateKey,
            base.as_str(),
            format!("column key '{base}' is used more than once; the repeat is renamed to '{key}'"),
        );
        key
    }

    /// A spec inside a pinned group takes the group's side. Only the first
    /// spec pinned to each edge keeps its pin.
    fn resolve_fixed(&mut self, spec: &ColumnSpec<R>, key: &str, inherited: FixedSide) -> FixedSide {
        if inherited != FixedSide::None {
            return inherited;
        }
        let side = spec.fixed.as_ref().map(Resolvable::resolve).unwrap_or_default();
        let slot = match side {
            FixedSide::None => return FixedSide::None,
            FixedSide::Left => &mut self.fixed_left,
            FixedSide::Right => &mut self.fixed_right,
        };
        if let Some(first) = slot.clone() {
            self.diagnostics.record(
                self.options.table_id,
                DiagnosticKind::MultipleFixedColumns,
                key,
                format!("column '{key}' is pinned to the same edge as '{first}' and is not pinned"),
            );
            return FixedSide::None;
        }
        *slot = Some(key.to_string());
        side
    }

    fn claim_primary_key(&mut self, key: &str) -> bool {
        if let Some(first) = self.primary_key.clone() {
            self.diagnostics.record(
                self.options.table_id,
                DiagnosticKind::DuplicatePrimaryKey,
                key,
                format!("column '{key}' is also flagged as primary key; '{first}' is used"),
            );
            return false;
        }
        self.primary_key = Some(key.to_string());
        true
    }
}

fn number_groups(columns: &mut [Column], parent: Option<usize>, depth: usize, next: &mut usize) {
    for column in columns {
        column.parent = parent;
        column.depth = depth;
        if let Some(children) = column.columns.as_mut() {
            let index = *next;
            *next += 1;
            number_groups(children, Some(index), depth + 1, next);
        }
    }
}

// ============================================================================
// FLATTEN
// ============================================================================

/// All leaves, hidden ones included, in spec order.
pub fn flatten(columns: &[Column]) -> Vec<Column> {
    let mut leaves = Vec::new();
    collect(columns, &mut leaves, &mut Vec::new());
    leaves
}

/// Merged group headers in pre-order, without their children. Index `i`
/// is the group a `Column::parent == Some(i)` points at.
pub fn group_headers(columns: &[Column]) -> Vec<Column> {
    let mut groups = Vec::new();
    collect(columns, &mut Vec::new(), &mut groups);
    groups
}

fn collect(columns: &[Column], leaves: &mut Vec<Column>, groups: &mut Vec<Column>) {
    for column in columns {
        match &column.columns {
            None => leaves.push(column.clone()),
            Some(children) => {
                groups.push(Column {
                    columns: None,
                    ..column.clone()
                });
                collect(children, leaves, groups);
            }
        }
    }
}

/// Group indices from the root down to `column`'s parent.
pub fn ancestors(column: &Column, groups: &[Column]) -> AncestorChain {
    let mut chain = AncestorChain::new();
    let mut current = column.parent;
    while let Some(index) = current {
        chain.push(index);
        current = groups.get(index).and_then(|group| group.parent);
    }
    chain.reverse();
    chain
}

// ============================================================================
// ORDERING
// ============================================================================

/// Fixed-left leaves, then normal leaves, then fixed-right leaves. Only
/// the normal segment follows `persisted_order`; keys it does not list
/// keep spec order after the listed ones.
pub fn order_columns(leaves: &[Column], persisted_order: Option<&[String]>) -> Vec<Column> {
    let mut position: FxHashMap<&str, usize> = FxHashMap::default();
    for (index, key) in persisted_order.unwrap_or_default().iter().enumerate() {
        position.entry(key.as_str()).or_insert(index);
    }

    let mut left = Vec::new();
    let mut normal = Vec::new();
    let mut right = Vec::new();
    for leaf in leaves {
        match leaf.fixed {
            FixedSide::Left => left.push(leaf.clone()),
            FixedSide::None => normal.push(leaf.clone()),
            FixedSide::Right => right.push(leaf.clone()),
        }
    }

    normal.sort_by_key(|leaf| position.get(leaf.key.as_str()).copied().unwrap_or(usize::MAX));

    left.into_iter().chain(normal).chain(right).collect()
}

// ============================================================================
// HEADER ROWS
// ============================================================================

/// Orders `leaves` and builds the header grid over the visible ones.
/// `HeaderTarget::Leaf` indices refer to the ordered list.
pub fn build_header_rows(
    leaves: &[Column],
    groups: &[Column],
    persisted_order: Option<&[String]>,
) -> Vec<HeaderRow> {
    assemble_header_rows(&order_columns(leaves, persisted_order), groups)
}

/// One row per nesting level. At each level, consecutive visible leaves
/// under the same group share one group cell; a leaf whose chain ends at
/// that level gets a cell stretched down to the last row.
pub(crate) fn assemble_header_rows(ordered: &[Column], groups: &[Column]) -> Vec<HeaderRow> {
    let visible: Vec<(usize, &Column, AncestorChain)> = ordered
        .iter()
        .enumerate()
        .filter(|(_, leaf)| leaf.is_visible)
        .map(|(index, leaf)| (index, leaf, ancestors(leaf, groups)))
        .collect();

    let depth = visible
        .iter()
        .map(|(_, _, chain)| chain.len() + 1)
        .max()
        .unwrap_or(0);

    let mut rows = Vec::with_capacity(depth);
    for level in 0..depth {
        let mut cells: Vec<HeaderCell> = Vec::new();
        let mut open_group: Option<usize> = None;

        for (leaf_index, leaf, chain) in &visible {
            if let Some(&group_index) = chain.get(level) {
                if open_group == Some(group_index) {
                    if let Some(cell) = cells.last_mut() {
                        cell.col_span += 1;
                    }
                    continue;
                }
                let Some(group) = groups.get(group_index) else {
                    continue;
                };
                cells.push(HeaderCell {
                    key: group.key.clone(),
                    header: group.header.clone(),
                    target: HeaderTarget::Group(group_index),
                    fixed: group.fixed,
                    col_span: 1,
                    row_span: 1,
                });
                open_group = Some(group_index);
                continue;
            }

            open_group = None;
            if chain.len() == level {
                cells.push(HeaderCell {
                    key: leaf.key.clone(),
                    header: leaf.header.clone(),
                    target: HeaderTarget::Leaf(*leaf_index),
                    fixed: leaf.fixed,
                    col_span: 1,
                    row_span: (depth - level) as u16,
                });
            }
        }

        rows.push(HeaderRow { cells });
    }
    rows
}

// ============================================================================
// FILTER FIELDS
// ============================================================================

/// Enabled leaves that declare a filter, as `(key, filter)` pairs.
pub fn filter_fields(leaves: &[Column]) -> Vec<(String, ColumnFilter)> {
    leaves
        .iter()
        .filter(|leaf| leaf.enabled)
        .filter_map(|leaf| leaf.filter.clone().map(|filter| (leaf.key.clone(), filter)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use grid_model::{FilterKind, SortDirection};

    type Spec = ColumnSpec<StructuredValue>;

    fn leaf(accessor: &str) -> Spec {
        ColumnSpec::new(accessor)
    }

    fn options(table_id: &str) -> LayoutOptions<'_> {
        LayoutOptions {
            table_id,
            ..Default::default()
        }
    }

    fn keys(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.key.as_str()).collect()
    }

    fn cell_keys(row: &HeaderRow) -> Vec<&str> {
        row.cells.iter().map(|c| c.key.as_str()).collect()
    }

    fn nested_specs() -> Vec<Spec> {
        vec![
            leaf("id"),
            ColumnSpec::group("Name", vec![leaf("first"), leaf("last")]),
            ColumnSpec::group(
                "Address",
                vec![leaf("city"), ColumnSpec::group("Geo", vec![leaf("lat"), leaf("lng")])],
            ),
        ]
    }

    #[test]
    fn test_key_assignment() {
        let specs: Vec<Spec> = vec![
            leaf("name").key("display_name"),
            leaf("email"),
            ColumnSpec::computed("score", |_| StructuredValue::Number(1.0)),
            ColumnSpec::group("G", vec![leaf("a"), ColumnSpec::default().value_getter(|_| 1.into())]),
        ];
        let columns = transform(&specs, &options("orders"), &mut Diagnostics::new()).unwrap();
        assert_eq!(keys(&columns), vec!["display_name", "email", "score", "orders_c3"]);

        let group = columns[3].columns.as_ref().unwrap();
        assert_eq!(keys(group), vec!["a", "orders_c3_c1"]);
    }

    #[test]
    fn test_visibility_resolution() {
        let specs: Vec<Spec> = vec![
            leaf("a").enabled(false),
            leaf("b").visible_by_default(false),
            leaf("c"),
            leaf("d").can_toggle_visibility(false),
        ];
        let prefs: BTreeMap<String, bool> = [("a", true), ("b", true), ("c", false), ("d", false)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let opts = LayoutOptions {
            table_id: "t",
            visibility: Some(&prefs),
            ..Default::default()
        };
        let columns = transform(&specs, &opts, &mut Diagnostics::new()).unwrap();
        let visible: Vec<bool> = columns.iter().map(|c| c.is_visible).collect();
        assert_eq!(visible, vec![false, true, false, true]);
    }

    #[test]
    fn test_visible_leaf_count_matches_enabled_and_visible() {
        let specs: Vec<Spec> = vec![
            leaf("a"),
            ColumnSpec::group(
                "G",
                vec![leaf("b").enabled(false), leaf("c"), ColumnSpec::group("H", vec![leaf("d"), leaf("e").visible_by_default(false)])],
            ),
        ];
        let columns = transform(&specs, &options("t"), &mut Diagnostics::new()).unwrap();
        let visible = flatten(&columns).iter().filter(|c| c.is_visible).count();
        assert_eq!(visible, 3);
    }

    #[test]
    fn test_disabled_group_disables_children() {
        let specs: Vec<Spec> = vec![leaf("a"), ColumnSpec::group("G", vec![leaf("b"), leaf("c")]).enabled(false)];
        let columns = transform(&specs, &options("t"), &mut Diagnostics::new()).unwrap();
        let leaves = flatten(&columns);
        assert!(leaves.iter().filter(|c| c.key != "a").all(|c| !c.enabled && !c.is_visible));
    }

    #[test]
    fn test_group_with_one_visible_child_is_spliced() {
        let specs: Vec<Spec> = vec![
            leaf("id"),
            ColumnSpec::group("Name", vec![leaf("first"), leaf("last").enabled(false)]),
        ];
        let columns = transform(&specs, &options("t"), &mut Diagnostics::new()).unwrap();
        assert_eq!(keys(&columns), vec!["id", "first", "last"]);
        assert!(columns.iter().all(|c| c.is_leaf() && c.parent.is_none() && c.depth == 0));

        let groups = group_headers(&columns);
        assert!(groups.is_empty());
        let rows = build_header_rows(&flatten(&columns), &groups, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(cell_keys(&rows[0]), vec!["id", "first"]);
    }

    #[test]
    fn test_group_col_span_and_parents() {
        let columns = transform(&nested_specs(), &options("t"), &mut Diagnostics::new()).unwrap();
        assert_eq!(keys(&columns), vec!["id", "t_c1", "t_c2"]);
        assert_eq!(columns[1].col_span, 2);
        assert_eq!(columns[2].col_span, 3);

        let groups = group_headers(&columns);
        assert_eq!(keys(&groups), vec!["t_c1", "t_c2", "t_c2_c1"]);
        assert_eq!(groups[2].parent, Some(1));

        let leaves = flatten(&columns);
        let lat = leaves.iter().find(|c| c.key == "lat").unwrap();
        assert_eq!(lat.depth, 2);
        assert_eq!(ancestors(lat, &groups).as_slice(), &[1, 2]);
    }

    #[test]
    fn test_header_rows_fill_the_grid() {
        let columns = transform(&nested_specs(), &options("t"), &mut Diagnostics::new()).unwrap();
        let rows = build_header_rows(&flatten(&columns), &group_headers(&columns), None);

        assert_eq!(rows.len(), 3);
        assert_eq!(cell_keys(&rows[0]), vec!["id", "t_c1", "t_c2"]);
        assert_eq!(cell_keys(&rows[1]), vec!["first", "last", "city", "t_c2_c1"]);
        assert_eq!(cell_keys(&rows[2]), vec!["lat", "lng"]);

        let spans: Vec<(u16, u16)> = rows[0].cells.iter().map(|c| (c.col_span, c.row_span)).collect();
        assert_eq!(spans, vec![(1, 3), (2, 1), (3, 1)]);
        let spans: Vec<(u16, u16)> = rows[1].cells.iter().map(|c| (c.col_span, c.row_span)).collect();
        assert_eq!(spans, vec![(1, 2), (1, 2), (1, 2), (2, 1)]);
        assert_eq!(rows[0].width(), 6);
    }

    #[test]
    fn test_group_cells_span_their_visible_children() {
        let columns = transform(&nested_specs(), &options("t"), &mut Diagnostics::new()).unwrap();
        let groups = group_headers(&columns);
        let rows = build_header_rows(&flatten(&columns), &groups, None);

        fn check(columns: &[Column]) {
            for column in columns {
                if let Some(children) = &column.columns {
                    let sum: u16 = children.iter().filter(|c| c.is_visible).map(|c| c.col_span).sum();
                    assert_eq!(column.col_span, sum);
                    check(children);
                }
            }
        }
        check(&columns);

        for cell in rows.iter().flat_map(|r| &r.cells) {
            if let HeaderTarget::Group(index) = cell.target {
                assert_eq!(cell.col_span, groups[index].col_span);
            }
        }
    }

    #[test]
    fn test_ordering_keeps_fixed_edges() {
        let specs: Vec<Spec> = vec![
            leaf("a"),
            leaf("b").fixed(FixedSide::Right),
            leaf("c").fixed(FixedSide::Left),
            leaf("d"),
        ];
        let columns = transform(&specs, &options("t"), &mut Diagnostics::new()).unwrap();
        let order = vec!["b".to_string(), "d".to_string(), "ghost".to_string()];
        let ordered = order_columns(&flatten(&columns), Some(&order));
        assert_eq!(keys(&ordered), vec!["c", "d", "a", "b"]);

        let default_order = order_columns(&flatten(&columns), None);
        assert_eq!(keys(&default_order), vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn test_fixed_side_is_inherited_from_group() {
        let specs: Vec<Spec> = vec![
            leaf("a"),
            ColumnSpec::group("Pinned", vec![leaf("b"), leaf("c").fixed(FixedSide::Right)]).fixed(FixedSide::Left),
        ];
        let mut diagnostics = Diagnostics::new();
        let columns = transform(&specs, &options("t"), &mut diagnostics).unwrap();
        let ordered = order_columns(&flatten(&columns), None);
        assert_eq!(keys(&ordered), vec!["b", "c", "a"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_reordered_group_splits_into_runs() {
        let specs: Vec<Spec> = vec![leaf("id"), ColumnSpec::group("Name", vec![leaf("first"), leaf("last")])];
        let columns = transform(&specs, &options("t"), &mut Diagnostics::new()).unwrap();
        let order = vec!["first".to_string(), "id".to_string(), "last".to_string()];
        let rows = build_header_rows(&flatten(&columns), &group_headers(&columns), Some(&order));

        assert_eq!(cell_keys(&rows[0]), vec!["t_c1", "id", "t_c1"]);
        assert!(rows[0].cells.iter().all(|c| c.col_span == 1));
        assert_eq!(rows[0].cells[1].row_span, 2);
        assert_eq!(cell_keys(&rows[1]), vec!["first", "last"]);
    }

    #[test]
    fn test_configuration_warnings_first_wins() {
        let specs: Vec<Spec> = vec![
            leaf("id").primary_key().fixed(FixedSide::Left),
            leaf("code").primary_key(),
            leaf("name").fixed(FixedSide::Left),
            leaf("name"),
        ];
        let mut diagnostics = Diagnostics::new();
        let columns = transform(&specs, &options("t"), &mut diagnostics).unwrap();

        assert_eq!(keys(&columns), vec!["id", "code", "name", "name_2"]);
        assert!(columns[0].primary_key && !columns[1].primary_key);
        assert_eq!(columns[2].fixed, FixedSide::None);
        assert!(diagnostics.has_pending(DiagnosticKind::DuplicatePrimaryKey));
        assert!(diagnostics.has_pending(DiagnosticKind::MultipleFixedColumns));
        assert!(diagnostics.has_pending(DiagnosticKind::DuplicateKey));
        assert_eq!(diagnostics.take().len(), 3);

        transform(&specs, &options("t"), &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_misconfigured_specs() {
        let missing: Vec<Spec> = vec![ColumnSpec::default().key("x")];
        let err = transform(&missing, &options("t"), &mut Diagnostics::new()).unwrap_err();
        assert_eq!(
            err,
            LayoutError::MissingAccessor {
                table_id: "t".to_string(),
                key: "x".to_string()
            }
        );

        let empty: Vec<Spec> = vec![ColumnSpec::group("G", vec![])];
        let err = transform(&empty, &options("t"), &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, LayoutError::EmptyGroup { .. }));
    }

    #[test]
    fn test_unreadable_leaf_in_group_is_skipped() {
        let specs: Vec<Spec> = vec![ColumnSpec::group("G", vec![leaf("a"), leaf("b"), ColumnSpec::default()])];
        let mut diagnostics = Diagnostics::new();
        let columns = transform(&specs, &options("t"), &mut diagnostics).unwrap();
        assert_eq!(keys(&flatten(&columns)), vec!["a", "b"]);
        assert!(diagnostics.has_pending(DiagnosticKind::UnreachableLeaf));
    }

    #[test]
    fn test_sort_and_group_flags() {
        let specs: Vec<Spec> = vec![leaf("a"), leaf("b"), leaf("c")];
        let sorts = vec![ColumnSort::new("c", SortDirection::Desc), ColumnSort::new("a", SortDirection::Asc)];
        let group_by = vec![GroupBy::new("b", SortDirection::Asc)];
        let opts = LayoutOptions {
            table_id: "t",
            sorts: &sorts,
            group_by: &group_by,
            ..Default::default()
        };
        let columns = transform(&specs, &opts, &mut Diagnostics::new()).unwrap();
        assert_eq!(columns[0].sort_index, Some(1));
        assert_eq!(columns[2].sort_direction, Some(SortDirection::Desc));
        assert_eq!(columns[1].sort_index, None);
        assert!(columns[1].is_grouped && !columns[0].is_grouped);
    }

    #[test]
    fn test_providers_resolve_once_per_pass() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let specs: Vec<Spec> = vec![leaf("a").header(Resolvable::provider(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            "Computed".to_string()
        }))];
        let columns = transform(&specs, &options("t"), &mut Diagnostics::new()).unwrap();
        assert_eq!(columns[0].header, "Computed");
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filter_fields_skip_disabled() {
        let specs: Vec<Spec> = vec![
            leaf("a").filter(ColumnFilter::new(FilterKind::Number)),
            leaf("b").filter(ColumnFilter::new(FilterKind::String)).enabled(false),
            leaf("c").filter(ColumnFilter::new(FilterKind::String)).visible_by_default(false),
            leaf("d"),
        ];
        let columns = transform(&specs, &options("t"), &mut Diagnostics::new()).unwrap();
        let fields = filter_fields(&flatten(&columns));
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }
}
