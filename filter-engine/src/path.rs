//! FILENAME: filter-engine/src/path.rs
//! PURPOSE: Pure edits of a filter tree addressed by index paths.
//! CONTEXT: A path is the sequence of child indices from the root group;
//! `[1, 0]` is the first child of the root's second child. Every edit
//! returns a new tree (structural copy along the path) and leaves the
//! input untouched. An invalid path yields `None`.

use crate::model::{FilterGroup, FilterNode};

/// The node at `path`. An empty path has no node (the root is a group,
/// not a node).
pub fn get_at_path<'a>(group: &'a FilterGroup, path: &[usize]) -> Option<&'a FilterNode> {
    let (&first, rest) = path.split_first()?;
    let node = group.filters.get(first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match node {
        FilterNode::Group(sub) => get_at_path(sub, rest),
        FilterNode::Item(_) => None,
    }
}

/// Rebuilds the group at `path` (empty path = root) with `f`.
pub fn map_group_at_path<F>(group: &FilterGroup, path: &[usize], f: F) -> Option<FilterGroup>
where
    F: FnOnce(&FilterGroup) -> Option<FilterGroup>,
{
    let Some((&first, rest)) = path.split_first() else {
        return f(group);
    };
    let FilterNode::Group(sub) = group.filters.get(first)? else {
        return None;
    };
    let updated = map_group_at_path(sub, rest, f)?;
    let mut filters = group.filters.clone();
    filters[first] = FilterNode::Group(updated);
    Some(FilterGroup::new(group.group_operator, filters))
}

/// Replaces the node at `path` with `f(node)`; `None` from `f` removes it.
pub fn update_at_path<F>(group: &FilterGroup, path: &[usize], f: F) -> Option<FilterGroup>
where
    F: FnOnce(&FilterNode) -> Option<FilterNode>,
{
    let (&last, parent) = path.split_last()?;
    map_group_at_path(group, parent, |target| {
        let node = target.filters.get(last)?;
        let mut filters = target.filters.clone();
        match f(node) {
            Some(replacement) => filters[last] = replacement,
            None => {
                filters.remove(last);
            }
        }
        Some(FilterGroup::new(target.group_operator, filters))
    })
}

pub fn replace_at_path(group: &FilterGroup, path: &[usize], node: FilterNode) -> Option<FilterGroup> {
    update_at_path(group, path, |_| Some(node))
}

pub fn remove_at_path(group: &FilterGroup, path: &[usize]) -> Option<FilterGroup> {
    update_at_path(group, path, |_| None)
}

/// Inserts `node` into the group at `group_path` at `index` (clamped to
/// the end of that group's children).
pub fn insert_at_path(
    group: &FilterGroup,
    group_path: &[usize],
    index: usize,
    node: FilterNode,
) -> Option<FilterGroup> {
    map_group_at_path(group, group_path, |target| {
        let mut filters = target.filters.clone();
        filters.insert(index.min(filters.len()), node);
        Some(FilterGroup::new(target.group_operator, filters))
    })
}
