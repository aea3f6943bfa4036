//! FILENAME: grouping-engine/src/expand.rs
//! Expand/collapse state of group rows and the display lines it yields.
//!
//! State is keyed by composite group key so it survives refetches and can
//! be persisted next to the group-by list.

use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};
use crate::tree::{GroupChildren, GroupNode, Grouped};

/// Which groups are open. Keys in `toggled` invert `default_expanded`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedGroups {
    #[serde(default)]
    pub default_expanded: bool,
    #[serde(default)]
    pub toggled: BTreeSet<String>,
}

impl ExpandedGroups {
    pub fn collapsed() -> Self {
        Self::default()
    }

    pub fn expanded() -> Self {
        ExpandedGroups {
            default_expanded: true,
            toggled: BTreeSet::new(),
        }
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.default_expanded != self.toggled.contains(key)
    }

    pub fn toggle(&mut self, key: &str) {
        if !self.toggled.remove(key) {
            self.toggled.insert(key.to_string());
        }
    }

    pub fn set_expanded(&mut self, key: &str, expanded: bool) {
        if self.is_expanded(key) != expanded {
            self.toggle(key);
        }
    }

    pub fn expand_all(&mut self) {
        *self = Self::expanded();
    }

    pub fn collapse_all(&mut self) {
        *self = Self::collapsed();
    }
}

/// One rendered line of a grouped body. `T` is the tree's row handle.
#[derive(Debug, PartialEq)]
pub enum DisplayLine<'a, T> {
    Group {
        node: &'a GroupNode<T>,
        expanded: bool,
    },
    Row {
        row: &'a T,
        /// Nesting depth of the row (0 when ungrouped).
        level: usize,
    },
}

/// Flattens the group tree into lines, skipping the content of collapsed
/// groups.
pub fn visible_lines<'a, T>(
    grouped: &'a Grouped<T>,
    expanded: &ExpandedGroups,
) -> Vec<DisplayLine<'a, T>> {
    let mut lines = Vec::new();
    match grouped {
        Grouped::Flat(rows) => {
            lines.extend(rows.iter().map(|row| DisplayLine::Row { row, level: 0 }));
        }
        Grouped::Groups(groups) => {
            for group in groups {
                push_group(group, expanded, &mut lines);
            }
        }
    }
    lines
}

fn push_group<'a, T>(
    node: &'a GroupNode<T>,
    expanded: &ExpandedGroups,
    lines: &mut Vec<DisplayLine<'a, T>>,
) {
    let is_open = expanded.is_expanded(&node.key);
    lines.push(DisplayLine::Group {
        node,
        expanded: is_open,
    });
    if !is_open {
        return;
    }
    match &node.children {
        GroupChildren::Groups(groups) => {
            for group in groups {
                push_group(group, expanded, lines);
            }
        }
        GroupChildren::Rows(rows) => {
            lines.extend(rows.iter().map(|row| DisplayLine::Row {
                row,
                level: node.level,
            }));
        }
    }
}
