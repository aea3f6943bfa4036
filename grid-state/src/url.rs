//! FILENAME: grid-state/src/url.rs
//! PURPOSE: Table state <-> query string.
//! CONTEXT: Page, page size, search, sort and filter are written with the
//! nested-value codec so a table's view can be bookmarked. Parameter names
//! come from `UrlKeys`. Reading never fails: values that do not parse are
//! left out, and filter entries the schema rejects are reported through
//! the diagnostics collector.

use filter_engine::{from_text, to_text, FilterGroup, FilterSchema};
use grid_model::{ColumnSort, Diagnostics, ScalarKind, SortDirection, StructuredValue, ValueMap};
use crate::options::UrlKeys;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlState {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub search: Option<String>,
    pub sorts: Vec<ColumnSort>,
    pub filter: FilterGroup,
}

impl UrlState {
    pub fn to_query(&self, keys: &UrlKeys, schema: &FilterSchema) -> String {
        let mut map = ValueMap::new();

        if let Some(page) = self.page {
            map.insert(keys.page.clone(), StructuredValue::from(page as f64));
        }
        if let Some(per_page) = self.per_page {
            map.insert(keys.per_page.clone(), StructuredValue::from(per_page as f64));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            map.insert(keys.search.clone(), StructuredValue::from(search));
        }
        if !self.sorts.is_empty() {
            let sorts = self
                .sorts
                .iter()
                .map(|s| {
                    StructuredValue::map([(s.column.as_str(), StructuredValue::from(s.direction.as_str()))])
                })
                .collect::<Vec<_>>();
            map.insert(keys.sort.clone(), StructuredValue::array(sorts));
        }
        let filter = self.filter.prune_incomplete();
        if !filter.is_empty() {
            map.insert(keys.filter.clone(), to_text(&filter, schema));
        }

        codec::stringify(&StructuredValue::Map(map))
    }

    pub fn from_query(
        text: &str,
        keys: &UrlKeys,
        schema: &FilterSchema,
        diagnostics: &mut Diagnostics,
    ) -> UrlState {
        let parsed = codec::parse(text);

        UrlState {
            page: parsed.get(&keys.page).and_then(positive_integer),
            per_page: parsed.get(&keys.per_page).and_then(positive_integer),
            search: parsed
                .get(&keys.search)
                .map(|v| v.to_string())
                .filter(|s| !s.is_empty()),
            sorts: parsed.get(&keys.sort).map(read_sorts).unwrap_or_default(),
            filter: parsed
                .get(&keys.filter)
                .map(|v| from_text(v, schema, diagnostics))
                .unwrap_or_default(),
        }
    }
}

fn positive_integer(value: &StructuredValue) -> Option<usize> {
    let n = value.coerce(ScalarKind::Number).as_f64()?;
    (n >= 1.0 && n.fract() == 0.0 && n <= usize::MAX as f64).then_some(n as usize)
}

/// A single `(column:dir)` decodes as a map, several as an array of maps.
fn read_sorts(value: &StructuredValue) -> Vec<ColumnSort> {
    let entries: Vec<&StructuredValue> = match value {
        StructuredValue::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut sorts: Vec<ColumnSort> = Vec::new();
    for map in entries.into_iter().filter_map(StructuredValue::as_map) {
        for (column, dir) in map {
            let Some(direction) = dir.as_str().and_then(SortDirection::parse) else {
                log::debug!(target: "STATE", "ignoring sort '{}' with direction '{}'", column, dir);
                continue;
            };
            if !sorts.iter().any(|s| &s.column == column) {
                sorts.push(ColumnSort::new(column.clone(), direction));
            }
        }
    }
    sorts
}
