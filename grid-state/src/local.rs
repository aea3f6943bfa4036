//! FILENAME: grid-state/src/local.rs
//! Local Data Source - Serves a static row array as if it were remote.
//!
//! Filtering, search, sorting and paging happen in memory using the
//! column lookups of the current layout.

use std::cmp::Ordering;
use filter_engine::matches;
use grid_model::{ColumnSort, SortDirection, StructuredValue};
use layout_engine::ColumnLookup;
use crate::error::FetchError;
use crate::fetch::{DataSource, FetchRequest, FetchResponse};

#[derive(Debug, Clone, Default)]
pub struct LocalDataSource<R> {
    rows: Vec<R>,
}

impl<R: Clone> LocalDataSource<R> {
    pub fn new(rows: Vec<R>) -> Self {
        LocalDataSource { rows }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn set_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
    }

    fn passes(&self, row: &R, request: &FetchRequest, columns: &dyn ColumnLookup<R>) -> bool {
        if let Some(filters) = &request.filters {
            if !matches(filters, &|key: &str| columns.cell_value(key, row)) {
                return false;
            }
        }
        match request.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                request.visible_columns.iter().any(|column| {
                    columns
                        .cell_value(&column.key, row)
                        .is_some_and(|v| v.to_string().to_lowercase().contains(&term))
                })
            }
            _ => true,
        }
    }
}

impl<R: Clone> DataSource<R> for LocalDataSource<R> {
    fn fetch(
        &mut self,
        request: &FetchRequest,
        columns: &dyn ColumnLookup<R>,
    ) -> Result<FetchResponse<R>, FetchError> {
        let mut selected: Vec<&R> = self
            .rows
            .iter()
            .filter(|row| self.passes(row, request, columns))
            .collect();

        if !request.sorts.is_empty() {
            selected.sort_by(|a, b| compare_rows(*a, *b, &request.sorts, columns));
        }

        let total = selected.len();
        let data = selected
            .into_iter()
            .skip(request.pagination.offset())
            .take(request.pagination.per_page)
            .cloned()
            .collect();

        log::trace!(target: "STATE", "local fetch #{}: {} matching rows", request.sequence, total);
        Ok(FetchResponse::Page {
            data,
            total,
            footer: None,
        })
    }
}

fn compare_rows<R>(a: &R, b: &R, sorts: &[ColumnSort], columns: &dyn ColumnLookup<R>) -> Ordering {
    for sort in sorts {
        let ordering = compare_values(
            columns.cell_value(&sort.column, a).as_ref(),
            columns.cell_value(&sort.column, b).as_ref(),
        );
        let ordering = match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Numbers numerically, everything else by display text. Missing and
/// null values sort first.
pub fn compare_values(a: Option<&StructuredValue>, b: Option<&StructuredValue>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(StructuredValue::Number(x)), Some(StructuredValue::Number(y))) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (Some(x), Some(y)) => x.to_string().to_lowercase().cmp(&y.to_string().to_lowercase()),
    }
}
