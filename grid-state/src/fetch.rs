//! FILENAME: grid-state/src/fetch.rs
//! PURPOSE: The data-fetch contract between the table and its data source.
//! CONTEXT: A request carries everything the source needs to produce one
//! page. Requests are numbered; `RequestTracker` decides whether a
//! response that arrives after a newer request was issued still applies.

use serde::{Deserialize, Serialize};
use filter_engine::FilterGroup;
use grid_model::{ColumnSort, GroupBy};
use layout_engine::{Column, ColumnLookup};
use crate::error::FetchError;
use crate::options::StaleResponsePolicy;

// ============================================================================
// PAGINATION
// ============================================================================

/// One-based page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Pagination {
    pub fn new(page: usize, per_page: usize) -> Self {
        Pagination {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Index of the first row of the page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.per_page
    }

    /// Number of pages for `total` rows (at least one).
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.per_page.max(1)).max(1)
    }

    /// Moves back onto the last page when the total shrank below the
    /// current page.
    pub fn clamp_to(self, total: usize) -> Self {
        Pagination {
            page: self.page.min(self.page_count(total)),
            ..self
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::new(1, 25)
    }
}

// ============================================================================
// REQUEST / RESPONSE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// Issue number, increasing per table.
    pub sequence: u64,
    pub pagination: Pagination,
    pub search: Option<String>,
    /// Complete conditions only; `None` when nothing filters.
    pub filters: Option<FilterGroup>,
    /// Group-by columns first, then the user sort.
    pub sorts: Vec<ColumnSort>,
    pub group_by: Vec<GroupBy>,
    pub visible_columns: Vec<Column>,
}

impl FetchRequest {
    /// Two requests with equal query keys ask for the same data.
    pub fn query_key(&self) -> QueryKey {
        QueryKey {
            pagination: self.pagination,
            search: self.search.clone(),
            filters: self.filters.clone(),
            sorts: self.sorts.clone(),
            group_by: self.group_by.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryKey {
    pub pagination: Pagination,
    pub search: Option<String>,
    pub filters: Option<FilterGroup>,
    pub sorts: Vec<ColumnSort>,
    pub group_by: Vec<GroupBy>,
}

/// What a data source returns: either the bare rows, or a page with the
/// total row count and an optional footer row.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResponse<R> {
    Rows(Vec<R>),
    Page {
        data: Vec<R>,
        total: usize,
        footer: Option<R>,
    },
}

impl<R> FetchResponse<R> {
    /// (rows, total, footer). A bare row list reports its own length as
    /// the total.
    pub fn into_parts(self) -> (Vec<R>, usize, Option<R>) {
        match self {
            FetchResponse::Rows(rows) => {
                let total = rows.len();
                (rows, total, None)
            }
            FetchResponse::Page { data, total, footer } => (data, total, footer),
        }
    }
}

/// Produces rows for a request. `columns` resolves cell values for
/// sources that filter or sort client-side.
pub trait DataSource<R> {
    fn fetch(
        &mut self,
        request: &FetchRequest,
        columns: &dyn ColumnLookup<R>,
    ) -> Result<FetchResponse<R>, FetchError>;
}

impl<R, F> DataSource<R> for F
where
    F: FnMut(&FetchRequest, &dyn ColumnLookup<R>) -> Result<FetchResponse<R>, FetchError>,
{
    fn fetch(
        &mut self,
        request: &FetchRequest,
        columns: &dyn ColumnLookup<R>,
    ) -> Result<FetchResponse<R>, FetchError> {
        self(request, columns)
    }
}

/// Sort order sent to the source: group-by columns lead so rows arrive
/// clustered by group, followed by the user sort minus those columns.
pub fn effective_sorts(group_by: &[GroupBy], sorts: &[ColumnSort]) -> Vec<ColumnSort> {
    let mut result: Vec<ColumnSort> = group_by
        .iter()
        .map(|g| ColumnSort::new(g.column.clone(), g.direction))
        .collect();
    result.extend(
        sorts
            .iter()
            .filter(|s| !group_by.iter().any(|g| g.column == s.column))
            .cloned(),
    );
    result
}

// ============================================================================
// REQUEST TRACKING
// ============================================================================

/// Numbers requests and filters their responses by policy.
#[derive(Debug, Default)]
pub struct RequestTracker {
    policy: StaleResponsePolicy,
    issued: u64,
    applied: u64,
    loading: bool,
}

impl RequestTracker {
    pub fn new(policy: StaleResponsePolicy) -> Self {
        RequestTracker {
            policy,
            ..Default::default()
        }
    }

    /// Starts a request and returns its sequence number.
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.loading = true;
        self.issued
    }

    pub fn latest(&self) -> u64 {
        self.issued
    }

    /// Sequence of the last response that was applied.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Marks `sequence` as resolved and returns whether its outcome should
    /// be applied.
    pub fn resolve(&mut self, sequence: u64) -> bool {
        match self.policy {
            StaleResponsePolicy::DropStale => {
                if sequence != self.issued {
                    log::debug!(
                        target: "STATE",
                        "dropping response {} (latest is {})",
                        sequence,
                        self.issued
                    );
                    return false;
                }
                self.loading = false;
            }
            StaleResponsePolicy::LastResolvedWins => {
                if sequence == self.issued {
                    self.loading = false;
                }
            }
        }
        self.applied = sequence;
        true
    }
}
