//! FILENAME: grid-state/src/controller.rs
//! PURPOSE: One table instance: state, layout, persistence and fetching.
//! CONTEXT: The controller owns the column specs, the user state (filter,
//! search, sort, column config), the current page of rows and the
//! warning collector. The column layout is rebuilt only when one of its
//! inputs changes; otherwise callers get the same `Arc` back, so a host
//! can compare layouts by pointer to skip re-rendering headers.
//!
//! Fetching is split into `begin_fetch` / `complete_fetch` for hosts that
//! resolve requests asynchronously. `refresh` drives both against the
//! controller's own data source.

use std::sync::Arc;
use filter_engine::{FilterField, FilterGroup, FilterSchema};
use grid_model::{ColumnSort, Diagnostic, Diagnostics, GroupBy};
use grouping_engine::{
    index_groups, ExpandedGroups, GroupIndex, Grouped, RowKey, RowKeyResolver, RowRef,
};
use layout_engine::{ColumnLayout, ColumnSpec, HeaderRow, LayoutOptions, RowAccess};
use crate::error::{FetchError, StateError};
use crate::fetch::{effective_sorts, DataSource, FetchRequest, FetchResponse, Pagination, QueryKey, RequestTracker};
use crate::options::TableOptions;
use crate::snapshot::{ColumnConfig, TableState};
use crate::store::{KeyValueStore, LayoutStore};
use crate::url::UrlState;

/// Inputs of a layout pass besides the specs themselves.
#[derive(Debug, Clone, PartialEq)]
struct LayoutKey {
    revision: u64,
    config: ColumnConfig,
    sorts: Vec<ColumnSort>,
}

/// Group tree of the current rows and the inputs it was built from.
struct GroupCache<R> {
    rows_revision: u64,
    group_by: Vec<GroupBy>,
    layout: Arc<ColumnLayout<R>>,
    index: Arc<GroupIndex>,
}

pub struct TableController<R, S, D> {
    options: TableOptions,
    specs: Vec<ColumnSpec<R>>,
    spec_revision: u64,
    state: TableState,
    pagination: Pagination,
    store: Option<LayoutStore<S>>,
    source: D,
    row_keys: Option<RowKeyResolver<R>>,
    diagnostics: Diagnostics,
    layout: Option<(LayoutKey, Arc<ColumnLayout<R>>)>,
    tracker: RequestTracker,
    last_query: Option<QueryKey>,
    rows: Vec<R>,
    /// Bumped whenever `rows` is replaced.
    rows_revision: u64,
    groups: Option<GroupCache<R>>,
    total: usize,
    footer: Option<R>,
    error: Option<FetchError>,
    expanded: ExpandedGroups,
}

impl<R, S, D> TableController<R, S, D>
where
    R: RowAccess,
    S: KeyValueStore,
    D: DataSource<R>,
{
    /// Creates the controller and loads the persisted column config when
    /// `persist_layout` is set.
    pub fn new(options: TableOptions, specs: Vec<ColumnSpec<R>>, store: S, source: D) -> Self {
        let mut diagnostics = Diagnostics::new();
        let (store, column_config) = if options.persist_layout {
            let store = LayoutStore::new(store, options.storage_prefix.clone(), options.table_id.clone());
            let config = store.load_config(&mut diagnostics);
            (Some(store), config)
        } else {
            (None, ColumnConfig::default())
        };

        log::debug!(
            target: "STATE",
            "[{}] created with {} column specs",
            options.table_id,
            specs.len()
        );

        TableController {
            pagination: Pagination::new(1, options.per_page),
            tracker: RequestTracker::new(options.stale_responses),
            options,
            specs,
            spec_revision: 0,
            state: TableState {
                column_config,
                ..Default::default()
            },
            store,
            source,
            row_keys: None,
            diagnostics,
            layout: None,
            last_query: None,
            rows: Vec::new(),
            rows_revision: 0,
            groups: None,
            total: 0,
            footer: None,
            error: None,
            expanded: ExpandedGroups::default(),
        }
    }

    /// Overrides the row identity (otherwise the primary-key column, or
    /// the row position without one).
    pub fn with_row_key(mut self, f: impl Fn(&R) -> RowKey + Send + Sync + 'static) -> Self {
        self.row_keys = Some(RowKeyResolver::identity(f));
        self.groups = None;
        self
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    // ========================================================================
    // LAYOUT
    // ========================================================================

    /// The current column layout, rebuilt only when the specs, column
    /// config or sort changed since the last call.
    pub fn layout(&mut self) -> Result<Arc<ColumnLayout<R>>, StateError> {
        let key = LayoutKey {
            revision: self.spec_revision,
            config: self.state.column_config.clone(),
            sorts: self.state.sort.clone(),
        };
        if let Some((cached, layout)) = &self.layout {
            if *cached == key {
                return Ok(Arc::clone(layout));
            }
        }

        let config = &self.state.column_config;
        let options = LayoutOptions {
            table_id: &self.options.table_id,
            visibility: Some(&config.visibility),
            column_order: Some(config.column_order.as_slice()).filter(|o| !o.is_empty()),
            group_by: &config.group_by,
            sorts: &self.state.sort,
        };
        let layout = Arc::new(ColumnLayout::build(&self.specs, &options, &mut self.diagnostics)?);
        log::debug!(
            target: "STATE",
            "[{}] layout rebuilt: {} leaves, {} header rows",
            self.options.table_id,
            layout.leaves.len(),
            layout.depth()
        );

        self.layout = Some((key, Arc::clone(&layout)));
        Ok(layout)
    }

    pub fn header_rows(&mut self) -> Result<Vec<HeaderRow>, StateError> {
        Ok(self.layout()?.header_rows.clone())
    }

    /// Replaces the column specs. The next `layout` call rebuilds.
    pub fn set_columns(&mut self, specs: Vec<ColumnSpec<R>>) {
        self.specs = specs;
        self.spec_revision += 1;
    }

    /// Schema the filter translator validates against.
    pub fn filter_schema(&mut self) -> Result<FilterSchema, StateError> {
        let layout = self.layout()?;
        let fields = layout
            .filter_fields()
            .into_iter()
            .map(|(key, filter)| FilterField::new(key, filter))
            .collect();
        Ok(FilterSchema::checked(self.options.table_id.clone(), fields, &mut self.diagnostics))
    }

    // ========================================================================
    // COLUMN CONFIG
    // ========================================================================

    /// Returns false when the column does not exist or cannot be toggled.
    pub fn set_column_visibility(&mut self, key: &str, visible: bool) -> Result<bool, StateError> {
        let layout = self.layout()?;
        let toggleable = layout
            .column(key)
            .is_some_and(|c| c.is_leaf() && c.enabled && c.can_toggle_visibility);
        if !toggleable {
            return Ok(false);
        }
        self.state
            .column_config
            .visibility
            .insert(key.to_string(), visible);
        self.persist()?;
        Ok(true)
    }

    pub fn set_column_order(&mut self, order: Vec<String>) -> Result<(), StateError> {
        self.state.column_config.column_order = order;
        self.persist()
    }

    /// Moves a leaf to `index` in the current display order.
    pub fn move_column(&mut self, key: &str, index: usize) -> Result<bool, StateError> {
        let mut order = self.layout()?.leaf_order();
        let Some(from) = order.iter().position(|k| k == key) else {
            return Ok(false);
        };
        let moved = order.remove(from);
        order.insert(index.min(order.len()), moved);
        self.set_column_order(order)?;
        Ok(true)
    }

    pub fn set_group_by(&mut self, group_by: Vec<GroupBy>) -> Result<(), StateError> {
        self.state.column_config.group_by = group_by;
        self.expanded = ExpandedGroups::default();
        self.pagination.page = 1;
        self.persist()
    }

    /// Drops all column preferences, persisted ones included.
    pub fn reset_layout(&mut self) {
        self.state.column_config = ColumnConfig::default();
        if let Some(store) = &mut self.store {
            store.clear();
        }
    }

    fn persist(&mut self) -> Result<(), StateError> {
        if let Some(store) = &mut self.store {
            store.save_config(&self.state.column_config)?;
        }
        Ok(())
    }

    // ========================================================================
    // QUERY STATE
    // ========================================================================

    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Snapshot for save/restore of a view.
    pub fn get_state(&self) -> TableState {
        self.state.clone()
    }

    /// Replaces the whole user state and returns to the first page.
    pub fn set_state(&mut self, state: TableState) -> Result<(), StateError> {
        self.state = state;
        self.pagination.page = 1;
        self.persist()
    }

    pub fn set_filter(&mut self, filter: FilterGroup) {
        self.state.filter = filter;
        self.pagination.page = 1;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.state.query = query.into();
        self.pagination.page = 1;
    }

    pub fn set_sorts(&mut self, sorts: Vec<ColumnSort>) {
        self.state.sort = sorts;
    }

    /// Header click: an unsorted column starts at its default direction,
    /// a sorted one flips. Returns false for non-sortable columns.
    pub fn toggle_sort(&mut self, key: &str) -> Result<bool, StateError> {
        let layout = self.layout()?;
        let Some(column) = layout.column(key).filter(|c| c.is_leaf() && c.sortable) else {
            return Ok(false);
        };
        let direction = match self.state.sort.iter().find(|s| s.column == key) {
            Some(current) => current.direction.reversed(),
            None => column.default_sort_dir,
        };
        self.state.sort = vec![ColumnSort::new(key, direction)];
        Ok(true)
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn set_page(&mut self, page: usize) {
        self.pagination = Pagination::new(page, self.pagination.per_page);
    }

    pub fn set_per_page(&mut self, per_page: usize) {
        self.pagination = Pagination::new(1, per_page);
    }

    pub fn page_count(&self) -> usize {
        self.pagination.page_count(self.total)
    }

    // ========================================================================
    // URL STATE
    // ========================================================================

    /// Defaults (first page, configured page size) are left out.
    pub fn url_state(&self) -> UrlState {
        let search = self.state.query.trim();
        UrlState {
            page: Some(self.pagination.page).filter(|&p| p > 1),
            per_page: Some(self.pagination.per_page).filter(|&n| n != self.options.per_page),
            search: (!search.is_empty()).then(|| search.to_string()),
            sorts: self.state.sort.clone(),
            filter: self.state.filter.clone(),
        }
    }

    pub fn to_query(&mut self) -> Result<String, StateError> {
        let schema = self.filter_schema()?;
        Ok(self.url_state().to_query(&self.options.url_keys, &schema))
    }

    /// Applies a query string. Parameters that are missing reset to their
    /// defaults.
    pub fn apply_query(&mut self, text: &str) -> Result<(), StateError> {
        let schema = self.filter_schema()?;
        let url = UrlState::from_query(text, &self.options.url_keys, &schema, &mut self.diagnostics);

        self.pagination = Pagination::new(
            url.page.unwrap_or(1),
            url.per_page.unwrap_or(self.options.per_page),
        );
        self.state.query = url.search.unwrap_or_default();
        self.state.sort = url.sorts;
        self.state.filter = url.filter;
        Ok(())
    }

    // ========================================================================
    // FETCHING
    // ========================================================================

    fn build_request(&mut self, sequence: u64) -> Result<FetchRequest, StateError> {
        let layout = self.layout()?;
        let filters = self.state.filter.prune_incomplete();
        let search = self.state.query.trim();
        let group_by = self.state.column_config.group_by.clone();

        Ok(FetchRequest {
            sequence,
            pagination: self.pagination,
            search: (!search.is_empty()).then(|| search.to_string()),
            filters: (!filters.is_empty()).then_some(filters),
            sorts: effective_sorts(&group_by, &self.state.sort),
            group_by,
            visible_columns: layout.visible_leaves().cloned().collect(),
        })
    }

    /// True when the current state asks for different data than the last
    /// issued request.
    pub fn needs_refresh(&mut self) -> Result<bool, StateError> {
        let key = self.build_request(0)?.query_key();
        Ok(self.last_query.as_ref() != Some(&key))
    }

    /// Issues a request for the current state and marks the table loading.
    pub fn begin_fetch(&mut self) -> Result<FetchRequest, StateError> {
        // Built before issuing so a layout error leaves the tracker idle.
        let mut request = self.build_request(0)?;
        let sequence = self.tracker.issue();
        request.sequence = sequence;
        self.last_query = Some(request.query_key());
        log::debug!(
            target: "STATE",
            "[{}] fetch #{} page {} ({} per page)",
            self.options.table_id,
            sequence,
            request.pagination.page,
            request.pagination.per_page
        );
        Ok(request)
    }

    /// Applies the outcome of request `sequence`. Returns false when the
    /// outcome was discarded as stale. A failure keeps the previous rows.
    pub fn complete_fetch(
        &mut self,
        sequence: u64,
        outcome: Result<FetchResponse<R>, FetchError>,
    ) -> bool {
        if !self.tracker.resolve(sequence) {
            return false;
        }
        match outcome {
            Ok(response) => {
                let (rows, total, footer) = response.into_parts();
                self.rows = rows;
                self.rows_revision += 1;
                self.total = total;
                self.footer = footer;
                self.error = None;

                let clamped = self.pagination.clamp_to(total);
                if clamped != self.pagination {
                    log::debug!(
                        target: "STATE",
                        "[{}] page {} out of range, moving to {}",
                        self.options.table_id,
                        self.pagination.page,
                        clamped.page
                    );
                    self.pagination = clamped;
                }
            }
            Err(e) => {
                log::warn!(target: "STATE", "[{}] fetch #{} failed: {}", self.options.table_id, sequence, e);
                self.error = Some(e);
            }
        }
        true
    }

    /// Fetches synchronously from the controller's data source.
    pub fn refresh(&mut self) -> Result<(), StateError> {
        let request = self.begin_fetch()?;
        let layout = self.layout()?;
        let outcome = self.source.fetch(&request, layout.as_ref());
        let failure = outcome.as_ref().err().cloned();
        self.complete_fetch(request.sequence, outcome);
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.tracker.is_loading()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn footer(&self) -> Option<&R> {
        self.footer.as_ref()
    }

    /// Error of the last applied request, cleared by the next success.
    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    // ========================================================================
    // GROUPING
    // ========================================================================

    /// Group tree of the current rows. The same instance is returned
    /// until the rows, the group-by list or the layout change.
    pub fn group_index(&mut self) -> Result<Arc<GroupIndex>, StateError> {
        let layout = self.layout()?;
        let group_by = &self.state.column_config.group_by;
        if let Some(cache) = &self.groups {
            if cache.rows_revision == self.rows_revision
                && Arc::ptr_eq(&cache.layout, &layout)
                && cache.group_by == *group_by
            {
                return Ok(Arc::clone(&cache.index));
            }
        }

        let keys = match &self.row_keys {
            Some(keys) => keys.clone(),
            None => RowKeyResolver::from_layout(&layout),
        };
        let index = Arc::new(index_groups(&self.rows, group_by, layout.as_ref(), &keys));
        self.groups = Some(GroupCache {
            rows_revision: self.rows_revision,
            group_by: group_by.clone(),
            layout,
            index: Arc::clone(&index),
        });
        Ok(index)
    }

    /// The current rows grouped by the active group-by columns.
    pub fn grouped(&mut self) -> Result<Grouped<RowRef<'_, R>>, StateError> {
        let index = self.group_index()?;
        Ok(index.attach(&self.rows))
    }

    pub fn expanded(&self) -> &ExpandedGroups {
        &self.expanded
    }

    pub fn expanded_mut(&mut self) -> &mut ExpandedGroups {
        &mut self.expanded
    }

    /// Drains warnings recorded since the last call.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter_engine::FilterItem;
    use grid_model::{DiagnosticKind, Operator, SortDirection, StructuredValue};
    use grouping_engine::{visible_lines, DisplayLine};
    use layout_engine::ColumnLookup;
    use crate::local::LocalDataSource;
    use crate::options::StaleResponsePolicy;
    use crate::store::MemoryStore;

    type Controller = TableController<StructuredValue, MemoryStore, LocalDataSource<StructuredValue>>;

    fn person(id: i64, name: &str, team: &str) -> StructuredValue {
        StructuredValue::map([
            ("id", StructuredValue::from(id)),
            ("name", StructuredValue::from(name)),
            ("team", StructuredValue::from(team)),
        ])
    }

    fn specs() -> Vec<ColumnSpec<StructuredValue>> {
        vec![
            ColumnSpec::new("id").primary_key().sortable(true),
            ColumnSpec::new("name").sortable(true).default_sort_dir(SortDirection::Desc),
            ColumnSpec::new("team"),
        ]
    }

    fn rows() -> Vec<StructuredValue> {
        vec![
            person(1, "Ada", "red"),
            person(2, "Bob", "blue"),
            person(3, "Cy", "red"),
            person(4, "Di", "blue"),
            person(5, "Ed", "red"),
        ]
    }

    fn controller_with(store: MemoryStore) -> Controller {
        let mut options = TableOptions::new("people");
        options.per_page = 2;
        TableController::new(options, specs(), store, LocalDataSource::new(rows()))
    }

    fn controller() -> Controller {
        controller_with(MemoryStore::new())
    }

    fn ids(rows: &[StructuredValue]) -> Vec<f64> {
        rows.iter().filter_map(|r| r.get("id").and_then(|v| v.as_f64())).collect()
    }

    #[test]
    fn test_layout_is_reused_until_inputs_change() {
        let mut table = controller();
        let first = table.layout().unwrap();
        let second = table.layout().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        table.set_query("x");
        assert!(Arc::ptr_eq(&first, &table.layout().unwrap()));

        table.set_column_visibility("team", false).unwrap();
        let third = table.layout().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(!third.column("team").unwrap().is_visible);
    }

    #[test]
    fn test_refresh_pages_through_local_rows() {
        let mut table = controller();
        table.refresh().unwrap();
        assert_eq!(ids(table.rows()), vec![1.0, 2.0]);
        assert_eq!(table.total(), 5);
        assert_eq!(table.page_count(), 3);
        assert!(!table.is_loading());

        table.set_page(3);
        table.refresh().unwrap();
        assert_eq!(ids(table.rows()), vec![5.0]);
    }

    #[test]
    fn test_filter_and_search_reset_page() {
        let mut table = controller();
        table.set_page(2);
        table.set_filter(FilterGroup::and(vec![FilterItem::new("team", Operator::Equals, "red").into()]));
        assert_eq!(table.pagination().page, 1);

        table.refresh().unwrap();
        assert_eq!(table.total(), 3);

        table.set_query("cy");
        table.refresh().unwrap();
        assert_eq!(ids(table.rows()), vec![3.0]);
    }

    #[test]
    fn test_toggle_sort_uses_default_direction_then_flips() {
        let mut table = controller();
        assert!(table.toggle_sort("name").unwrap());
        assert_eq!(table.state().sort, vec![ColumnSort::new("name", SortDirection::Desc)]);
        assert!(table.toggle_sort("name").unwrap());
        assert_eq!(table.state().sort, vec![ColumnSort::new("name", SortDirection::Asc)]);

        assert!(!table.toggle_sort("team").unwrap());
        assert!(!table.toggle_sort("missing").unwrap());
    }

    #[test]
    fn test_column_config_is_persisted() {
        let mut table = controller();
        table.set_column_visibility("team", false).unwrap();
        table.move_column("name", 0).unwrap();
        table
            .set_group_by(vec![GroupBy::new("team", SortDirection::Asc)])
            .unwrap();

        let store = table.store.take().unwrap().into_inner();
        let mut reopened = controller_with(store);
        let config = &reopened.state().column_config;
        assert_eq!(config.visibility.get("team"), Some(&false));
        assert_eq!(config.column_order, vec!["name", "id", "team"]);
        assert_eq!(config.group_by.len(), 1);

        let layout = reopened.layout().unwrap();
        assert_eq!(layout.leaf_order(), vec!["name", "id", "team"]);
    }

    #[test]
    fn test_malformed_persisted_order_is_ignored() {
        let mut store = MemoryStore::new();
        store.set("grid:people:order", "not json".to_string());
        let mut table = controller_with(store);

        assert!(table.state().column_config.column_order.is_empty());
        let warnings = table.take_diagnostics();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, DiagnosticKind::MalformedStoredValue);
        assert_eq!(table.layout().unwrap().leaf_order(), vec!["id", "name", "team"]);
    }

    #[test]
    fn test_persisted_keys_for_missing_columns_are_ignored() {
        let mut store = MemoryStore::new();
        store.set("grid:people:visibility", r#"{"ghost":false,"team":false}"#.to_string());
        store.set("grid:people:order", r#"["ghost","team","id"]"#.to_string());
        let mut table = controller_with(store);

        let layout = table.layout().unwrap();
        assert!(layout.column("ghost").is_none());
        assert_eq!(layout.leaf_order(), vec!["team", "id", "name"]);
        assert!(!layout.column("team").unwrap().is_visible);
        assert!(layout.column("name").unwrap().is_visible);
        assert!(!layout.visibility().contains_key("ghost"));

        table.refresh().unwrap();
        assert_eq!(table.total(), 5);
    }

    #[test]
    fn test_query_round_trip() {
        let mut table = controller();
        table.set_query("bob");
        table.set_page(2);
        table.set_sorts(vec![ColumnSort::new("name", SortDirection::Asc)]);
        let query = table.to_query().unwrap();
        assert_eq!(query, "page=2&q=bob&sort=(name:asc)");

        let mut other = controller();
        other.apply_query(&query).unwrap();
        assert_eq!(other.pagination().page, 2);
        assert_eq!(other.state().query, "bob");
        assert_eq!(other.state().sort, table.state().sort);
    }

    #[test]
    fn test_state_snapshot_restores_view() {
        let mut table = controller();
        table.set_query("cy");
        table.set_column_visibility("team", false).unwrap();
        let saved = table.get_state();

        let mut other = controller();
        other.set_state(saved.clone()).unwrap();
        assert_eq!(other.get_state(), saved);
        other.refresh().unwrap();
        assert_eq!(ids(other.rows()), vec![3.0]);
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut table = controller();
        assert_eq!(table.options().stale_responses, StaleResponsePolicy::DropStale);

        let first = table.begin_fetch().unwrap();
        let second = table.begin_fetch().unwrap();
        assert!(table.is_loading());

        assert!(table.complete_fetch(second.sequence, Ok(FetchResponse::Rows(vec![person(9, "New", "red")]))));
        assert!(!table.complete_fetch(first.sequence, Ok(FetchResponse::Rows(vec![person(8, "Old", "red")]))));
        assert_eq!(ids(table.rows()), vec![9.0]);
        assert!(!table.is_loading());
    }

    #[test]
    fn test_failure_keeps_previous_rows() {
        let mut table = controller();
        table.refresh().unwrap();

        let request = table.begin_fetch().unwrap();
        assert!(table.complete_fetch(request.sequence, Err(FetchError::Rejected("offline".to_string()))));
        assert_eq!(ids(table.rows()), vec![1.0, 2.0]);
        assert_eq!(table.error(), Some(&FetchError::Rejected("offline".to_string())));
        assert!(!table.is_loading());
    }

    #[test]
    fn test_refresh_reports_rejection() {
        let source = |_: &FetchRequest, _: &dyn ColumnLookup<StructuredValue>| -> Result<FetchResponse<StructuredValue>, FetchError> {
            Err(FetchError::Rejected("boom".to_string()))
        };
        let mut table = TableController::new(TableOptions::new("t"), specs(), MemoryStore::new(), source);
        assert!(matches!(table.refresh(), Err(StateError::Fetch(_))));
        assert!(table.error().is_some());
    }

    #[test]
    fn test_needs_refresh_tracks_query() {
        let mut table = controller();
        assert!(table.needs_refresh().unwrap());
        table.refresh().unwrap();
        assert!(!table.needs_refresh().unwrap());
        table.set_query("a");
        assert!(table.needs_refresh().unwrap());
    }

    #[test]
    fn test_grouped_page() {
        let mut table = controller();
        table.set_per_page(10);
        table
            .set_group_by(vec![GroupBy::new("team", SortDirection::Asc)])
            .unwrap();
        table.refresh().unwrap();

        // Group-by columns lead the sort, so rows arrive clustered
        assert_eq!(ids(table.rows()), vec![2.0, 4.0, 1.0, 3.0, 5.0]);

        table.expanded_mut().expand_all();
        let expanded = table.expanded().clone();
        let grouped = table.grouped().unwrap();
        assert_eq!(grouped.row_count(), 5);
        let lines = visible_lines(&grouped, &expanded);
        assert_eq!(lines.len(), 7);
        assert!(matches!(lines[0], DisplayLine::Group { expanded: true, .. }));
    }

    #[test]
    fn test_group_tree_is_reused_until_rows_change() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let specs = vec![
            ColumnSpec::new("id").primary_key(),
            ColumnSpec::computed("team", move |r: &StructuredValue| {
                counter.fetch_add(1, Ordering::SeqCst);
                r.get("team").cloned().unwrap_or_default()
            }),
        ];
        let mut table = TableController::new(
            TableOptions::new("people"),
            specs,
            MemoryStore::new(),
            LocalDataSource::new(rows()),
        );
        table
            .set_group_by(vec![GroupBy::new("team", SortDirection::Asc)])
            .unwrap();
        table.refresh().unwrap();

        let first = table.group_index().unwrap();
        let after_build = reads.load(Ordering::SeqCst);
        assert_eq!(table.grouped().unwrap().row_count(), 5);
        assert_eq!(table.grouped().unwrap().row_count(), 5);
        assert!(Arc::ptr_eq(&first, &table.group_index().unwrap()));
        assert_eq!(reads.load(Ordering::SeqCst), after_build);

        table.refresh().unwrap();
        let second = table.group_index().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.row_count(), 5);

        table.set_group_by(Vec::new()).unwrap();
        assert!(!table.group_index().unwrap().is_grouped());
    }

    #[test]
    fn test_layout_error_does_not_start_a_fetch() {
        let mut table = TableController::new(
            TableOptions::new("people"),
            vec![ColumnSpec::group("G", Vec::new())],
            MemoryStore::new(),
            LocalDataSource::new(rows()),
        );
        assert!(table.begin_fetch().is_err());
        assert!(!table.is_loading());
        assert!(table.refresh().is_err());
        assert!(!table.is_loading());
    }
}
