//! FILENAME: grid-state/src/lib.rs
//! Table state subsystem for the data grid.
//!
//! Ties the column layout, filter translator, codec and grouping engine
//! together into one table instance.
//!
//! Layers:
//! - `options`: Per-table configuration
//! - `snapshot`: Serializable user state (filter, search, sort, column config)
//! - `store`: Persisted column config behind a host key-value store
//! - `url`: Query-string form of the state
//! - `fetch`: Data-fetch contract, pagination and stale-response guard
//! - `local`: In-memory data source over a static row array
//! - `controller`: The table instance tying it all together

pub mod controller;
pub mod error;
pub mod fetch;
pub mod local;
pub mod options;
pub mod snapshot;
pub mod store;
pub mod url;

pub use controller::TableController;
pub use error::{FetchError, StateError};
pub use fetch::{
    effective_sorts, DataSource, FetchRequest, FetchResponse, Pagination, QueryKey, RequestTracker,
};
pub use local::{compare_values, LocalDataSource};
pub use options::{StaleResponsePolicy, TableOptions, UrlKeys};
pub use snapshot::{ColumnConfig, TableState};
pub use store::{KeyValueStore, LayoutStore, MemoryStore};
pub use url::UrlState;
