//! FILENAME: grid-state/src/error.rs

use thiserror::Error;
use layout_engine::LayoutError;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

/// A rejection reported by the data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Data source rejected the request: {0}")]
    Rejected(String),
}
