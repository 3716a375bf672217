//! Error types for search runs and archive operations

use snippy_domain::QueryError;
use thiserror::Error;

/// Errors that can occur while running or archiving a search
#[derive(Error, Debug)]
pub enum SearchError {
    /// Query rejected before the run started
    #[error("Invalid query: {0}")]
    Validation(#[from] QueryError),

    /// Page fetch failed; the run keeps its partial results
    #[error("Provider error: {0}")]
    Provider(String),

    /// A run is already active in this session
    #[error("A search is already running")]
    Conflict,

    /// Rejected user input outside the query itself
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Requested saved search, project, section or block does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// CSV export error
    #[error("Export error: {0}")]
    Export(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}

impl From<csv::Error> for SearchError {
    fn from(e: csv::Error) -> Self {
        SearchError::Export(e.to_string())
    }
}

impl From<std::io::Error> for SearchError {
    fn from(e: std::io::Error) -> Self {
        SearchError::Export(e.to_string())
    }
}
