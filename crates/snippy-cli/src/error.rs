//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Search, archive or export failure
    #[error(transparent)]
    Search(#[from] snippy_engine::SearchError),

    /// Database error
    #[error("Database error: {0}")]
    Store(#[from] snippy_store::StoreError),

    /// Provider setup error
    #[error("Provider error: {0}")]
    Provider(#[from] snippy_providers::ProviderError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML writing error
    #[error("TOML serialization error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// Line editor error
    #[error("Editor error: {0}")]
    Editor(#[from] rustyline::error::ReadlineError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<snippy_domain::QueryError> for CliError {
    fn from(err: snippy_domain::QueryError) -> Self {
        CliError::Search(err.into())
    }
}
