//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// Incremental update attempted before the index was created
    #[error("Search index does not exist at {0}, run `invoice-vault index` to create it")]
    IndexMissing(String),

    /// Query attempted before the index was built
    #[error("Search index not found at {0}, run `invoice-vault index` to build it")]
    IndexNotFound(String),

    /// Issue date does not match the configured format
    #[error("date {raw} doesn't match the format {format}")]
    DateParse { raw: String, format: String },

    /// Query failed structural validation
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Search execution failed
    #[error("Search execution failed: {0}")]
    SearchFailed(String),

    /// Document indexing failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// Rebuild stopped at a document boundary
    #[error("Rebuild cancelled after {indexed} documents")]
    Cancelled { indexed: usize },

    /// Schema error
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Workspace could not be scanned
    #[error("Workspace error: {0}")]
    Workspace(#[from] crate::store::StoreError),

    /// Tantivy error
    #[error("Tantivy error: {0}")]
    TantivyError(String),
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        SearchError::TantivyError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for SearchError {
    fn from(err: validator::ValidationErrors) -> Self {
        SearchError::InvalidConfiguration(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::InvalidQuery(msg) => AppError::Validation(msg),
            SearchError::IndexMissing(_) | SearchError::IndexNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            SearchError::IoError(err) => AppError::Io(err),
            SearchError::Workspace(err) => AppError::Store(err),
            _ => AppError::Search(err.to_string()),
        }
    }
}
