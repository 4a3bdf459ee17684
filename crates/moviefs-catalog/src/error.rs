//! Catalog error types.

use std::io;
use thiserror::Error;

/// Catalog error type.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// SQLite failure.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error while reading a metadata document.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Metadata document could not be parsed.
    #[error("malformed metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Metadata parsed but is unusable (bad date, missing name, ...).
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl CatalogError {
    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }
}

/// Catalog result type.
pub type CatalogResult<T> = Result<T, CatalogError>;
