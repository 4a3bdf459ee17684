//! VFS error types.

use std::io;
use thiserror::Error;

use moviefs_catalog::CatalogError;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Unknown facet, unknown selector, unresolved item, or an operation at a
    /// depth where it has no meaning.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not supported here (e.g. a facet without levels).
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// Rejected at construction (unknown facet name).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Catalog query failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Returns true for [`VfsError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::NotFound(_))
    }

    /// Returns true for [`VfsError::Unsupported`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, VfsError::Unsupported(_))
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::Unsupported(msg) => io::Error::new(io::ErrorKind::Unsupported, msg),
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Catalog(e) => io::Error::other(e),
            VfsError::Io(e) => e,
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
