//! Error types for package export.

use thiserror::Error;

/// Errors raised by a content store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while building or publishing a content package.
///
/// Nothing here escapes [`PackageResolver::resolve`](crate::PackageResolver::resolve):
/// every variant collapses to "no resource" at that boundary.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a document: {0}")]
    NotDocument(String),

    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    #[error("{path} has no {property} property")]
    MissingProperty { path: String, property: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML writing error: {0}")]
    Xml(String),
}

impl ExportError {
    /// True for the variants that mean "nothing to export" rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExportError::NotFound(_) | ExportError::NotDocument(_))
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::MalformedStructure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
