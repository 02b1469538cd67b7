//! Store error types
//!
//! Defines all errors that can occur talking to a document store, and the
//! coarse classification views use to decide how to surface them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in a document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store cannot be reached or has been shut down
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The collection is not accessible to this client
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Requested document does not exist
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Malformed query (bad collection name, missing order key, ...)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Document could not be written or decoded
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),

    /// Error reported by a remote store, already classified and worded
    #[error("{message}")]
    Remote { kind: ErrorKind, message: String },
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Coarse error classification shared by the store and the views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Store unreachable or closed
    Network,
    /// Access to the collection was refused
    Permission,
    /// Target document is gone
    NotFound,
    /// Input rejected before or by the store
    Validation,
    /// Anything else
    Internal,
}

impl StoreError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Unavailable(_) => ErrorKind::Network,
            StoreError::PermissionDenied(_) => ErrorKind::Permission,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::InvalidQuery(_) | StoreError::InvalidDocument(_) => ErrorKind::Validation,
            StoreError::Io(_) | StoreError::Serialization(_) | StoreError::Lock(_) => {
                ErrorKind::Internal
            }
            StoreError::Remote { kind, .. } => *kind,
        }
    }

    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
