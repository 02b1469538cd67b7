//! View error types
//!
//! Everything a view action can fail with. Validation failures and store
//! failures surface through the same inline notice; `kind()` tells them
//! apart.

use serde::Serialize;
use thiserror::Error;

use crate::store::{ErrorKind, StoreError};

/// Errors returned by view actions
#[derive(Error, Debug)]
pub enum ViewError {
    /// A required field was empty after trimming
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The record to act on is not in the current list
    #[error("No such record: {0}")]
    UnknownRecord(String),

    /// The store rejected the mutation
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ViewError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ViewError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ViewError::Validation { .. } => ErrorKind::Validation,
            ViewError::UnknownRecord(_) => ErrorKind::NotFound,
            ViewError::Store(e) => e.kind(),
        }
    }
}

/// Inline, non-blocking message shown beside a form or list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ViewError> for Notice {
    fn from(err: &ViewError) -> Self {
        Notice {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type for view actions
pub type ViewResult<T> = Result<T, ViewError>;
