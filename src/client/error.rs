//! Remote client errors

use thiserror::Error;

use crate::store::{ErrorKind, StoreError};

/// Errors talking to a Kodigo server
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Server unavailable: {0}")]
    Unavailable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Non-success response; `message` is the server's own wording
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Classify a reqwest failure
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Unavailable(err.to_string())
        } else {
            ClientError::Request(err)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Unavailable(_) | ClientError::Timeout | ClientError::WebSocket(_) => {
                ErrorKind::Network
            }
            ClientError::Request(e) if !e.is_decode() => ErrorKind::Network,
            ClientError::Api { status, .. } => kind_for_status(*status),
            ClientError::InvalidUrl(_) => ErrorKind::Validation,
            ClientError::Request(_) | ClientError::Protocol(_) => ErrorKind::Internal,
        }
    }
}

/// Map an HTTP status from the server back to an error class
pub fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        400 | 409 | 422 => ErrorKind::Validation,
        408 | 502 | 503 | 504 => ErrorKind::Network,
        _ => ErrorKind::Internal,
    }
}

impl From<ClientError> for StoreError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, message, .. } => StoreError::Remote {
                kind: kind_for_status(status),
                message,
            },
            ClientError::Protocol(message) => StoreError::Serialization(message),
            other => match other.kind() {
                ErrorKind::Network => StoreError::Unavailable(other.to_string()),
                kind => StoreError::Remote {
                    kind,
                    message: other.to_string(),
                },
            },
        }
    }
}
