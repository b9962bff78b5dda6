//! Error types for snipper-core

use thiserror::Error;

/// Errors raised by the HTTP transport
///
/// The transport never retries; callers decide what a failure means.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("HTTP error! status: {status}, body: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Credential provider failed: {0}")]
    Credentials(String),
}

impl TransportError {
    /// HTTP status code, when the failure came from a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors related to execution session management
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Snippet {0} already has an active execution")]
    AlreadyActive(String),

    #[error("Input is already being sent for snippet {0}")]
    InputInFlight(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] TransportError),
}
