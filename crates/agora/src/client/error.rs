//! Client error types.

use std::sync::Arc;

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the forum API.
///
/// Cloneable so one failed fetch can be reported to every reader waiting on
/// it.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Transport failure: connection refused, timeout, undecodable body.
    #[error("network error: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    /// The server answered with a non-2xx status.
    #[error("server rejected request ({status}): {message}")]
    ServerRejection { status: u16, message: String },

    /// The request could not be built; nothing was sent.
    #[error("request setup failed: {0}")]
    RequestSetup(String),

    /// The configured base URL is not a valid absolute URL.
    #[error("invalid api base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(Arc::new(e))
    }
}

impl ClientError {
    /// HTTP status of a server rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::ServerRejection { status, .. } => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for a 401 answer.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
