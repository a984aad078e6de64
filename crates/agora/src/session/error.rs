//! Session persistence errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or saving the session file.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to read or write the session file.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse or serialize the session file.
    #[error("session file {path} is not valid json: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for session persistence.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Create an IO error with the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a JSON error with the given path.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
