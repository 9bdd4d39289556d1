//! Error types for layers-state

use thiserror::Error;

/// Errors raised by a layer store backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend could not be reached
    #[error("Layer store unavailable: {0}")]
    Unavailable(String),

    /// Stored document could not be decoded
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
