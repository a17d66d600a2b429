//! Error types for faqbot-storage.

use thiserror::Error;

/// Storage error types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record id that cannot be used as a file name.
    #[error("Invalid record id: {0:?}")]
    InvalidId(String),

    /// Backend that this build cannot open.
    #[error("Unsupported storage backend: {0}")]
    Unsupported(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
