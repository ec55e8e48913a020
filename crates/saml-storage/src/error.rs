//! Storage error types.

use std::fmt;

/// Storage operation errors.
#[derive(Debug)]
pub enum StorageError {
    /// Connection to the storage backend failed.
    Connection(String),
    /// Value could not be encoded or decoded by the backend.
    Serialization(String),
    /// Storage operation timed out.
    Timeout,
    /// Internal storage error.
    Internal(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "storage connection error: {msg}"),
            Self::Serialization(msg) => write!(f, "storage serialization error: {msg}"),
            Self::Timeout => write!(f, "storage operation timed out"),
            Self::Internal(msg) => write!(f, "internal storage error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
