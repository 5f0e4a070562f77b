//! Storage-specific error types and conversions
//!
//! This module provides error types for chain persistence, catalog lookups and
//! event logging.

use thiserror::Error;

/// Result type alias for storage operations
pub type DbResult<T> = Result<T, DbError>;

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum DbError {
    /// Filesystem I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Stored data does not decode into a valid chain
    #[error("Invalid data format: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing service is temporarily unreachable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Domain error from core crate
    #[error("Domain error: {0}")]
    Domain(#[from] lod_registry_core::RegistryError),

    /// Internal storage error
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl DbError {
    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }

    /// Check if this is a transient error that could be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Io(_) | DbError::Unavailable(_))
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => DbError::NotFound(err.to_string()),
            _ => DbError::Io(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() {
            DbError::InvalidData(err.to_string())
        } else {
            DbError::Serialization(err.to_string())
        }
    }
}
