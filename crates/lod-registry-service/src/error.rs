//! Service-layer error types
//!
//! This module maps domain and storage errors onto the result taxonomy callers
//! of the registry see: not found, conflict, busy, invalid input, storage.

use lod_registry_core::{CollectionId, RegistryError};
use lod_registry_db::DbError;
use thiserror::Error;

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service-layer error types
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Collection or asset unknown to the catalog, or asset absent from a chain
    #[error("Not found: {0}")]
    NotFound(String),

    /// Level or asset uniqueness would be violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The collection's lock was not acquired within the configured wait
    #[error("Collection {collection_id} is busy: lock not acquired within {waited_ms} ms")]
    Busy {
        collection_id: CollectionId,
        waited_ms: u64,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Chain store or catalog failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid registry configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal service error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }

    /// Check if this is a uniqueness conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }

    /// Check if the caller may safely retry the same request
    ///
    /// The registry itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Busy { .. })
    }
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::LevelOccupied { .. } | RegistryError::AssetAlreadyRegistered { .. } => {
                ServiceError::Conflict(err.to_string())
            }
            RegistryError::AssetNotInChain { .. } => ServiceError::NotFound(err.to_string()),
            RegistryError::InvalidLevel(_) | RegistryError::InvalidIdentifier(_) => {
                ServiceError::InvalidInput(err.to_string())
            }
            RegistryError::CorruptRecord(msg) => ServiceError::Storage(msg),
            RegistryError::SerializationError(msg) => ServiceError::Storage(msg),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(err) => ServiceError::from(err),
            DbError::Configuration(msg) => ServiceError::Configuration(msg),
            other => ServiceError::Storage(other.to_string()),
        }
    }
}
