//! Error types for the LOD Chain Registry

use thiserror::Error;

use crate::types::{AssetId, CollectionId, Level};

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Domain errors raised by chain and identifier validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The requested level is already held by another asset
    #[error("Level {level} in collection {collection_id} is occupied by asset {occupant}")]
    LevelOccupied {
        collection_id: CollectionId,
        level: Level,
        occupant: AssetId,
    },

    /// The asset is already registered in the chain at another level
    #[error("Asset {asset_id} is already registered in collection {collection_id} at level {level}")]
    AssetAlreadyRegistered {
        collection_id: CollectionId,
        asset_id: AssetId,
        level: Level,
    },

    /// The asset has no entry in the chain
    #[error("Asset {asset_id} is not registered in collection {collection_id}")]
    AssetNotInChain {
        collection_id: CollectionId,
        asset_id: AssetId,
    },

    /// Level outside the accepted range
    #[error("Invalid level: {0} (levels must be non-negative 32-bit integers)")]
    InvalidLevel(i64),

    /// Malformed collection or asset identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A stored chain record breaks the chain invariants
    #[error("Corrupt chain record: {0}")]
    CorruptRecord(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RegistryError {
    /// Check if this error is a uniqueness conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RegistryError::LevelOccupied { .. } | RegistryError::AssetAlreadyRegistered { .. }
        )
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::SerializationError(err.to_string())
    }
}
