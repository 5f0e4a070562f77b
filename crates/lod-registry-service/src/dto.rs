//! Data Transfer Objects for service layer operations
//!
//! Requests carry raw, unvalidated input as it arrives from an operator or a
//! caller service. `parse` turns them into the typed identifiers the registry
//! works with, failing with `InvalidInput`.

use lod_registry_core::{AssetId, CollectionId, Level, LodChain, LodEntry, RegistryEvent};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Validate a raw collection id
pub fn parse_collection_id(raw: &str) -> ServiceResult<CollectionId> {
    CollectionId::new(raw).map_err(|e| ServiceError::InvalidInput(e.to_string()))
}

fn parse_asset(raw: &str) -> ServiceResult<AssetId> {
    AssetId::new(raw).map_err(|e| ServiceError::InvalidInput(e.to_string()))
}

fn parse_level(raw: i64) -> ServiceResult<Level> {
    Level::try_from_i64(raw).map_err(|e| ServiceError::InvalidInput(e.to_string()))
}

/// Request to register an asset at a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAssetRequest {
    pub collection_id: String,
    pub asset_id: String,
    pub level: i64,
}

impl RegisterAssetRequest {
    pub fn new(collection_id: impl Into<String>, asset_id: impl Into<String>, level: i64) -> Self {
        Self {
            collection_id: collection_id.into(),
            asset_id: asset_id.into(),
            level,
        }
    }

    /// Validate and convert into typed arguments
    pub fn parse(&self) -> ServiceResult<(CollectionId, AssetId, Level)> {
        Ok((
            parse_collection_id(&self.collection_id)?,
            parse_asset(&self.asset_id)?,
            parse_level(self.level)?,
        ))
    }
}

/// Request to move a registered asset to another level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevelAssetRequest {
    pub collection_id: String,
    pub asset_id: String,
    pub to_level: i64,
}

impl RelevelAssetRequest {
    pub fn new(
        collection_id: impl Into<String>,
        asset_id: impl Into<String>,
        to_level: i64,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            asset_id: asset_id.into(),
            to_level,
        }
    }

    pub fn parse(&self) -> ServiceResult<(CollectionId, AssetId, Level)> {
        Ok((
            parse_collection_id(&self.collection_id)?,
            parse_asset(&self.asset_id)?,
            parse_level(self.to_level)?,
        ))
    }
}

/// Request naming an asset within a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub collection_id: String,
    pub asset_id: String,
}

impl AssetRef {
    pub fn new(collection_id: impl Into<String>, asset_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            asset_id: asset_id.into(),
        }
    }

    pub fn parse(&self) -> ServiceResult<(CollectionId, AssetId)> {
        Ok((
            parse_collection_id(&self.collection_id)?,
            parse_asset(&self.asset_id)?,
        ))
    }
}

/// Chain as presented to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainView {
    pub collection_id: CollectionId,
    pub entries: Vec<LodEntry>,
    /// Entry with the lowest level
    pub lowest: Option<LodEntry>,
    /// Entry with the highest level
    pub highest: Option<LodEntry>,
}

impl From<&LodChain> for ChainView {
    fn from(chain: &LodChain) -> Self {
        Self {
            collection_id: chain.collection_id().clone(),
            entries: chain.entries(),
            lowest: chain.first(),
            highest: chain.last(),
        }
    }
}

/// Page of events for one collection, most recent first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPage {
    pub collection_id: CollectionId,
    pub events: Vec<RegistryEvent>,
}
