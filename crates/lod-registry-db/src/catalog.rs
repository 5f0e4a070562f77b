//! Collection catalog seam
//!
//! The asset-collection store is owned by another service. The registry only
//! asks it two questions: does a collection exist, and does an asset belong to
//! it. When a collection is deleted upstream, that service is expected to clear
//! the collection's chain through the registry.

use async_trait::async_trait;
use lod_registry_core::{AssetId, CollectionId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{DbError, DbResult};

/// Read access to the external asset-collection store
#[async_trait]
pub trait CollectionCatalog: Send + Sync {
    /// Whether the collection exists
    async fn collection_exists(&self, collection_id: &CollectionId) -> DbResult<bool>;

    /// Whether the asset exists and belongs to the collection
    async fn asset_in_collection(
        &self,
        collection_id: &CollectionId,
        asset_id: &AssetId,
    ) -> DbResult<bool>;
}

/// Catalog that accepts every collection and asset
///
/// Useful for standalone tooling where no collection store is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCatalog;

#[async_trait]
impl CollectionCatalog for OpenCatalog {
    async fn collection_exists(&self, _collection_id: &CollectionId) -> DbResult<bool> {
        Ok(true)
    }

    async fn asset_in_collection(
        &self,
        _collection_id: &CollectionId,
        _asset_id: &AssetId,
    ) -> DbResult<bool> {
        Ok(true)
    }
}

/// In-memory catalog of collections and their assets
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    collections: RwLock<HashMap<CollectionId, HashSet<AssetId>>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON manifest
    ///
    /// The manifest maps collection ids to the asset ids they own:
    /// `{ "c1": ["a1", "a2"], "c2": [] }`.
    pub async fn from_json_file(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DbError::Configuration(format!("cannot read catalog {}: {}", path.display(), e))
        })?;
        let manifest: HashMap<CollectionId, Vec<AssetId>> = serde_json::from_slice(&bytes)?;

        let catalog = Self::new();
        for (collection_id, assets) in manifest {
            catalog.add_collection(collection_id.clone());
            for asset_id in assets {
                catalog.add_asset(&collection_id, asset_id);
            }
        }
        Ok(catalog)
    }

    /// Add a collection; existing collections keep their assets
    pub fn add_collection(&self, collection_id: CollectionId) {
        self.collections.write().entry(collection_id).or_default();
    }

    /// Add an asset to a collection, creating the collection if needed
    pub fn add_asset(&self, collection_id: &CollectionId, asset_id: AssetId) {
        self.collections
            .write()
            .entry(collection_id.clone())
            .or_default()
            .insert(asset_id);
    }

    /// Remove a collection; returns whether it existed
    pub fn remove_collection(&self, collection_id: &CollectionId) -> bool {
        self.collections.write().remove(collection_id).is_some()
    }

    /// Number of collections
    pub fn len(&self) -> usize {
        self.collections.read().len()
    }

    /// Whether the catalog has no collections
    pub fn is_empty(&self) -> bool {
        self.collections.read().is_empty()
    }
}

#[async_trait]
impl CollectionCatalog for InMemoryCatalog {
    async fn collection_exists(&self, collection_id: &CollectionId) -> DbResult<bool> {
        Ok(self.collections.read().contains_key(collection_id))
    }

    async fn asset_in_collection(
        &self,
        collection_id: &CollectionId,
        asset_id: &AssetId,
    ) -> DbResult<bool> {
        Ok(self
            .collections
            .read()
            .get(collection_id)
            .map(|assets| assets.contains(asset_id))
            .unwrap_or(false))
    }
}
