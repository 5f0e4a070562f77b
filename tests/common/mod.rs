//! Common test utilities and helpers
//!
//! This module provides shared setup for integration tests: a registry wired
//! to an in-memory catalog, a chosen chain store and an inspectable event log.

#![allow(dead_code)]

use async_trait::async_trait;
use lod_registry_core::{AssetId, CollectionId, Level, LodChain};
use lod_registry_db::{
    ChainStore, DbResult, InMemoryCatalog, InMemoryChainStore, InMemoryEventStore,
};
use lod_registry_service::{DefaultLodChainRegistry, RegistryConfig};
use std::sync::Arc;
use std::time::Duration;

pub mod fixtures;

/// Registry under test together with its collaborators
pub struct TestRegistry {
    pub registry: Arc<DefaultLodChainRegistry>,
    pub catalog: Arc<InMemoryCatalog>,
    pub store: Arc<dyn ChainStore>,
    pub events: Arc<InMemoryEventStore>,
}

impl TestRegistry {
    /// Registry backed by an in-memory chain store
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryChainStore::new()))
    }

    /// Registry backed by the given chain store
    pub fn with_store(store: Arc<dyn ChainStore>) -> Self {
        Self::with_store_and_config(store, test_config())
    }

    pub fn with_store_and_config(store: Arc<dyn ChainStore>, config: RegistryConfig) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let events = Arc::new(InMemoryEventStore::new(config.event_capacity));
        let registry = Arc::new(DefaultLodChainRegistry::new(
            catalog.clone(),
            store.clone(),
            events.clone(),
            config,
        ));

        Self {
            registry,
            catalog,
            store,
            events,
        }
    }

    /// Add a collection and its assets to the catalog
    pub fn seed(&self, collection: &str, assets: &[&str]) -> CollectionId {
        let collection_id = cid(collection);
        self.catalog.add_collection(collection_id.clone());
        for asset in assets {
            self.catalog.add_asset(&collection_id, aid(asset));
        }
        collection_id
    }
}

/// In-memory chain store whose writes take `delay`
pub struct SlowChainStore {
    pub inner: InMemoryChainStore,
    delay: Duration,
}

impl SlowChainStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryChainStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl ChainStore for SlowChainStore {
    async fn load(&self, collection_id: &CollectionId) -> DbResult<Option<LodChain>> {
        self.inner.load(collection_id).await
    }

    async fn save(&self, chain: &LodChain) -> DbResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(chain).await
    }

    async fn delete(&self, collection_id: &CollectionId) -> DbResult<()> {
        self.inner.delete(collection_id).await
    }

    async fn list_collections(&self) -> DbResult<Vec<CollectionId>> {
        self.inner.list_collections().await
    }

    async fn health_check(&self) -> DbResult<()> {
        Ok(())
    }
}

/// Registry config with a lock wait short enough for tests
pub fn test_config() -> RegistryConfig {
    RegistryConfig::new().with_lock_timeout(Duration::from_secs(2))
}

pub fn cid(id: &str) -> CollectionId {
    CollectionId::new(id).expect("valid collection id")
}

pub fn aid(id: &str) -> AssetId {
    AssetId::new(id).expect("valid asset id")
}

pub fn lvl(level: u32) -> Level {
    Level::from(level)
}

/// `(level, asset)` pairs of a chain in iteration order
pub fn pairs(chain: &LodChain) -> Vec<(u32, String)> {
    chain
        .iter()
        .map(|(level, asset)| (level.get(), asset.as_str().to_string()))
        .collect()
}

/// Assert a chain is strictly ascending with no asset repeated
pub fn assert_chain_invariants(chain: &LodChain) {
    let levels: Vec<u32> = chain.iter().map(|(level, _)| level.get()).collect();
    assert!(
        levels.windows(2).all(|w| w[0] < w[1]),
        "levels not strictly ascending: {:?}",
        levels
    );

    let mut assets: Vec<&str> = chain.iter().map(|(_, asset)| asset.as_str()).collect();
    let total = assets.len();
    assets.sort_unstable();
    assets.dedup();
    assert_eq!(assets.len(), total, "asset registered at more than one level");
}
