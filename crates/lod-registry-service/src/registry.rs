//! LOD chain registry service
//!
//! This module owns the read and mutation paths for chains. Every mutation of
//! a collection runs while holding that collection's write lock and is staged
//! on a copy of the chain. The copy is written through to the chain store and
//! only then swapped in, so a failed or refused mutation leaves the chain
//! untouched. The staging and commit run on a spawned task that owns the lock
//! guard: if the caller stops waiting, the commit still finishes as one unit.

use async_trait::async_trait;
use lod_registry_core::{
    AssetId, ChainChange, CollectionId, EventType, Level, LodChain, RegistryEvent,
};
use lod_registry_db::{ChainStore, CollectionCatalog, EventStore, InMemoryEventStore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::RegistryConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::table::{ChainSlot, ChainTable, ChainWriteGuard};

/// Registration attempt recorded if its commit is refused with a conflict
struct Rejection {
    collection_id: CollectionId,
    asset_id: AssetId,
    level: Level,
}

impl Rejection {
    fn into_event(self, reason: &str) -> EventType {
        EventType::RegistrationRejected {
            collection_id: self.collection_id,
            asset_id: self.asset_id,
            level: self.level,
            reason: reason.to_string(),
        }
    }
}

/// Trait for LOD chain registry operations
#[async_trait]
pub trait LodChainRegistry: Send + Sync {
    /// Current chain of a collection, ordered by ascending level
    ///
    /// A collection with nothing registered yields an empty chain.
    async fn get_chain(&self, collection_id: &CollectionId) -> ServiceResult<LodChain>;

    /// Register an asset at a level and return the updated chain
    ///
    /// Registering the exact pair that is already present succeeds without
    /// change.
    async fn register_asset(
        &self,
        collection_id: &CollectionId,
        asset_id: &AssetId,
        level: Level,
    ) -> ServiceResult<LodChain>;

    /// Remove an asset from the chain; removing an absent asset succeeds
    async fn remove_asset(
        &self,
        collection_id: &CollectionId,
        asset_id: &AssetId,
    ) -> ServiceResult<LodChain>;

    /// Move a registered asset to another level in one step
    async fn relevel_asset(
        &self,
        collection_id: &CollectionId,
        asset_id: &AssetId,
        to: Level,
    ) -> ServiceResult<LodChain>;

    /// Drop a collection's entire chain, including its persisted record
    ///
    /// This is the hook the collection store calls when a collection is
    /// deleted, so it does not consult the catalog.
    async fn clear(&self, collection_id: &CollectionId) -> ServiceResult<()>;

    /// Collections that currently hold a non-empty chain, sorted
    async fn list_collections(&self) -> ServiceResult<Vec<CollectionId>>;

    /// Recent mutation events of a collection, most recent first
    async fn collection_events(
        &self,
        collection_id: &CollectionId,
        limit: usize,
    ) -> ServiceResult<Vec<RegistryEvent>>;

    /// Verify the chain store is reachable
    async fn health_check(&self) -> ServiceResult<()>;
}

/// Default implementation of LodChainRegistry
pub struct DefaultLodChainRegistry {
    catalog: Arc<dyn CollectionCatalog>,
    store: Arc<dyn ChainStore>,
    event_store: Arc<dyn EventStore>,
    table: ChainTable,
    config: RegistryConfig,
}

impl DefaultLodChainRegistry {
    /// Create a new registry
    pub fn new(
        catalog: Arc<dyn CollectionCatalog>,
        store: Arc<dyn ChainStore>,
        event_store: Arc<dyn EventStore>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            event_store,
            table: ChainTable::new(config.lock_timeout()),
            config,
        }
    }

    /// Start building a registry
    pub fn builder() -> LodChainRegistryBuilder {
        LodChainRegistryBuilder::default()
    }

    /// Active configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    async fn ensure_collection(&self, collection_id: &CollectionId) -> ServiceResult<()> {
        if self.catalog.collection_exists(collection_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!(
                "Collection not found: {}",
                collection_id
            )))
        }
    }

    async fn ensure_asset(
        &self,
        collection_id: &CollectionId,
        asset_id: &AssetId,
    ) -> ServiceResult<()> {
        if self
            .catalog
            .asset_in_collection(collection_id, asset_id)
            .await?
        {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!(
                "Asset {} not found in collection {}",
                asset_id, collection_id
            )))
        }
    }

    /// Slot of a collection, loading the persisted chain on first use
    async fn slot(&self, collection_id: &CollectionId) -> ServiceResult<ChainSlot> {
        if let Some(slot) = self.table.get(collection_id) {
            return Ok(slot);
        }

        let _gate = self.table.load_gate(collection_id).await?;
        if let Some(slot) = self.table.get(collection_id) {
            return Ok(slot);
        }

        let chain = self
            .store
            .load(collection_id)
            .await?
            .unwrap_or_else(|| LodChain::new(collection_id.clone()));
        debug!(collection_id = %collection_id, entries = chain.len(), "Loaded chain slot");

        Ok(self.table.get_or_insert(chain))
    }

    /// Take the collection's write lock
    async fn lock(&self, collection_id: &CollectionId) -> ServiceResult<ChainWriteGuard> {
        let slot = self.slot(collection_id).await?;
        self.table.write(collection_id, slot).await
    }

    /// Apply `apply` to a collection's chain as one atomic commit
    async fn mutate<F>(
        &self,
        collection_id: &CollectionId,
        apply: F,
    ) -> ServiceResult<(LodChain, ChainChange)>
    where
        F: FnOnce(&mut LodChain) -> lod_registry_core::Result<ChainChange> + Send + 'static,
    {
        let guard = self.lock(collection_id).await?;
        self.commit(guard, apply, None).await
    }

    /// Stage `apply` on a copy, write it through and swap it in
    ///
    /// Runs on its own task so that dropping the caller's future cannot stop
    /// the commit between the store write and the swap. A conflicting
    /// `rejection` is recorded on the same task, before the lock is released.
    async fn commit<F>(
        &self,
        mut guard: ChainWriteGuard,
        apply: F,
        rejection: Option<Rejection>,
    ) -> ServiceResult<(LodChain, ChainChange)>
    where
        F: FnOnce(&mut LodChain) -> lod_registry_core::Result<ChainChange> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let event_store = Arc::clone(&self.event_store);

        let commit = tokio::spawn(async move {
            let mut candidate = (*guard).clone();
            let change = match apply(&mut candidate) {
                Ok(change) => change,
                Err(e) => {
                    let err = ServiceError::from(e);
                    if let (ServiceError::Conflict(reason), Some(rejection)) = (&err, rejection) {
                        record_event(event_store.as_ref(), rejection.into_event(reason)).await;
                    }
                    return Err(err);
                }
            };

            let Some(event_type) = EventType::from_change(candidate.collection_id(), &change)
            else {
                return Ok((candidate, change));
            };

            store.save(&candidate).await?;
            *guard = candidate.clone();

            // Recorded before the lock is released so events of one
            // collection keep commit order.
            record_event(event_store.as_ref(), event_type).await;
            Ok::<_, ServiceError>((candidate, change))
        });

        commit
            .await
            .map_err(|e| ServiceError::Internal(format!("chain commit task failed: {}", e)))?
    }

    /// Drop the persisted record of a collection that has no slot
    ///
    /// Returns `false` without touching the store when a slot exists, in which
    /// case the caller clears through the slot. No slot is created here.
    async fn clear_unloaded(&self, collection_id: &CollectionId) -> ServiceResult<bool> {
        let gate = self.table.load_gate(collection_id).await?;
        if self.table.get(collection_id).is_some() {
            return Ok(false);
        }

        let store = Arc::clone(&self.store);
        let event_store = Arc::clone(&self.event_store);
        let collection_id = collection_id.clone();

        let drop_record = tokio::spawn(async move {
            let _gate = gate;
            let removed = store
                .load(&collection_id)
                .await?
                .map_or(0, |chain| chain.len());
            store.delete(&collection_id).await?;

            let change = ChainChange::Cleared { removed };
            if let Some(event_type) = EventType::from_change(&collection_id, &change) {
                info!(collection_id = %collection_id, removed, "Persisted chain cleared");
                record_event(event_store.as_ref(), event_type).await;
            }
            Ok::<_, ServiceError>(())
        });

        drop_record
            .await
            .map_err(|e| ServiceError::Internal(format!("chain clear task failed: {}", e)))??;
        Ok(true)
    }
}

async fn record_event(event_store: &dyn EventStore, event_type: EventType) {
    if let Err(e) = event_store.append(RegistryEvent::new(event_type)).await {
        warn!("Failed to record event: {}", e);
    }
}

#[async_trait]
impl LodChainRegistry for DefaultLodChainRegistry {
    #[instrument(skip(self), fields(collection_id = %collection_id))]
    async fn get_chain(&self, collection_id: &CollectionId) -> ServiceResult<LodChain> {
        self.ensure_collection(collection_id).await?;

        let slot = self.slot(collection_id).await?;
        let guard = self.table.read(collection_id, slot).await?;
        Ok((*guard).clone())
    }

    #[instrument(skip(self), fields(collection_id = %collection_id, asset_id = %asset_id, level = %level))]
    async fn register_asset(
        &self,
        collection_id: &CollectionId,
        asset_id: &AssetId,
        level: Level,
    ) -> ServiceResult<LodChain> {
        self.ensure_collection(collection_id).await?;

        // Membership is re-checked under the lock: a collection deleted and
        // cleared while this call waited must not regain an entry.
        let guard = self.lock(collection_id).await?;
        self.ensure_collection(collection_id).await?;
        self.ensure_asset(collection_id, asset_id).await?;

        let rejection = self.config.record_rejections.then(|| Rejection {
            collection_id: collection_id.clone(),
            asset_id: asset_id.clone(),
            level,
        });
        let asset = asset_id.clone();
        match self
            .commit(guard, move |chain| chain.insert(level, asset), rejection)
            .await
        {
            Ok((chain, ChainChange::Unchanged)) => {
                debug!("Asset already registered at this level");
                Ok(chain)
            }
            Ok((chain, _)) => {
                info!(entries = chain.len(), "Asset registered");
                Ok(chain)
            }
            Err(ServiceError::Conflict(reason)) => {
                warn!(reason = %reason, "Registration rejected");
                Err(ServiceError::Conflict(reason))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(collection_id = %collection_id, asset_id = %asset_id))]
    async fn remove_asset(
        &self,
        collection_id: &CollectionId,
        asset_id: &AssetId,
    ) -> ServiceResult<LodChain> {
        self.ensure_collection(collection_id).await?;

        let asset = asset_id.clone();
        let (chain, change) = self
            .mutate(collection_id, move |chain| Ok(chain.remove(&asset)))
            .await?;

        if let ChainChange::Removed(entry) = &change {
            info!(level = %entry.level, "Asset removed");
        } else {
            debug!("Asset was not registered");
        }
        Ok(chain)
    }

    #[instrument(skip(self), fields(collection_id = %collection_id, asset_id = %asset_id, to = %to))]
    async fn relevel_asset(
        &self,
        collection_id: &CollectionId,
        asset_id: &AssetId,
        to: Level,
    ) -> ServiceResult<LodChain> {
        self.ensure_collection(collection_id).await?;

        let asset = asset_id.clone();
        let (chain, change) = self
            .mutate(collection_id, move |chain| chain.relevel(&asset, to))
            .await?;

        if let ChainChange::Moved { from, .. } = &change {
            info!(from = %from, "Asset relevelled");
        }
        Ok(chain)
    }

    #[instrument(skip(self), fields(collection_id = %collection_id))]
    async fn clear(&self, collection_id: &CollectionId) -> ServiceResult<()> {
        if self.clear_unloaded(collection_id).await? {
            return Ok(());
        }

        let (_, change) = self
            .mutate(collection_id, |chain| Ok(chain.clear()))
            .await?;

        if let ChainChange::Cleared { removed } = change {
            info!(removed, "Chain cleared");
        }
        Ok(())
    }

    async fn list_collections(&self) -> ServiceResult<Vec<CollectionId>> {
        Ok(self.store.list_collections().await?)
    }

    #[instrument(skip(self), fields(collection_id = %collection_id))]
    async fn collection_events(
        &self,
        collection_id: &CollectionId,
        limit: usize,
    ) -> ServiceResult<Vec<RegistryEvent>> {
        Ok(self
            .event_store
            .collection_events(collection_id, limit)
            .await?)
    }

    async fn health_check(&self) -> ServiceResult<()> {
        Ok(self.store.health_check().await?)
    }
}

/// Builder for [`DefaultLodChainRegistry`]
///
/// The catalog is required. The chain store defaults to an in-memory store and
/// the event store to an in-memory log sized by the configuration.
#[derive(Default)]
pub struct LodChainRegistryBuilder {
    catalog: Option<Arc<dyn CollectionCatalog>>,
    store: Option<Arc<dyn ChainStore>>,
    event_store: Option<Arc<dyn EventStore>>,
    config: RegistryConfig,
}

impl LodChainRegistryBuilder {
    pub fn catalog(mut self, catalog: Arc<dyn CollectionCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn store(mut self, store: Arc<dyn ChainStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn event_store(mut self, event_store: Arc<dyn EventStore>) -> Self {
        self.event_store = Some(event_store);
        self
    }

    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the registry
    pub fn build(self) -> ServiceResult<DefaultLodChainRegistry> {
        self.config.validate()?;

        let catalog = self.catalog.ok_or_else(|| {
            ServiceError::Configuration("a collection catalog is required".to_string())
        })?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(lod_registry_db::InMemoryChainStore::new()));
        let event_store = self
            .event_store
            .unwrap_or_else(|| Arc::new(InMemoryEventStore::new(self.config.event_capacity)));

        Ok(DefaultLodChainRegistry::new(
            catalog,
            store,
            event_store,
            self.config,
        ))
    }
}
