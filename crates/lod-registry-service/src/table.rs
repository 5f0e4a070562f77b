//! Per-collection chain slots
//!
//! Each collection's chain lives behind its own async reader-writer lock, so
//! work on different collections never contends. The map of slots is guarded
//! by a short-lived synchronous lock that is never held across an await.
//! Creating a slot, and dropping a record that has no slot, both run under a
//! single load gate so a chain read from the store can never be installed
//! after its record was deleted.

use lod_registry_core::{CollectionId, LodChain};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{
    Mutex as AsyncMutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard,
    RwLock as AsyncRwLock,
};
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

/// Shared handle to one collection's chain
pub type ChainSlot = Arc<AsyncRwLock<LodChain>>;

/// Exclusive access to one collection's chain
pub type ChainWriteGuard = OwnedRwLockWriteGuard<LodChain>;

/// Exclusive right to create slots or drop unslotted records
pub type LoadGuard = OwnedMutexGuard<()>;

/// Table of chain slots keyed by collection
#[derive(Debug)]
pub struct ChainTable {
    slots: RwLock<HashMap<CollectionId, ChainSlot>>,
    load_gate: Arc<AsyncMutex<()>>,
    lock_timeout: Duration,
}

impl ChainTable {
    /// Create an empty table whose lock waits are bounded by `lock_timeout`
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            load_gate: Arc::new(AsyncMutex::new(())),
            lock_timeout,
        }
    }

    /// Slot of a collection, if it has been loaded
    pub fn get(&self, collection_id: &CollectionId) -> Option<ChainSlot> {
        self.slots.read().get(collection_id).cloned()
    }

    /// Install `chain` as the collection's slot unless one already exists
    ///
    /// Returns the slot that ended up in the table. A concurrent loader that
    /// lost the race gets the winner's slot and its own chain is dropped.
    pub fn get_or_insert(&self, chain: LodChain) -> ChainSlot {
        let mut slots = self.slots.write();
        slots
            .entry(chain.collection_id().clone())
            .or_insert_with(|| Arc::new(AsyncRwLock::new(chain)))
            .clone()
    }

    /// Collections with a loaded slot, sorted
    pub fn collection_ids(&self) -> Vec<CollectionId> {
        let mut ids: Vec<CollectionId> = self.slots.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of loaded slots
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether no slot has been loaded
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Maximum lock wait
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Acquire shared access to a slot, failing with `Busy` after the timeout
    pub async fn read(
        &self,
        collection_id: &CollectionId,
        slot: ChainSlot,
    ) -> ServiceResult<OwnedRwLockReadGuard<LodChain>> {
        match tokio::time::timeout(self.lock_timeout, slot.read_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => Err(self.busy(collection_id)),
        }
    }

    /// Acquire exclusive access to a slot, failing with `Busy` after the timeout
    pub async fn write(
        &self,
        collection_id: &CollectionId,
        slot: ChainSlot,
    ) -> ServiceResult<ChainWriteGuard> {
        match tokio::time::timeout(self.lock_timeout, slot.write_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => Err(self.busy(collection_id)),
        }
    }

    /// Acquire the load gate, failing with `Busy` after the timeout
    pub async fn load_gate(&self, collection_id: &CollectionId) -> ServiceResult<LoadGuard> {
        let gate = Arc::clone(&self.load_gate);
        match tokio::time::timeout(self.lock_timeout, gate.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => Err(self.busy(collection_id)),
        }
    }

    fn busy(&self, collection_id: &CollectionId) -> ServiceError {
        let waited_ms = self.lock_timeout.as_millis().try_into().unwrap_or(u64::MAX);
        debug!(collection_id = %collection_id, waited_ms, "Collection lock wait timed out");
        ServiceError::Busy {
            collection_id: collection_id.clone(),
            waited_ms,
        }
    }
}
