//! Chain persistence
//!
//! The [`ChainStore`] trait abstracts where chain records live. The registry
//! keeps the authoritative copy of every chain in memory and writes through to
//! the store before publishing a mutation, so a store only ever sees complete,
//! invariant-respecting chains.

use async_trait::async_trait;
use lod_registry_core::{CollectionId, LodChain};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::{DbError, DbResult};

/// Storage for chain records
///
/// Implementations must be thread-safe (Send + Sync) for use in async contexts.
/// An empty chain is equivalent to an absent record.
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Load the chain of a collection
    ///
    /// # Returns
    /// * `Ok(Some(LodChain))` - The stored chain
    /// * `Ok(None)` - If nothing was stored for the collection
    /// * `Err(DbError)` - For storage errors or corrupt records
    async fn load(&self, collection_id: &CollectionId) -> DbResult<Option<LodChain>>;

    /// Replace the stored chain of a collection
    ///
    /// The write is all-or-nothing: after an error the previous record is
    /// still intact.
    async fn save(&self, chain: &LodChain) -> DbResult<()>;

    /// Delete the stored chain of a collection; deleting nothing succeeds
    async fn delete(&self, collection_id: &CollectionId) -> DbResult<()>;

    /// List collections with a stored chain
    async fn list_collections(&self) -> DbResult<Vec<CollectionId>>;

    /// Health check - verify the store is operational
    async fn health_check(&self) -> DbResult<()>;
}

/// Map-backed chain store for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct InMemoryChainStore {
    chains: RwLock<HashMap<CollectionId, LodChain>>,
}

impl InMemoryChainStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chains
    pub fn len(&self) -> usize {
        self.chains.read().len()
    }

    /// Whether the store holds no chains
    pub fn is_empty(&self) -> bool {
        self.chains.read().is_empty()
    }
}

#[async_trait]
impl ChainStore for InMemoryChainStore {
    async fn load(&self, collection_id: &CollectionId) -> DbResult<Option<LodChain>> {
        Ok(self.chains.read().get(collection_id).cloned())
    }

    async fn save(&self, chain: &LodChain) -> DbResult<()> {
        let mut chains = self.chains.write();
        if chain.is_empty() {
            chains.remove(chain.collection_id());
        } else {
            chains.insert(chain.collection_id().clone(), chain.clone());
        }
        Ok(())
    }

    async fn delete(&self, collection_id: &CollectionId) -> DbResult<()> {
        self.chains.write().remove(collection_id);
        Ok(())
    }

    async fn list_collections(&self) -> DbResult<Vec<CollectionId>> {
        let mut ids: Vec<CollectionId> = self.chains.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn health_check(&self) -> DbResult<()> {
        Ok(())
    }
}

/// Chain store keeping one JSON document per collection in a directory
///
/// File names are the hex SHA-256 digest of the collection id, so any opaque
/// id maps to a safe, fixed-length file name. The id itself is read back from
/// the record. Writes go to a sibling temporary file which is then renamed
/// over the record.
#[derive(Debug, Clone)]
pub struct JsonFileChainStore {
    root: PathBuf,
}

const RECORD_EXTENSION: &str = "json";

impl JsonFileChainStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> DbResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            DbError::Configuration(format!(
                "cannot create chain directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    /// Directory holding the records
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, collection_id: &CollectionId) -> PathBuf {
        let digest = Sha256::digest(collection_id.as_str().as_bytes());
        self.root
            .join(format!("{}.{}", hex::encode(digest), RECORD_EXTENSION))
    }
}

#[async_trait]
impl ChainStore for JsonFileChainStore {
    #[instrument(skip(self), fields(collection_id = %collection_id))]
    async fn load(&self, collection_id: &CollectionId) -> DbResult<Option<LodChain>> {
        let path = self.record_path(collection_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let chain: LodChain = serde_json::from_slice(&bytes)?;
        if chain.collection_id() != collection_id {
            return Err(DbError::InvalidData(format!(
                "record {} belongs to collection {}",
                path.display(),
                chain.collection_id()
            )));
        }

        debug!(entries = chain.len(), "Loaded chain record");
        Ok(Some(chain))
    }

    #[instrument(skip(self, chain), fields(collection_id = %chain.collection_id(), entries = chain.len()))]
    async fn save(&self, chain: &LodChain) -> DbResult<()> {
        if chain.is_empty() {
            return self.delete(chain.collection_id()).await;
        }

        let path = self.record_path(chain.collection_id());
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(chain)?;

        tokio::fs::write(&tmp, &body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(DbError::Io(e.to_string()));
        }

        debug!("Saved chain record");
        Ok(())
    }

    #[instrument(skip(self), fields(collection_id = %collection_id))]
    async fn delete(&self, collection_id: &CollectionId) -> DbResult<()> {
        match tokio::fs::remove_file(self.record_path(collection_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DbError::Io(e.to_string())),
        }
    }

    async fn list_collections(&self) -> DbResult<Vec<CollectionId>> {
        let mut ids = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            let chain: LodChain = serde_json::from_slice(&bytes)?;
            if path != self.record_path(chain.collection_id()) {
                return Err(DbError::InvalidData(format!(
                    "record {} belongs to collection {}",
                    path.display(),
                    chain.collection_id()
                )));
            }
            ids.push(chain.collection_id().clone());
        }

        ids.sort();
        Ok(ids)
    }

    async fn health_check(&self) -> DbResult<()> {
        let meta = tokio::fs::metadata(&self.root).await?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(DbError::Configuration(format!(
                "{} is not a directory",
                self.root.display()
            )))
        }
    }
}
