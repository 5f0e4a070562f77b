//! Storage layer for the LOD Chain Registry
//!
//! This crate provides the seams the registry uses to reach the outside world:
//! - [`ChainStore`]: durable (or in-memory) storage of chain records
//! - [`CollectionCatalog`]: the external asset-collection store that answers
//!   whether collections exist and which assets they own
//! - [`EventStore`]: the audit log of chain mutations
//!
//! # Example
//!
//! ```rust,no_run
//! use lod_registry_db::{ChainStore, JsonFileChainStore};
//! use lod_registry_core::{CollectionId, LodChain};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonFileChainStore::open("/var/lib/lod-registry/chains").await?;
//! let collection = CollectionId::new("c1")?;
//! let chain = store
//!     .load(&collection)
//!     .await?
//!     .unwrap_or_else(|| LodChain::new(collection));
//! store.save(&chain).await?;
//! # Ok(())
//! # }
//! ```

// Re-export core domain types for convenience
pub use lod_registry_core;

// Public modules
pub mod catalog;
pub mod chain_store;
pub mod error;
pub mod event_store;

// Re-exports for convenience
pub use catalog::{CollectionCatalog, InMemoryCatalog, OpenCatalog};
pub use chain_store::{ChainStore, InMemoryChainStore, JsonFileChainStore};
pub use error::{DbError, DbResult};
pub use event_store::{
    EventStore, InMemoryEventStore, JsonLinesEventStore, DEFAULT_EVENT_CAPACITY,
};

/// Storage layer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
