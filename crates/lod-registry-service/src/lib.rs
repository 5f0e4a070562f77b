//! Service layer for the LOD Chain Registry
//!
//! This crate sits between callers and the storage seams. It validates
//! requests against the collection catalog, serializes mutations per
//! collection, writes chains through to the chain store and records events.
//!
//! # Architecture
//!
//! - **LodChainRegistry**: the registry operations (get, register, remove,
//!   relevel, clear, list, events)
//! - **ChainTable**: per-collection async locks with bounded waits
//! - **dto**: raw request types and operator-facing views
//!
//! # Example
//!
//! ```rust,no_run
//! use lod_registry_service::{DefaultLodChainRegistry, LodChainRegistry, RegistryConfig};
//! use lod_registry_db::{InMemoryCatalog, JsonFileChainStore};
//! use lod_registry_core::{AssetId, CollectionId, Level};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Arc::new(InMemoryCatalog::from_json_file("catalog.json").await?);
//! let store = Arc::new(JsonFileChainStore::open("./data/chains").await?);
//!
//! let registry = DefaultLodChainRegistry::builder()
//!     .catalog(catalog)
//!     .store(store)
//!     .config(RegistryConfig::default())
//!     .build()?;
//!
//! let collection = CollectionId::new("c1")?;
//! registry
//!     .register_asset(&collection, &AssetId::new("a1")?, Level::ZERO)
//!     .await?;
//! let chain = registry.get_chain(&collection).await?;
//! println!("{}", chain);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod registry;
pub mod table;

// Re-export main types for convenience
pub use config::RegistryConfig;
pub use dto::*;
pub use error::{ServiceError, ServiceResult};
pub use registry::{DefaultLodChainRegistry, LodChainRegistry, LodChainRegistryBuilder};
pub use table::{ChainSlot, ChainTable, ChainWriteGuard, LoadGuard};

/// Service layer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
