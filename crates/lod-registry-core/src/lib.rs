//! Core domain models and types for the LOD Chain Registry
//!
//! This crate contains the data structures that describe level-of-detail
//! chains: the identifiers of collections and assets, the detail level type,
//! the ordered chain itself with its uniqueness invariants, and the events the
//! registry records when a chain changes.

pub mod chain;
pub mod error;
pub mod event;
pub mod types;

// Re-exports for convenience
pub use chain::{ChainChange, ChainRecord, ChainState, LodChain, LodEntry};
pub use error::{RegistryError, Result};
pub use event::{EventType, RegistryEvent};
pub use types::{AssetId, CollectionId, Level};
