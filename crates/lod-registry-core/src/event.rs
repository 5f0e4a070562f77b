//! Event system for tracking chain mutations
//!
//! This module provides types for representing events that occur in the
//! registry, giving each collection an audit trail of registrations,
//! removals and clears.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use crate::chain::ChainChange;
use crate::types::{AssetId, CollectionId, Level};

/// Types of events that can occur in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    /// An asset was registered at a level
    AssetRegistered {
        collection_id: CollectionId,
        asset_id: AssetId,
        level: Level,
    },

    /// An asset was removed from a chain
    AssetRemoved {
        collection_id: CollectionId,
        asset_id: AssetId,
        /// Level the asset held before removal
        level: Level,
    },

    /// An asset was moved to a different level
    AssetRelevelled {
        collection_id: CollectionId,
        asset_id: AssetId,
        from: Level,
        to: Level,
    },

    /// A chain was emptied
    ChainCleared {
        collection_id: CollectionId,
        /// Number of entries dropped
        removed: usize,
    },

    /// A registration was refused because of a uniqueness conflict
    RegistrationRejected {
        collection_id: CollectionId,
        asset_id: AssetId,
        level: Level,
        reason: String,
    },
}

impl EventType {
    /// Build the event describing an applied chain change
    ///
    /// Returns `None` for changes that did not alter the chain.
    pub fn from_change(collection_id: &CollectionId, change: &ChainChange) -> Option<Self> {
        if change.is_noop() {
            return None;
        }

        let collection_id = collection_id.clone();
        Some(match change {
            ChainChange::Inserted(entry) => EventType::AssetRegistered {
                collection_id,
                asset_id: entry.asset_id.clone(),
                level: entry.level,
            },
            ChainChange::Removed(entry) => EventType::AssetRemoved {
                collection_id,
                asset_id: entry.asset_id.clone(),
                level: entry.level,
            },
            ChainChange::Moved { asset_id, from, to } => EventType::AssetRelevelled {
                collection_id,
                asset_id: asset_id.clone(),
                from: *from,
                to: *to,
            },
            ChainChange::Cleared { removed } => EventType::ChainCleared {
                collection_id,
                removed: *removed,
            },
            ChainChange::Unchanged => return None,
        })
    }

    /// Get a human-readable name for the event type
    pub fn event_name(&self) -> &str {
        match self {
            EventType::AssetRegistered { .. } => "asset_registered",
            EventType::AssetRemoved { .. } => "asset_removed",
            EventType::AssetRelevelled { .. } => "asset_relevelled",
            EventType::ChainCleared { .. } => "chain_cleared",
            EventType::RegistrationRejected { .. } => "registration_rejected",
        }
    }

    /// Get the collection this event belongs to
    pub fn collection_id(&self) -> &CollectionId {
        match self {
            EventType::AssetRegistered { collection_id, .. }
            | EventType::AssetRemoved { collection_id, .. }
            | EventType::AssetRelevelled { collection_id, .. }
            | EventType::ChainCleared { collection_id, .. }
            | EventType::RegistrationRejected { collection_id, .. } => collection_id,
        }
    }

    /// Get the asset involved, if any
    pub fn asset_id(&self) -> Option<&AssetId> {
        match self {
            EventType::AssetRegistered { asset_id, .. }
            | EventType::AssetRemoved { asset_id, .. }
            | EventType::AssetRelevelled { asset_id, .. }
            | EventType::RegistrationRejected { asset_id, .. } => Some(asset_id),
            EventType::ChainCleared { .. } => None,
        }
    }

    /// Check if this event reports a refused operation
    pub fn is_rejection(&self) -> bool {
        matches!(self, EventType::RegistrationRejected { .. })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

/// A registry event with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEvent {
    /// Unique, time-sortable event id
    pub id: Ulid,

    /// Event type and details
    #[serde(flatten)]
    pub event_type: EventType,

    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

impl RegistryEvent {
    /// Create a new event with the current timestamp
    pub fn new(event_type: EventType) -> Self {
        Self {
            id: Ulid::new(),
            event_type,
            timestamp: Utc::now(),
        }
    }

    /// Get the event name
    pub fn event_name(&self) -> &str {
        self.event_type.event_name()
    }

    /// Get the collection this event belongs to
    pub fn collection_id(&self) -> &CollectionId {
        self.event_type.collection_id()
    }
}

impl fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RegistryEvent({} at {}, collection_id={}",
            self.event_name(),
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.collection_id()
        )?;

        if let Some(asset_id) = self.event_type.asset_id() {
            write!(f, ", asset_id={}", asset_id)?;
        }

        write!(f, ")")
    }
}
