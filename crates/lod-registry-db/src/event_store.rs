//! Event store for the chain mutation audit trail

use async_trait::async_trait;
use lod_registry_core::{CollectionId, RegistryEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument, warn};

use crate::error::{DbError, DbResult};

/// Default number of events retained by [`InMemoryEventStore`]
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// Event store trait for persisting and querying registry events
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a new event to the store
    async fn append(&self, event: RegistryEvent) -> DbResult<RegistryEvent>;

    /// Get events for a collection, most recent first
    ///
    /// # Arguments
    /// * `collection_id` - The collection
    /// * `limit` - Maximum number of events to return
    async fn collection_events(
        &self,
        collection_id: &CollectionId,
        limit: usize,
    ) -> DbResult<Vec<RegistryEvent>>;

    /// Count events currently retained
    async fn count_events(&self) -> DbResult<usize>;
}

/// Bounded in-memory event log
///
/// Once `capacity` events are held, appending evicts the oldest one.
#[derive(Debug)]
pub struct InMemoryEventStore {
    events: Mutex<VecDeque<RegistryEvent>>,
    capacity: usize,
}

impl InMemoryEventStore {
    /// Create a store retaining at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Maximum number of retained events
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[instrument(skip(self, event), fields(event = %event.event_name()))]
    async fn append(&self, event: RegistryEvent) -> DbResult<RegistryEvent> {
        let mut events = self.events.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        debug!(retained = events.len(), "Event appended");
        Ok(event)
    }

    async fn collection_events(
        &self,
        collection_id: &CollectionId,
        limit: usize,
    ) -> DbResult<Vec<RegistryEvent>> {
        Ok(self
            .events
            .lock()
            .iter()
            .rev()
            .filter(|event| event.collection_id() == collection_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_events(&self) -> DbResult<usize> {
        Ok(self.events.lock().len())
    }
}

/// Append-only event log keeping one JSON document per line
///
/// The log outlives the process, so separate invocations against the same
/// directory share one audit trail. A line that does not decode, such as one
/// cut short by a crash, is skipped when reading.
#[derive(Debug)]
pub struct JsonLinesEventStore {
    path: PathBuf,
    append_lock: AsyncMutex<()>,
}

impl JsonLinesEventStore {
    /// Open the log at `path`, creating its directory if needed
    pub async fn open(path: impl Into<PathBuf>) -> DbResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DbError::Configuration(format!(
                    "cannot create event log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(Self {
            path,
            append_lock: AsyncMutex::new(()),
        })
    }

    /// Location of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> DbResult<Vec<RegistryEvent>> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DbError::Io(e.to_string())),
        };

        let mut events = Vec::new();
        for (index, line) in body.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RegistryEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(line = index + 1, "Skipping unreadable event: {}", e),
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl EventStore for JsonLinesEventStore {
    #[instrument(skip(self, event), fields(event = %event.event_name()))]
    async fn append(&self, event: RegistryEvent) -> DbResult<RegistryEvent> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let _guard = self.append_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DbError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DbError::Io(e.to_string()))?;
        file.flush().await.map_err(|e| DbError::Io(e.to_string()))?;

        debug!("Event appended");
        Ok(event)
    }

    async fn collection_events(
        &self,
        collection_id: &CollectionId,
        limit: usize,
    ) -> DbResult<Vec<RegistryEvent>> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .rev()
            .filter(|event| event.collection_id() == collection_id)
            .take(limit)
            .collect())
    }

    async fn count_events(&self) -> DbResult<usize> {
        Ok(self.read_all().await?.len())
    }
}
