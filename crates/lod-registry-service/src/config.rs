//! Registry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Tunables for the chain registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum wait for a collection lock before failing with `Busy`
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Number of events kept by the default in-memory event store
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Record an event when a registration is refused with a conflict
    #[serde(default = "default_true")]
    pub record_rejections: bool,
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_event_capacity() -> usize {
    lod_registry_db::DEFAULT_EVENT_CAPACITY
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            event_capacity: default_event_capacity(),
            record_rejections: default_true(),
        }
    }
}

impl RegistryConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lock wait bound
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Set the event store capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Enable or disable rejection events
    pub fn with_record_rejections(mut self, enabled: bool) -> Self {
        self.record_rejections = enabled;
        self
    }

    /// Lock wait bound as a duration
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Reject settings the registry cannot run with
    pub fn validate(&self) -> ServiceResult<()> {
        if self.lock_timeout_ms == 0 {
            return Err(ServiceError::Configuration(
                "lock_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ServiceError::Configuration(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
