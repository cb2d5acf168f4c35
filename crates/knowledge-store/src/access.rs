//! Access tracking: bounded recent-access log and per-entity usage counters.
//!
//! Usage counters live here rather than on the stored entity, so recording a
//! view never takes the content write path. The engine folds them back into
//! [`EntityMeta`](knowledge_types::EntityMeta) when it hands an entity out.
//!
//! ## Thread Safety
//!
//! - Event log protected by a Mutex (held only for push/truncate/copy)
//! - Usage counters use DashMap for concurrent access

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use dashmap::DashMap;
use knowledge_types::{AccessEvent, AccessKind, EntityKind, UsageStats};
use tracing::debug;

/// Default number of events retained.
pub const DEFAULT_CAPACITY: usize = 100;

/// Records search and view events, most recent first.
pub struct AccessTracker {
    log: Mutex<VecDeque<AccessEvent>>,
    capacity: usize,
    usage: DashMap<(EntityKind, String), UsageStats>,
}

impl AccessTracker {
    /// Create a tracker retaining at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            log: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            usage: DashMap::new(),
        }
    }

    /// Create with the default capacity of 100 events.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    fn log(&self) -> MutexGuard<'_, VecDeque<AccessEvent>> {
        // A poisoned log is still a valid deque.
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Prepend an event, dropping the oldest entries past capacity.
    pub fn record_access(&self, id: &str, kind: AccessKind) {
        let mut log = self.log();
        log.push_front(AccessEvent::new(id, kind));
        log.truncate(self.capacity);
        debug!(id, kind = kind.as_str(), retained = log.len(), "Recorded access");
    }

    /// Count a view of an entity and log it.
    pub fn record_view(&self, kind: EntityKind, id: &str) {
        self.usage
            .entry((kind, id.to_string()))
            .or_default()
            .record_access();
        self.record_access(id, AccessKind::from(kind));
    }

    /// The `n` most recent events, newest first.
    pub fn recent(&self, n: usize) -> Vec<AccessEvent> {
        self.log().iter().take(n).cloned().collect()
    }

    /// Events currently retained.
    pub fn len(&self) -> usize {
        self.log().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Views counted since the entity was last stored. Zero if never viewed.
    pub fn usage(&self, kind: EntityKind, id: &str) -> UsageStats {
        self.usage
            .get(&(kind, id.to_string()))
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Forget counted views, e.g. after the entity was overwritten.
    pub fn clear_usage(&self, kind: EntityKind, id: &str) {
        self.usage.remove(&(kind, id.to_string()));
    }
}

impl Default for AccessTracker {
    fn default() -> Self {
        Self::with_defaults()
    }
}
