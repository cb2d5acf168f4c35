//! Engine event notifications.
//!
//! Observers are called synchronously on the writing thread, after the write
//! has been published and every engine lock released. An observer may call
//! back into the engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use knowledge_types::EntityKind;
use serde::Serialize;

/// Something that happened to the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    EntityAdded { kind: EntityKind, id: String },
    EntityUpdated { kind: EntityKind, id: String },
    ImportCompleted { count: usize },
    ImportFailed { error: String },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::EntityAdded { .. } => "entity_added",
            EngineEvent::EntityUpdated { .. } => "entity_updated",
            EngineEvent::ImportCompleted { .. } => "import_completed",
            EngineEvent::ImportFailed { .. } => "import_failed",
        }
    }
}

/// Receives engine events.
pub trait EngineObserver: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

impl<F> EngineObserver for F
where
    F: Fn(&EngineEvent) + Send + Sync,
{
    fn on_event(&self, event: &EngineEvent) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registered observers, notified in subscription order.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn EngineObserver>)>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn EngineObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, observer));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn notify(&self, event: &EngineEvent) {
        // Copy out so observers run without the registry lock held.
        let observers: Vec<Arc<dyn EngineObserver>> = self
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        tracing::debug!(event = event.name(), observers = observers.len(), "Notifying");
        for observer in observers {
            observer.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<EngineEvent>>>, Arc<dyn EngineObserver>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: Arc<dyn EngineObserver> = Arc::new(move |event: &EngineEvent| {
            sink.lock().unwrap().push(event.clone());
        });
        (seen, observer)
    }

    #[test]
    fn test_notify_reaches_every_observer() {
        let registry = ObserverRegistry::new();
        let (first, a) = recorder();
        let (second, b) = recorder();
        registry.subscribe(a);
        registry.subscribe(b);

        registry.notify(&EngineEvent::ImportCompleted { count: 3 });

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(
            second.lock().unwrap()[0],
            EngineEvent::ImportCompleted { count: 3 }
        );
    }

    #[test]
    fn test_unsubscribe() {
        let registry = ObserverRegistry::new();
        let (seen, observer) = recorder();
        let id = registry.subscribe(observer);

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.notify(&EngineEvent::ImportFailed {
            error: "boom".to_string(),
        });

        assert!(seen.lock().unwrap().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_event_names_and_serialization() {
        let event = EngineEvent::EntityAdded {
            kind: EntityKind::Formula,
            id: "fml-1".to_string(),
        };
        assert_eq!(event.name(), "entity_added");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "entity_added");
        assert_eq!(json["kind"], "formula");
        assert_eq!(json["id"], "fml-1");
    }
}
