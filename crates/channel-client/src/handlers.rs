//! Per-event-name handler registry. Several handlers may listen to one name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Returned by [`HandlerRegistry::on`]; pass it to `off` to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Vec<(HandlerId, EventHandler)>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = HandlerId(Uuid::new_v4());
        self.handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Returns whether the handler was registered.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    /// Call every handler registered for `event`. Returns how many ran.
    pub fn dispatch(&self, event: &str, data: &Value) -> usize {
        // Handlers may register or remove handlers, so call outside the lock.
        let targets: Vec<EventHandler> = match self.handlers.read().get(event) {
            Some(list) => list.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
            None => Vec::new(),
        };
        if targets.is_empty() {
            debug!(target: "channel", event, "No handler for event");
        }
        for handler in &targets {
            handler(data);
        }
        targets.len()
    }

    pub fn count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    #[test]
    fn multiple_handlers_per_name() {
        let registry = HandlerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let first = {
            let hits = hits.clone();
            registry.on("stream_update", move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        {
            let hits = hits.clone();
            registry.on("stream_update", move |data| {
                assert_eq!(data["content"], "hi");
                hits.fetch_add(10, Ordering::SeqCst);
            });
        }

        assert_eq!(registry.dispatch("stream_update", &json!({"content": "hi"})), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 11);

        assert!(registry.off("stream_update", first));
        assert!(!registry.off("stream_update", first));
        assert_eq!(registry.count("stream_update"), 1);
    }

    #[test]
    fn unknown_event_runs_nothing() {
        let registry = HandlerRegistry::new();
        assert_eq!(registry.dispatch("heartbeat", &Value::Null), 0);
    }

    #[test]
    fn handler_may_unregister_itself() {
        let registry = Arc::new(HandlerRegistry::new());
        let slot = Arc::new(parking_lot::Mutex::new(None::<HandlerId>));

        let id = {
            let registry = registry.clone();
            let slot = slot.clone();
            registry.clone().on("once", move |_| {
                if let Some(id) = slot.lock().take() {
                    registry.off("once", id);
                }
            })
        };
        *slot.lock() = Some(id);

        assert_eq!(registry.dispatch("once", &Value::Null), 1);
        assert_eq!(registry.dispatch("once", &Value::Null), 0);
    }
}
