//! Synchronous event emitter.
//!
//! Listeners are invoked in registration order. A panicking listener is
//! caught and logged; it never aborts the emit or disturbs other listeners.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{ContextEvent, ContextEventType};

/// Callback invoked for each matching event.
pub type EventListener = Arc<dyn Fn(&ContextEvent) + Send + Sync>;

/// Handle returned by [`EventEmitter::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct EventEmitter {
    listeners: HashMap<ContextEventType, Vec<(ListenerId, EventListener)>>,
    next_id: u64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event type.
    pub fn on<F>(&mut self, event_type: ContextEventType, listener: F) -> ListenerId
    where
        F: Fn(&ContextEvent) + Send + Sync + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener; returns whether it was registered.
    pub fn off(&mut self, event_type: ContextEventType, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(&event_type) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.listeners.remove(&event_type);
        }
        removed
    }

    /// Deliver an event; returns how many listeners completed without
    /// panicking.
    pub fn emit(&self, event: &ContextEvent) -> usize {
        let Some(listeners) = self.listeners.get(&event.event_type) else {
            return 0;
        };

        let mut delivered = 0;
        for (id, listener) in listeners {
            let listener = listener.clone();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(event);
            }));
            match outcome {
                Ok(()) => delivered += 1,
                Err(_) => warn!(
                    "Listener {:?} for {} panicked; continuing",
                    id,
                    event.event_type.as_str()
                ),
            }
        }
        delivered
    }

    pub fn listener_count(&self, event_type: ContextEventType) -> usize {
        self.listeners.get(&event_type).map_or(0, Vec::len)
    }

    pub fn total_listeners(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}
