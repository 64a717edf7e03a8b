//! Event emission.
//!
//! Every subscriber gets an independent broadcast buffer. A slow subscriber
//! lags and loses the oldest events; the engine never blocks on delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ballast_types::events::{Event, EventType};
use ballast_types::unix_millis;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default per-subscriber buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "system", "supply", "oracle".
    pub categories: Option<Vec<String>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event stamped with the current time.
    pub fn emit(&self, event_type: EventType, payload: serde_json::Value) {
        self.send(Event {
            event_type,
            timestamp: unix_millis(),
            payload,
        });
    }

    /// Emit a pre-built event to all subscribers.
    pub fn send(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of events emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventFilter {
    /// Only events in one of `categories`.
    pub fn categories(categories: &[&str]) -> Self {
        Self {
            categories: Some(categories.iter().map(|c| c.to_string()).collect()),
        }
    }

    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        match self.categories {
            Some(ref categories) => {
                let category = event.event_type.category();
                categories.iter().any(|c| c == category)
            }
            None => true,
        }
    }
}
