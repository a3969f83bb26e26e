//! In-memory event bus for single-process deployments and tests.
//!
//! Provides synchronous, deterministic delivery: `publish` invokes every
//! subscribed handler before returning. Published events are captured for
//! test assertions.
//!
//! # Panics
//!
//! Methods may panic if internal locks are poisoned. Acceptable here; a
//! multi-process deployment would use an external broker adapter instead.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::foundation::{EventEnvelope, SessionError};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// In-memory implementation of the event bus ports.
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            published: RwLock::new(Vec::new()),
        }
    }

    // === Test Helpers ===

    /// Returns all published events (for test assertions).
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .clone()
    }

    /// Checks if a specific event type was published.
    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .iter()
            .any(|e| e.event_type == event_type)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), SessionError> {
        self.published
            .write()
            .expect("InMemoryEventBus: published write lock poisoned")
            .push(event.clone());

        // Clone handlers to release the lock before await points
        let type_handlers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self
                .handlers
                .read()
                .expect("InMemoryEventBus: handlers lock poisoned");
            handlers.get(&event.event_type).cloned().unwrap_or_default()
        };

        for handler in type_handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    "event handler failed: {}",
                    e
                );
            }
        }

        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .expect("InMemoryEventBus: handlers write lock poisoned");
        handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .expect("InMemoryEventBus: handlers write lock poisoned");
        for event_type in event_types {
            handlers
                .entry(event_type.to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: EventEnvelope) -> Result<(), SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    #[tokio::test]
    async fn publish_invokes_subscribed_handlers() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe("booking.created", handler.clone());

        bus.publish(EventEnvelope::new("booking.created", json!({})))
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(bus.has_event("booking.created"));
    }

    #[tokio::test]
    async fn publish_skips_handlers_for_other_types() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe("booking.created", handler.clone());

        bus.publish(EventEnvelope::new("session.ended", json!({})))
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn subscribe_all_registers_one_handler_for_many_types() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        bus.subscribe_all(&["booking.created", "session.ended"], handler.clone());

        bus.publish(EventEnvelope::new("booking.created", json!({})))
            .await
            .unwrap();
        bus.publish(EventEnvelope::new("session.ended", json!({})))
            .await
            .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }
}
