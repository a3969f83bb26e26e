//! Event bus ports - publish/subscribe seam between REST and realtime.
//!
//! The REST layer publishes booking lifecycle events without knowing about
//! the transport; the realtime bridge subscribes and routes them into rooms.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{EventEnvelope, SessionError};

/// Handler for processing published events.
///
/// Implementations should be idempotent (delivery is at-least-once) and
/// quick; failures are isolated from other handlers.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), SessionError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for publishing events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event to all handlers subscribed to its type.
    async fn publish(&self, event: EventEnvelope) -> Result<(), SessionError>;
}

/// Port for subscribing handlers to event types.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe a handler to a specific event type.
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Subscribe a handler to multiple event types.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}

/// Combined trait for event bus implementations.
pub trait EventBus: EventPublisher + EventSubscriber {}

// Blanket implementation - any type that implements both traits is an EventBus
impl<T: EventPublisher + EventSubscriber> EventBus for T {}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that traits are object-safe
    #[allow(dead_code)]
    fn assert_handler_object_safe(_: &dyn EventHandler) {}

    #[allow(dead_code)]
    fn assert_subscriber_object_safe(_: &dyn EventSubscriber) {}
}
