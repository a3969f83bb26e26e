//! Bridges booking lifecycle events from the REST layer into the booked
//! realtime channel.
//!
//! The REST side publishes plain envelopes on the event bus; this handler
//! translates them into channel broadcasts so the HTTP layer never touches
//! socket state directly.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::foundation::{BookingId, EventEnvelope, RoomId, SessionError};
use crate::ports::{EventHandler, EventSubscriber, MessageStore};

use super::booked::BookedChannel;

/// Event types this bridge consumes.
pub const BOOKING_EVENT_TYPES: &[&str] =
    &["booking.created", "booking.status_updated", "session.ended"];

/// Routes booking lifecycle events to the booked channel.
pub struct BookingEventBridge {
    channel: Arc<BookedChannel>,
    store: Arc<dyn MessageStore>,
}

impl BookingEventBridge {
    pub fn new(channel: Arc<BookedChannel>, store: Arc<dyn MessageStore>) -> Self {
        Self { channel, store }
    }

    /// Subscribes the bridge to every event type it handles.
    pub fn register(self: &Arc<Self>, subscriber: &dyn EventSubscriber) {
        subscriber.subscribe_all(BOOKING_EVENT_TYPES, Arc::clone(self) as Arc<dyn EventHandler>);
    }

    async fn on_booking_created(&self, payload: &JsonValue) {
        // New bookings go to the counselor group; the full booking document
        // travels opaque so the REST layer owns its shape.
        let booking = payload.get("booking").cloned().unwrap_or_else(|| payload.clone());
        self.channel.broadcast_booking_created(booking).await;
    }

    async fn on_status_updated(&self, payload: &JsonValue) {
        let Some((room, booking_id)) = routing_fields(payload) else {
            tracing::debug!("unroutable booking.status_updated event, dropping");
            return;
        };
        let status = payload
            .get("status")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        self.channel
            .broadcast_booking_status(room, booking_id, status)
            .await;
    }

    async fn on_session_ended(&self, payload: &JsonValue) -> Result<(), SessionError> {
        let Some((room, booking_id)) = routing_fields(payload) else {
            tracing::debug!("unroutable session.ended event, dropping");
            return Ok(());
        };
        // Conversation history is purged before anyone is told the session
        // is over, so clients never re-fetch messages that are going away.
        let removed = self
            .store
            .delete_by_booking(&booking_id)
            .await
            .map_err(|e| SessionError::Persistence(e.to_string()))?;
        tracing::info!(%booking_id, removed, "session ended, conversation purged");
        self.channel.broadcast_session_ended(room, booking_id).await;
        Ok(())
    }
}

/// Pulls the `roomId`/`bookingId` pair every routed event carries.
fn routing_fields(payload: &JsonValue) -> Option<(RoomId, BookingId)> {
    let room = payload
        .get("roomId")
        .and_then(JsonValue::as_str)
        .and_then(|s| RoomId::new(s).ok())?;
    let booking_id = payload
        .get("bookingId")
        .and_then(JsonValue::as_str)
        .and_then(|s| s.parse::<BookingId>().ok())?;
    Some((room, booking_id))
}

#[async_trait]
impl EventHandler for BookingEventBridge {
    async fn handle(&self, event: EventEnvelope) -> Result<(), SessionError> {
        match event.event_type.as_str() {
            "booking.created" => self.on_booking_created(&event.payload).await,
            "booking.status_updated" => self.on_status_updated(&event.payload).await,
            "session.ended" => self.on_session_ended(&event.payload).await?,
            other => tracing::debug!(event_type = other, "bridge ignoring unknown event type"),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "BookingEventBridge"
    }
}
