//! Event envelope for REST-to-realtime notifications.
//!
//! The REST layer owns bookings; when one changes it publishes an event that
//! the realtime core routes into the right room or broadcast group. The
//! envelope carries an untyped JSON payload; routing fields are extracted by
//! the subscriber.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Unique identifier for an event instance (deduplication, tracing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random EventId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport wrapper for a published event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    /// Routing key, e.g. "booking.created".
    pub event_type: String,
    pub occurred_at: Timestamp,
    pub payload: JsonValue,
}

impl EventEnvelope {
    /// Creates an envelope stamped with a fresh id and the current time.
    pub fn new(event_type: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            occurred_at: Timestamp::now(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_stamps_id_and_type() {
        let envelope = EventEnvelope::new("booking.created", json!({"bookingId": "b-1"}));
        assert_eq!(envelope.event_type, "booking.created");
        assert_eq!(envelope.payload["bookingId"], "b-1");
    }

    #[test]
    fn event_ids_are_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }
}
