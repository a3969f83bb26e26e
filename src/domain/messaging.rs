//! Message records exchanged over the two realtime channels.
//!
//! The session layer only creates and forwards messages; storage and history
//! queries belong to the `MessageStore` port. Booked messages are durable,
//! anonymous messages are time-bounded (one hour retention).

use serde::{Deserialize, Serialize};

use super::foundation::{BookingId, ConnectionId, MessageId, RoomId, Timestamp, UserId};

/// A booked-session message as submitted by a client, before persistence.
#[derive(Debug, Clone)]
pub struct NewBookedMessage {
    pub room_id: RoomId,
    /// True sender, always persisted even when the broadcast is anonymized.
    pub sender: UserId,
    pub text: String,
    pub booking_id: Option<BookingId>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
}

/// A persisted booked-session message with server-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender: UserId,
    pub text: String,
    pub booking_id: Option<BookingId>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub sent_at: Timestamp,
}

/// An anonymous-session message as submitted, before persistence.
///
/// Anonymous participants have no durable identity; the sender is the
/// ephemeral connection that produced the message.
#[derive(Debug, Clone)]
pub struct NewAnonymousMessage {
    pub room_id: RoomId,
    pub sender: ConnectionId,
    pub text: String,
}

/// A persisted anonymous-session message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender: ConnectionId,
    pub text: String,
    pub sent_at: Timestamp,
}

/// Display profile embedded in booked broadcasts (looked up fresh from the
/// user directory, never cached on the connection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderProfile {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl NewBookedMessage {
    /// Stamps the message with server-assigned identity and time.
    pub fn into_stored(self, id: MessageId, sent_at: Timestamp) -> BookedMessage {
        BookedMessage {
            id,
            room_id: self.room_id,
            sender: self.sender,
            text: self.text,
            booking_id: self.booking_id,
            file_url: self.file_url,
            file_type: self.file_type,
            sent_at,
        }
    }
}

impl NewAnonymousMessage {
    /// Stamps the message with server-assigned identity and time.
    pub fn into_stored(self, id: MessageId, sent_at: Timestamp) -> AnonymousMessage {
        AnonymousMessage {
            id,
            room_id: self.room_id,
            sender: self.sender,
            text: self.text,
            sent_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_booked_message_keeps_submitted_fields() {
        let room = RoomId::new("booking-room-1").unwrap();
        let sender = UserId::new();
        let new = NewBookedMessage {
            room_id: room.clone(),
            sender,
            text: "hello".to_string(),
            booking_id: Some(BookingId::new()),
            file_url: None,
            file_type: None,
        };

        let stored = new.into_stored(MessageId::new(), Timestamp::now());
        assert_eq!(stored.room_id, room);
        assert_eq!(stored.sender, sender);
        assert_eq!(stored.text, "hello");
    }

    #[test]
    fn stored_anonymous_message_carries_connection_sender() {
        let sender = ConnectionId::new();
        let new = NewAnonymousMessage {
            room_id: RoomId::new("anon-room").unwrap(),
            sender,
            text: "hi".to_string(),
        };

        let stored = new.into_stored(MessageId::new(), Timestamp::now());
        assert_eq!(stored.sender, sender);
    }
}
