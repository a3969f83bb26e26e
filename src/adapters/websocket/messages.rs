//! Wire protocol for the two realtime channels.
//!
//! Every inbound and outbound event is a closed tagged variant; payloads are
//! validated once here at the channel boundary, not ad hoc per handler.
//! Call-signaling payloads (`signal`, `candidate`) are opaque JSON relayed
//! untouched.
//!
//! Identifier fields the channel must check against the connection's bound
//! identity (`identify.userId`, `sendMessage.sender`) deserialize as plain
//! strings so that a malformed value reaches the handler and is answered
//! with an explicit rejection instead of a silent parse failure.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::{BookingId, ConnectionId, RoomId, Role, UserId};
use crate::domain::messaging::{AnonymousMessage, BookedMessage, SenderProfile};
use crate::domain::session::MeetingMode;

// ============================================
// Booked channel: Client → Server
// ============================================

/// All events a booked-channel client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BookedClientEvent {
    /// Publish presence for the connection's verified user.
    #[serde(rename_all = "camelCase")]
    Identify { user_id: String, role: Role },

    /// Subscribe to a booking conversation room.
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId },

    /// Fire-and-forget typing indicator.
    #[serde(rename_all = "camelCase")]
    Typing { room_id: RoomId, user_id: UserId },

    /// Fire-and-forget stop-typing indicator.
    #[serde(rename_all = "camelCase")]
    StopTyping { room_id: RoomId, user_id: UserId },

    /// Persist and broadcast a chat message.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        room_id: RoomId,
        sender: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        booking_id: Option<BookingId>,
        #[serde(default)]
        file_url: Option<String>,
        #[serde(default)]
        file_type: Option<String>,
        #[serde(default)]
        is_anonymous: bool,
    },

    /// Start a call towards another user (routed by presence).
    ///
    /// `from` is accepted for wire compatibility but ignored: the relayed
    /// offer names the connection's verified user as the caller.
    #[serde(rename_all = "camelCase")]
    CallUser {
        user_to_call: UserId,
        signal_data: JsonValue,
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        booking_id: Option<BookingId>,
    },

    /// Answer an incoming call.
    #[serde(rename_all = "camelCase")]
    AcceptCall { to: UserId, signal: JsonValue },

    /// Forward an ICE candidate.
    #[serde(rename_all = "camelCase")]
    IceCandidate { to: UserId, candidate: JsonValue },

    /// Hang up.
    #[serde(rename_all = "camelCase")]
    CallEnded { to: UserId },
}

// ============================================
// Booked channel: Server → Client
// ============================================

/// Booked message as broadcast: persisted record plus a freshly looked-up
/// sender profile, or no profile when the sender asked to stay anonymous.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedMessagePayload {
    pub id: String,
    pub room_id: RoomId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderProfile>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<BookingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    pub sent_at: String,
}

impl BookedMessagePayload {
    /// Builds the broadcast payload from a persisted record.
    ///
    /// The true sender stays in the store either way; `profile` is `None`
    /// exactly when the message was flagged anonymous.
    pub fn from_stored(message: BookedMessage, profile: Option<SenderProfile>) -> Self {
        Self {
            id: message.id.to_string(),
            room_id: message.room_id,
            sender: profile,
            text: message.text,
            booking_id: message.booking_id,
            file_url: message.file_url,
            file_type: message.file_type,
            sent_at: message.sent_at.to_rfc3339(),
        }
    }
}

/// All events the server may emit on the booked channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BookedServerEvent {
    #[serde(rename_all = "camelCase")]
    UpdateOnlineUsers { count: usize },

    #[serde(rename_all = "camelCase")]
    NewMessage { message: BookedMessagePayload },

    #[serde(rename_all = "camelCase")]
    UserTyping { user_id: UserId },

    #[serde(rename_all = "camelCase")]
    UserStopTyping { user_id: UserId },

    #[serde(rename_all = "camelCase")]
    CallOffer {
        signal: JsonValue,
        from: UserId,
        #[serde(skip_serializing_if = "Option::is_none")]
        booking_id: Option<BookingId>,
    },

    #[serde(rename_all = "camelCase")]
    CallAnswer { signal: JsonValue },

    #[serde(rename_all = "camelCase")]
    IceCandidate { candidate: JsonValue },

    CallEnded,

    /// Explicit delivery failure for `callUser` when the target has no
    /// presence entry.
    #[serde(rename_all = "camelCase")]
    CallUnavailable { user_id: UserId },

    /// Explicit rejection of a `sendMessage` (malformed or mismatched
    /// sender, or persistence failure).
    #[serde(rename_all = "camelCase")]
    MessageRejected { reason: String },

    /// Protocol-level error (e.g. identity mismatch on `identify`).
    #[serde(rename_all = "camelCase")]
    Error { code: String, message: String },

    /// Pushed by the REST layer when a student books an appointment;
    /// delivered to the counselor broadcast group.
    #[serde(rename_all = "camelCase")]
    BookingCreated { booking: JsonValue },

    /// Pushed by the REST layer into the booking's room.
    #[serde(rename_all = "camelCase")]
    BookingStatusUpdated { booking_id: BookingId, status: String },

    /// Pushed by the REST layer when a counselor ends the session.
    #[serde(rename_all = "camelCase")]
    SessionEnded { booking_id: BookingId },
}

// ============================================
// Anonymous channel: Client → Server
// ============================================

/// All events an anonymous-channel client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnonymousClientEvent {
    /// Enter matchmaking for the given mode (defaults to chat).
    #[serde(rename = "findAnonymousMatch", rename_all = "camelCase")]
    FindMatch {
        #[serde(default = "default_meeting_mode")]
        meeting_mode: MeetingMode,
    },

    /// Persist and broadcast a message; always answered with `messageAck`.
    ///
    /// `sender_id` is accepted for wire compatibility but ignored: the
    /// server attributes the message to the connection that sent it.
    #[serde(rename = "sendAnonymousMessage", rename_all = "camelCase")]
    SendMessage {
        room_id: RoomId,
        #[serde(default)]
        sender_id: Option<String>,
        #[serde(default)]
        text: String,
    },

    /// Start a call towards the paired partner connection.
    #[serde(rename = "anonymousCallUser", rename_all = "camelCase")]
    CallUser {
        user_to_call: ConnectionId,
        signal_data: JsonValue,
    },

    /// Answer an incoming call.
    #[serde(rename = "anonymousAcceptCall", rename_all = "camelCase")]
    AcceptCall { to: ConnectionId, signal: JsonValue },

    /// Hang up.
    #[serde(rename = "anonymousCallEnded", rename_all = "camelCase")]
    CallEnded { to: ConnectionId },

    /// Leave the current pairing and immediately search again.
    #[serde(rename = "skipAnonymous")]
    Skip,
}

fn default_meeting_mode() -> MeetingMode {
    MeetingMode::Chat
}

// ============================================
// Anonymous channel: Server → Client
// ============================================

/// All events the server may emit on the anonymous channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnonymousServerEvent {
    #[serde(rename_all = "camelCase")]
    UpdateOnlineUsers { count: usize },

    #[serde(rename_all = "camelCase")]
    MatchFound {
        room_id: RoomId,
        meeting_mode: MeetingMode,
    },

    #[serde(rename = "newAnonymousMessage", rename_all = "camelCase")]
    NewMessage { message: AnonymousMessage },

    /// Direct acknowledgment to the sender of a `sendAnonymousMessage`.
    #[serde(rename_all = "camelCase")]
    MessageAck {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<AnonymousMessage>,
    },

    PartnerDisconnected,

    #[serde(rename = "anonymousIncomingCall", rename_all = "camelCase")]
    IncomingCall {
        signal: JsonValue,
        caller_id: ConnectionId,
    },

    #[serde(rename = "anonymousCallAccepted", rename_all = "camelCase")]
    CallAccepted { signal: JsonValue },

    #[serde(rename = "anonymousCallEnded")]
    CallEnded,

    /// The mode queue is at its configured depth cap.
    #[serde(rename_all = "camelCase")]
    QueueFull { meeting_mode: MeetingMode },

    /// Evicted from the wait queue after the configured maximum wait.
    WaitTimeout,
}
