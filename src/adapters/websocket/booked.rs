//! Booked-session channel: presence, room chat, and call-signaling relay.
//!
//! One `BookedChannel` instance is constructed at startup and shared by
//! every connection on the channel. All shared state (presence directory,
//! room membership, counselor group, online counter) lives behind a single
//! lock; handlers mutate synchronously under it, release it across
//! persistence awaits, and re-validate liveness before emitting afterwards.
//!
//! Routing is keyed by verified user identity, not connection identity, so
//! callers never track volatile connection identifiers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, Mutex};

use crate::domain::foundation::{BookingId, ConnectionId, RoomId, UserId};
use crate::domain::messaging::{NewBookedMessage, SenderProfile};
use crate::domain::session::PresenceDirectory;
use crate::ports::{MessageStore, UserDirectory, VerifiedIdentity};

use super::messages::{BookedMessagePayload, BookedServerEvent};

/// Outbound sender for one booked connection.
pub type BookedSender = mpsc::UnboundedSender<BookedServerEvent>;

struct BookedConnection {
    sender: BookedSender,
    identity: VerifiedIdentity,
}

#[derive(Default)]
struct BookedState {
    connections: HashMap<ConnectionId, BookedConnection>,
    presence: PresenceDirectory,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
    counselors: HashSet<ConnectionId>,
    online: usize,
}

impl BookedState {
    fn send_to(&self, connection: &ConnectionId, event: BookedServerEvent) {
        if let Some(conn) = self.connections.get(connection) {
            // A full/closed outbound channel means the socket is going away;
            // its disconnect will clean up.
            let _ = conn.sender.send(event);
        }
    }

    fn broadcast_all(&self, event: &BookedServerEvent) {
        for conn in self.connections.values() {
            let _ = conn.sender.send(event.clone());
        }
    }

    fn broadcast_room(&self, room: &RoomId, event: &BookedServerEvent, except: Option<ConnectionId>) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        for member in members {
            if Some(*member) == except {
                continue;
            }
            self.send_to(member, event.clone());
        }
    }

    fn broadcast_online_count(&self) {
        self.broadcast_all(&BookedServerEvent::UpdateOnlineUsers { count: self.online });
    }
}

/// The booked-session channel service.
pub struct BookedChannel {
    state: Mutex<BookedState>,
    store: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
}

impl BookedChannel {
    /// Creates the channel with its persistence and identity collaborators.
    pub fn new(store: Arc<dyn MessageStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            state: Mutex::new(BookedState::default()),
            store,
            directory,
        }
    }

    /// Registers a new connection with its verified identity.
    ///
    /// Bumps the online counter and broadcasts it to the whole channel.
    pub async fn connect(&self, identity: VerifiedIdentity, sender: BookedSender) -> ConnectionId {
        let connection = ConnectionId::new();
        let mut state = self.state.lock().await;
        state
            .connections
            .insert(connection, BookedConnection { sender, identity });
        state.online += 1;
        state.broadcast_online_count();
        tracing::debug!(%connection, user = %identity.user_id, "booked connection opened");
        connection
    }

    /// Publishes presence for the connection's verified user.
    ///
    /// Idempotent overwrite; a newer connection for the same user wins.
    /// The claimed identifier must match the identity bound at handshake,
    /// otherwise the caller gets an explicit error event. Counselor-group
    /// membership follows the verified role, never the claimed one.
    pub async fn identify(&self, connection: ConnectionId, claimed_user_id: &str) {
        let mut state = self.state.lock().await;
        let Some(conn) = state.connections.get(&connection) else {
            return;
        };
        let identity = conn.identity;

        let claimed: Option<UserId> = claimed_user_id.parse().ok();
        if claimed != Some(identity.user_id) {
            tracing::warn!(
                %connection,
                claimed = claimed_user_id,
                bound = %identity.user_id,
                "identify rejected: claimed identity does not match handshake"
            );
            state.send_to(
                &connection,
                BookedServerEvent::Error {
                    code: "IDENTITY_MISMATCH".to_string(),
                    message: "identify does not match the connection's verified user".to_string(),
                },
            );
            return;
        }

        state.presence.identify(identity.user_id, connection);
        if identity.role.is_counselor() {
            state.counselors.insert(connection);
        }
        tracing::debug!(user = %identity.user_id, %connection, "presence registered");
    }

    /// Subscribes the connection to a room.
    ///
    /// A connection may join any number of rooms; authorization happened at
    /// the REST layer when the room was created.
    pub async fn join_room(&self, connection: ConnectionId, room: RoomId) {
        let mut state = self.state.lock().await;
        if !state.connections.contains_key(&connection) {
            return;
        }
        state.rooms.entry(room).or_default().insert(connection);
    }

    /// Fire-and-forget typing indicator to the rest of the room.
    pub async fn typing(&self, connection: ConnectionId, room: RoomId, user: UserId) {
        let state = self.state.lock().await;
        state.broadcast_room(
            &room,
            &BookedServerEvent::UserTyping { user_id: user },
            Some(connection),
        );
    }

    /// Fire-and-forget stop-typing indicator to the rest of the room.
    pub async fn stop_typing(&self, connection: ConnectionId, room: RoomId, user: UserId) {
        let state = self.state.lock().await;
        state.broadcast_room(
            &room,
            &BookedServerEvent::UserStopTyping { user_id: user },
            Some(connection),
        );
    }

    /// Persists a message and broadcasts it to the room.
    ///
    /// The sender field must parse and match the connection's verified
    /// user; anything else is answered with `messageRejected` rather than
    /// silently dropped. The true sender is persisted even for anonymous
    /// messages; only the broadcast payload omits the profile.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_message(
        &self,
        connection: ConnectionId,
        room: RoomId,
        sender: &str,
        text: Option<String>,
        booking_id: Option<BookingId>,
        file_url: Option<String>,
        file_type: Option<String>,
        is_anonymous: bool,
    ) {
        let sender_id = {
            let state = self.state.lock().await;
            let Some(conn) = state.connections.get(&connection) else {
                return;
            };
            match sender.parse::<UserId>() {
                Ok(id) if id == conn.identity.user_id => id,
                _ => {
                    tracing::warn!(%connection, sender, "message rejected: bad sender identity");
                    state.send_to(
                        &connection,
                        BookedServerEvent::MessageRejected {
                            reason: "sender identity is malformed or not yours".to_string(),
                        },
                    );
                    return;
                }
            }
        };

        // Profile looked up fresh on every send, never cached. The lookup
        // happens before persistence: once a message is stored, nothing
        // awaits except the (FIFO) lock below, so in-room delivery order
        // matches persistence completion order.
        let profile = if is_anonymous {
            None
        } else {
            match self.directory.find_profile(&sender_id).await {
                Ok(profile) => profile.map(|p| SenderProfile {
                    id: p.user_id,
                    username: p.username,
                    avatar_url: p.avatar_url,
                }),
                Err(e) => {
                    tracing::warn!(user = %sender_id, "profile lookup failed: {}", e);
                    None
                }
            }
        };

        let new_message = NewBookedMessage {
            room_id: room.clone(),
            sender: sender_id,
            text: text.unwrap_or_default(),
            booking_id,
            file_url,
            file_type,
        };

        // Lock released across the persistence await.
        let stored = match self.store.save_booked(new_message).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(%room, "failed to persist booked message: {}", e);
                let state = self.state.lock().await;
                state.send_to(
                    &connection,
                    BookedServerEvent::MessageRejected {
                        reason: "message could not be stored".to_string(),
                    },
                );
                return;
            }
        };

        let state = self.state.lock().await;
        // The sender may have disconnected during the awaits; the stored
        // message stands, but a dead connection gets no emissions.
        if !state.connections.contains_key(&connection) {
            tracing::debug!(%connection, "sender disconnected mid-send, skipping broadcast");
            return;
        }
        state.broadcast_room(
            &room,
            &BookedServerEvent::NewMessage {
                message: BookedMessagePayload::from_stored(stored, profile),
            },
            None,
        );
    }

    /// Relays a call offer to the target user's current connection.
    ///
    /// The caller named in the offer is the connection's verified user.
    /// A target with no presence entry is answered with `callUnavailable`.
    pub async fn call_user(
        &self,
        connection: ConnectionId,
        user_to_call: UserId,
        signal: JsonValue,
        booking_id: Option<BookingId>,
    ) {
        let state = self.state.lock().await;
        let Some(conn) = state.connections.get(&connection) else {
            return;
        };
        let from = conn.identity.user_id;

        match state.presence.lookup(&user_to_call) {
            Some(target) => {
                tracing::debug!(%from, to = %user_to_call, "relaying call offer");
                state.send_to(
                    &target,
                    BookedServerEvent::CallOffer {
                        signal,
                        from,
                        booking_id,
                    },
                );
            }
            None => {
                state.send_to(
                    &connection,
                    BookedServerEvent::CallUnavailable {
                        user_id: user_to_call,
                    },
                );
            }
        }
    }

    /// Relays a call answer; silent no-op when the target is offline.
    pub async fn accept_call(&self, to: UserId, signal: JsonValue) {
        let state = self.state.lock().await;
        if let Some(target) = state.presence.lookup(&to) {
            state.send_to(&target, BookedServerEvent::CallAnswer { signal });
        }
    }

    /// Relays an ICE candidate; silent no-op when the target is offline.
    pub async fn ice_candidate(&self, to: UserId, candidate: JsonValue) {
        let state = self.state.lock().await;
        if let Some(target) = state.presence.lookup(&to) {
            state.send_to(&target, BookedServerEvent::IceCandidate { candidate });
        }
    }

    /// Relays a hang-up; silent no-op when the target is offline.
    pub async fn call_ended(&self, to: UserId) {
        let state = self.state.lock().await;
        if let Some(target) = state.presence.lookup(&to) {
            state.send_to(&target, BookedServerEvent::CallEnded);
        }
    }

    /// Tears down a connection.
    ///
    /// The presence entry is removed only if it still points at this
    /// connection, so a stale disconnect never evicts a newer session for
    /// the same user.
    pub async fn disconnect(&self, connection: ConnectionId) {
        let mut state = self.state.lock().await;
        let Some(conn) = state.connections.remove(&connection) else {
            return;
        };
        state.online = state.online.saturating_sub(1);
        state.counselors.remove(&connection);
        for members in state.rooms.values_mut() {
            members.remove(&connection);
        }
        state.rooms.retain(|_, members| !members.is_empty());

        let released = state.presence.release(&conn.identity.user_id, connection);
        state.broadcast_online_count();
        tracing::debug!(
            %connection,
            user = %conn.identity.user_id,
            released_presence = released,
            "booked connection closed"
        );
    }

    // === REST-push surface (used by the booking event bridge) ===

    /// Broadcasts a new-booking notification to the counselor group.
    pub async fn broadcast_booking_created(&self, booking: JsonValue) {
        let state = self.state.lock().await;
        let event = BookedServerEvent::BookingCreated { booking };
        for counselor in &state.counselors {
            state.send_to(counselor, event.clone());
        }
    }

    /// Broadcasts a booking status change into the booking's room.
    pub async fn broadcast_booking_status(
        &self,
        room: RoomId,
        booking_id: BookingId,
        status: String,
    ) {
        let state = self.state.lock().await;
        state.broadcast_room(
            &room,
            &BookedServerEvent::BookingStatusUpdated { booking_id, status },
            None,
        );
    }

    /// Broadcasts the end of a session into the booking's room.
    pub async fn broadcast_session_ended(&self, room: RoomId, booking_id: BookingId) {
        let state = self.state.lock().await;
        state.broadcast_room(&room, &BookedServerEvent::SessionEnded { booking_id }, None);
    }

    // === Inspection (monitoring and tests) ===

    /// Current online connection count.
    pub async fn online_count(&self) -> usize {
        self.state.lock().await.online
    }

    /// Whether a user currently has a presence entry.
    pub async fn is_present(&self, user: &UserId) -> bool {
        self.state.lock().await.presence.lookup(user).is_some()
    }

    /// Number of connections subscribed to a room.
    pub async fn room_size(&self, room: &RoomId) -> usize {
        self.state
            .lock()
            .await
            .rooms
            .get(room)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}
