//! Anonymous-session channel: FIFO matchmaking, ephemeral chat, and
//! peer-to-peer call signaling between paired connections.
//!
//! Identity on this channel is the connection itself; no user accounts are
//! involved and nothing persists across a reconnect. Shared state (wait
//! queues, pairings, room membership) lives behind one lock, mutated
//! synchronously; persistence awaits run with the lock released and
//! liveness is re-checked before any emission afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, Mutex};

use crate::domain::foundation::{ConnectionId, RoomId, Timestamp};
use crate::domain::messaging::NewAnonymousMessage;
use crate::domain::session::{MatchPool, MeetingMode};
use crate::ports::MessageStore;

use super::messages::AnonymousServerEvent;

/// Outbound sender for one anonymous connection.
pub type AnonymousSender = mpsc::UnboundedSender<AnonymousServerEvent>;

#[derive(Default)]
struct AnonymousState {
    connections: HashMap<ConnectionId, AnonymousSender>,
    pool: MatchPool,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
    online: usize,
}

impl AnonymousState {
    fn send_to(&self, connection: &ConnectionId, event: AnonymousServerEvent) {
        if let Some(sender) = self.connections.get(connection) {
            let _ = sender.send(event);
        }
    }

    fn broadcast_all(&self, event: &AnonymousServerEvent) {
        for sender in self.connections.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn broadcast_room(&self, room: &RoomId, event: &AnonymousServerEvent) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        for member in members {
            self.send_to(member, event.clone());
        }
    }

    fn broadcast_online_count(&self) {
        self.broadcast_all(&AnonymousServerEvent::UpdateOnlineUsers { count: self.online });
    }

    /// Tears down the pairing a connection participates in, if any.
    ///
    /// Removes the shared room and tells the partner it is alone again.
    /// The partner is never re-enqueued automatically; it searches again
    /// by sending its own `findMatch`.
    fn teardown_pairing(&mut self, connection: &ConnectionId) {
        let Some(pairing) = self.pool.clear_pairing(connection) else {
            return;
        };
        self.rooms.remove(&pairing.room_id);
        self.send_to(&pairing.partner, AnonymousServerEvent::PartnerDisconnected);
    }

    /// Pairs the connection with the longest-waiting live peer, or queues
    /// it. Must not be called for a connection that is already paired.
    fn try_match(&mut self, connection: ConnectionId, mode: MeetingMode) {
        let state = &mut *self;
        let partner = state
            .pool
            .pop_live_waiter(mode, |c| state.connections.contains_key(c));

        match partner {
            Some(partner) => {
                let room = RoomId::for_pairing(&partner, &connection, Timestamp::now().unix_nanos());
                state
                    .rooms
                    .insert(room.clone(), HashSet::from([partner, connection]));
                state.pool.record_pairing(partner, connection, room.clone(), mode);
                tracing::debug!(%room, mode = %mode, "anonymous pairing formed");
                let matched = AnonymousServerEvent::MatchFound {
                    room_id: room,
                    meeting_mode: mode,
                };
                state.send_to(&partner, matched.clone());
                state.send_to(&connection, matched);
            }
            None => {
                if let Err(e) = state.pool.enqueue(mode, connection, Timestamp::now()) {
                    tracing::debug!(%connection, mode = %mode, "enqueue refused: {}", e);
                    state.send_to(
                        &connection,
                        AnonymousServerEvent::QueueFull { meeting_mode: mode },
                    );
                }
            }
        }
    }
}

/// The anonymous-session channel service.
pub struct AnonymousChannel {
    state: Mutex<AnonymousState>,
    store: Arc<dyn MessageStore>,
}

impl AnonymousChannel {
    /// Creates the channel. `max_queue_depth` of zero leaves the wait
    /// queues unbounded.
    pub fn new(store: Arc<dyn MessageStore>, max_queue_depth: usize) -> Self {
        Self {
            state: Mutex::new(AnonymousState {
                pool: MatchPool::with_max_depth(max_queue_depth),
                ..AnonymousState::default()
            }),
            store,
        }
    }

    /// Registers a new connection and broadcasts the online count.
    pub async fn connect(&self, sender: AnonymousSender) -> ConnectionId {
        let connection = ConnectionId::new();
        let mut state = self.state.lock().await;
        state.connections.insert(connection, sender);
        state.online += 1;
        state.broadcast_online_count();
        tracing::debug!(%connection, "anonymous connection opened");
        connection
    }

    /// Enters matchmaking for a mode.
    ///
    /// Pairs immediately with the longest-waiting live peer of the same
    /// mode when one exists, otherwise queues. A no-op while already
    /// paired; clients leave a pairing with `skip` first.
    pub async fn find_match(&self, connection: ConnectionId, mode: MeetingMode) {
        let mut state = self.state.lock().await;
        if !state.connections.contains_key(&connection) {
            return;
        }
        if state.pool.pairing_of(&connection).is_some() {
            tracing::debug!(%connection, "findMatch ignored: already paired");
            return;
        }
        state.try_match(connection, mode);
    }

    /// Persists a message and broadcasts it to the room.
    ///
    /// The message is attributed to the sending connection regardless of
    /// any identifier in the payload. Every send is answered with a
    /// `messageAck` so clients can reconcile optimistic UI.
    pub async fn send_message(&self, connection: ConnectionId, room: RoomId, text: String) {
        {
            let state = self.state.lock().await;
            if !state.connections.contains_key(&connection) {
                return;
            }
        }

        let new_message = NewAnonymousMessage {
            room_id: room.clone(),
            sender: connection,
            text,
        };

        // Lock released across the persistence await.
        let stored = match self.store.save_anonymous(new_message).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(%room, "failed to persist anonymous message: {}", e);
                let state = self.state.lock().await;
                state.send_to(
                    &connection,
                    AnonymousServerEvent::MessageAck {
                        success: false,
                        message: None,
                    },
                );
                return;
            }
        };

        let state = self.state.lock().await;
        // Ack only a still-live sender; broadcast to whoever is in the
        // room now, which may have changed during the await.
        if state.connections.contains_key(&connection) {
            state.send_to(
                &connection,
                AnonymousServerEvent::MessageAck {
                    success: true,
                    message: Some(stored.clone()),
                },
            );
        }
        state.broadcast_room(&room, &AnonymousServerEvent::NewMessage { message: stored });
    }

    /// Relays a call offer to a partner connection; silent no-op when the
    /// target is gone.
    pub async fn call_user(
        &self,
        connection: ConnectionId,
        target: ConnectionId,
        signal: JsonValue,
    ) {
        let state = self.state.lock().await;
        if !state.connections.contains_key(&connection) {
            return;
        }
        state.send_to(
            &target,
            AnonymousServerEvent::IncomingCall {
                signal,
                caller_id: connection,
            },
        );
    }

    /// Relays a call answer; silent no-op when the target is gone.
    pub async fn accept_call(&self, target: ConnectionId, signal: JsonValue) {
        let state = self.state.lock().await;
        state.send_to(&target, AnonymousServerEvent::CallAccepted { signal });
    }

    /// Relays a hang-up; silent no-op when the target is gone.
    pub async fn call_ended(&self, target: ConnectionId) {
        let state = self.state.lock().await;
        state.send_to(&target, AnonymousServerEvent::CallEnded);
    }

    /// Leaves the current pairing and immediately searches again in the
    /// same mode.
    ///
    /// The abandoned partner is notified but not re-enqueued; only the
    /// skipper goes back into matchmaking. A skip while unpaired is a
    /// no-op.
    pub async fn skip(&self, connection: ConnectionId) {
        let mut state = self.state.lock().await;
        if !state.connections.contains_key(&connection) {
            return;
        }
        let Some(pairing) = state.pool.clear_pairing(&connection) else {
            return;
        };
        state.rooms.remove(&pairing.room_id);
        state.send_to(&pairing.partner, AnonymousServerEvent::PartnerDisconnected);
        state.try_match(connection, pairing.mode);
    }

    /// Tears down a connection: pairing, queue entries, rooms, counter.
    pub async fn disconnect(&self, connection: ConnectionId) {
        let mut state = self.state.lock().await;
        if state.connections.remove(&connection).is_none() {
            return;
        }
        state.online = state.online.saturating_sub(1);
        state.teardown_pairing(&connection);
        state.pool.remove_waiter(&connection);
        for members in state.rooms.values_mut() {
            members.remove(&connection);
        }
        state.rooms.retain(|_, members| !members.is_empty());
        state.broadcast_online_count();
        tracing::debug!(%connection, "anonymous connection closed");
    }

    /// Evicts waiters queued longer than `max_wait_secs` and notifies
    /// them. Driven by a periodic task at startup.
    pub async fn evict_overdue(&self, max_wait_secs: i64) {
        let mut state = self.state.lock().await;
        let evicted = state.pool.evict_overdue(max_wait_secs, Timestamp::now());
        for connection in evicted {
            tracing::debug!(%connection, "waiter evicted after {}s", max_wait_secs);
            state.send_to(&connection, AnonymousServerEvent::WaitTimeout);
        }
    }

    // === Inspection (monitoring and tests) ===

    /// Current online connection count.
    pub async fn online_count(&self) -> usize {
        self.state.lock().await.online
    }

    /// Current queue depth for a mode.
    pub async fn queue_len(&self, mode: MeetingMode) -> usize {
        self.state.lock().await.pool.queue_len(mode)
    }

    /// Number of active pairing records (two per pairing).
    pub async fn pairing_count(&self) -> usize {
        self.state.lock().await.pool.pairing_count()
    }
}
