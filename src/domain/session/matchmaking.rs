//! Anonymous matchmaking state: wait queues and pairing records.
//!
//! Two mode-specific FIFO queues feed two-party pairings. Entries can go
//! stale (their connection disconnected while queued); consumers verify
//! liveness at dequeue time and stale entries are discarded, never
//! re-inserted. Pairings are stored bidirectionally so either side can find
//! its partner in O(1).
//!
//! All state here is process-memory only; a restart drops queues and
//! pairings, which is acceptable for ephemeral anonymous sessions.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConnectionId, RoomId, SessionError, Timestamp};

/// Requested meeting mode; chat and video pools never cross-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingMode {
    Chat,
    Video,
}

impl fmt::Display for MeetingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeetingMode::Chat => write!(f, "Chat"),
            MeetingMode::Video => write!(f, "Video"),
        }
    }
}

/// One side of an active two-party pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct Pairing {
    pub room_id: RoomId,
    pub partner: ConnectionId,
    pub mode: MeetingMode,
}

#[derive(Debug, Clone, Copy)]
struct Waiter {
    connection: ConnectionId,
    queued_at: Timestamp,
}

/// Wait queues and pairing records for the anonymous matchmaker.
///
/// Invariant: a connection is never simultaneously queued and paired —
/// `pop_live_waiter` + `enqueue` are used as alternatives, never both, and
/// `record_pairing` is only called for connections absent from the queues.
#[derive(Debug, Default)]
pub struct MatchPool {
    chat_queue: VecDeque<Waiter>,
    video_queue: VecDeque<Waiter>,
    pairings: HashMap<ConnectionId, Pairing>,
    /// Zero means unbounded.
    max_depth: usize,
}

impl MatchPool {
    /// Creates an empty pool with no queue-depth bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty pool that rejects enqueues beyond `max_depth`
    /// waiters per mode.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    fn queue_mut(&mut self, mode: MeetingMode) -> &mut VecDeque<Waiter> {
        match mode {
            MeetingMode::Chat => &mut self.chat_queue,
            MeetingMode::Video => &mut self.video_queue,
        }
    }

    fn queue(&self, mode: MeetingMode) -> &VecDeque<Waiter> {
        match mode {
            MeetingMode::Chat => &self.chat_queue,
            MeetingMode::Video => &self.video_queue,
        }
    }

    /// Pops the first still-live waiter of the given mode.
    ///
    /// Stale entries encountered on the way are dropped permanently.
    /// Strictly FIFO among live entries: arrival order decides pairing
    /// order within a mode.
    pub fn pop_live_waiter(
        &mut self,
        mode: MeetingMode,
        mut is_live: impl FnMut(&ConnectionId) -> bool,
    ) -> Option<ConnectionId> {
        let queue = self.queue_mut(mode);
        while let Some(waiter) = queue.pop_front() {
            if is_live(&waiter.connection) {
                return Some(waiter.connection);
            }
        }
        None
    }

    /// Appends a connection to the back of the mode queue.
    ///
    /// Idempotent for a connection already waiting in that mode. Fails when
    /// the configured depth cap is reached.
    pub fn enqueue(
        &mut self,
        mode: MeetingMode,
        connection: ConnectionId,
        now: Timestamp,
    ) -> Result<(), SessionError> {
        let max_depth = self.max_depth;
        let queue = self.queue_mut(mode);
        if queue.iter().any(|w| w.connection == connection) {
            return Ok(());
        }
        if max_depth > 0 && queue.len() >= max_depth {
            return Err(SessionError::QueueFull {
                mode: mode.to_string(),
                depth: max_depth,
            });
        }
        queue.push_back(Waiter {
            connection,
            queued_at: now,
        });
        Ok(())
    }

    /// Whether a connection is currently waiting in the given mode.
    pub fn is_queued(&self, mode: MeetingMode, connection: &ConnectionId) -> bool {
        self.queue(mode).iter().any(|w| w.connection == *connection)
    }

    /// Current queue depth for a mode (live and stale entries alike).
    pub fn queue_len(&self, mode: MeetingMode) -> usize {
        self.queue(mode).len()
    }

    /// Removes a connection from both mode queues (disconnect cleanup).
    ///
    /// Linear scan; queue depth is expected to stay small.
    pub fn remove_waiter(&mut self, connection: &ConnectionId) {
        self.chat_queue.retain(|w| w.connection != *connection);
        self.video_queue.retain(|w| w.connection != *connection);
    }

    /// Records a pairing bidirectionally.
    pub fn record_pairing(
        &mut self,
        a: ConnectionId,
        b: ConnectionId,
        room_id: RoomId,
        mode: MeetingMode,
    ) {
        self.pairings.insert(
            a,
            Pairing {
                room_id: room_id.clone(),
                partner: b,
                mode,
            },
        );
        self.pairings.insert(
            b,
            Pairing {
                room_id,
                partner: a,
                mode,
            },
        );
    }

    /// Looks up the pairing a connection participates in.
    pub fn pairing_of(&self, connection: &ConnectionId) -> Option<&Pairing> {
        self.pairings.get(connection)
    }

    /// Tears down both sides of a pairing, returning the caller's record.
    ///
    /// Used identically by skip and disconnect; the caller decides whether
    /// to re-enqueue afterwards.
    pub fn clear_pairing(&mut self, connection: &ConnectionId) -> Option<Pairing> {
        let pairing = self.pairings.remove(connection)?;
        self.pairings.remove(&pairing.partner);
        Some(pairing)
    }

    /// Evicts waiters queued longer than `max_wait_secs` from both queues.
    ///
    /// Returns the evicted connections so the channel can notify them.
    pub fn evict_overdue(&mut self, max_wait_secs: i64, now: Timestamp) -> Vec<ConnectionId> {
        let mut evicted = Vec::new();
        for queue in [&mut self.chat_queue, &mut self.video_queue] {
            queue.retain(|w| {
                if now.duration_since(&w.queued_at).num_seconds() >= max_wait_secs {
                    evicted.push(w.connection);
                    false
                } else {
                    true
                }
            });
        }
        evicted
    }

    /// Number of active pairing records (two per pairing).
    pub fn pairing_count(&self) -> usize {
        self.pairings.len()
    }
}
