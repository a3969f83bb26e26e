//! In-memory message store for tests and single-process development.
//!
//! Anonymous records carry the same one-hour retention the production store
//! enforces with a TTL index: expired rows are purged on every anonymous
//! write.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned. Acceptable for a dev/test
//! adapter; production deployments use a database-backed store.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::foundation::{BookingId, MessageId, RoomId, Timestamp};
use crate::domain::messaging::{
    AnonymousMessage, BookedMessage, NewAnonymousMessage, NewBookedMessage,
};
use crate::ports::{MessageStore, MessageStoreError};

/// Default anonymous-message retention: one hour.
pub const ANONYMOUS_RETENTION_SECS: i64 = 3600;

/// In-memory implementation of [`MessageStore`].
pub struct InMemoryMessageStore {
    booked: RwLock<Vec<BookedMessage>>,
    anonymous: RwLock<Vec<AnonymousMessage>>,
    retention_secs: i64,
}

impl InMemoryMessageStore {
    /// Creates an empty store with the default one-hour anonymous retention.
    pub fn new() -> Self {
        Self::with_retention(ANONYMOUS_RETENTION_SECS)
    }

    /// Creates an empty store with a custom anonymous retention window.
    pub fn with_retention(retention_secs: i64) -> Self {
        Self {
            booked: RwLock::new(Vec::new()),
            anonymous: RwLock::new(Vec::new()),
            retention_secs,
        }
    }

    // === Test Helpers ===

    /// All booked messages currently stored, in write order.
    pub fn booked_messages(&self) -> Vec<BookedMessage> {
        self.booked
            .read()
            .expect("InMemoryMessageStore: booked lock poisoned")
            .clone()
    }

    /// All anonymous messages currently stored, in write order.
    pub fn anonymous_messages(&self) -> Vec<AnonymousMessage> {
        self.anonymous
            .read()
            .expect("InMemoryMessageStore: anonymous lock poisoned")
            .clone()
    }

    /// Booked messages for one room, in write order.
    pub fn booked_in_room(&self, room: &RoomId) -> Vec<BookedMessage> {
        self.booked_messages()
            .into_iter()
            .filter(|m| m.room_id == *room)
            .collect()
    }

    fn purge_expired(&self, now: Timestamp) {
        let retention = self.retention_secs;
        self.anonymous
            .write()
            .expect("InMemoryMessageStore: anonymous write lock poisoned")
            .retain(|m| now.duration_since(&m.sent_at).num_seconds() < retention);
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save_booked(
        &self,
        message: NewBookedMessage,
    ) -> Result<BookedMessage, MessageStoreError> {
        let stored = message.into_stored(MessageId::new(), Timestamp::now());
        self.booked
            .write()
            .expect("InMemoryMessageStore: booked write lock poisoned")
            .push(stored.clone());
        Ok(stored)
    }

    async fn save_anonymous(
        &self,
        message: NewAnonymousMessage,
    ) -> Result<AnonymousMessage, MessageStoreError> {
        let now = Timestamp::now();
        self.purge_expired(now);
        let stored = message.into_stored(MessageId::new(), now);
        self.anonymous
            .write()
            .expect("InMemoryMessageStore: anonymous write lock poisoned")
            .push(stored.clone());
        Ok(stored)
    }

    async fn delete_by_booking(&self, booking: &BookingId) -> Result<u64, MessageStoreError> {
        let mut booked = self
            .booked
            .write()
            .expect("InMemoryMessageStore: booked write lock poisoned");
        let before = booked.len();
        booked.retain(|m| m.booking_id != Some(*booking));
        Ok((before - booked.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ConnectionId, UserId};

    fn booked(room: &str, booking: Option<BookingId>) -> NewBookedMessage {
        NewBookedMessage {
            room_id: RoomId::new(room).unwrap(),
            sender: UserId::new(),
            text: "hello".to_string(),
            booking_id: booking,
            file_url: None,
            file_type: None,
        }
    }

    #[tokio::test]
    async fn save_booked_assigns_id_and_timestamp() {
        let store = InMemoryMessageStore::new();
        let stored = store.save_booked(booked("r1", None)).await.unwrap();

        assert_eq!(store.booked_messages(), vec![stored]);
    }

    #[tokio::test]
    async fn delete_by_booking_removes_only_that_booking() {
        let store = InMemoryMessageStore::new();
        let target = BookingId::new();
        let other = BookingId::new();

        store.save_booked(booked("r1", Some(target))).await.unwrap();
        store.save_booked(booked("r1", Some(target))).await.unwrap();
        store.save_booked(booked("r2", Some(other))).await.unwrap();

        let removed = store.delete_by_booking(&target).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.booked_messages().len(), 1);
    }

    #[tokio::test]
    async fn anonymous_messages_expire_after_retention() {
        let store = InMemoryMessageStore::with_retention(0);
        let new = NewAnonymousMessage {
            room_id: RoomId::new("anon-1").unwrap(),
            sender: ConnectionId::new(),
            text: "first".to_string(),
        };
        store.save_anonymous(new).await.unwrap();

        // Zero retention: the next write purges everything older.
        let next = NewAnonymousMessage {
            room_id: RoomId::new("anon-1").unwrap(),
            sender: ConnectionId::new(),
            text: "second".to_string(),
        };
        store.save_anonymous(next).await.unwrap();

        let remaining = store.anonymous_messages();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "second");
    }
}
