//! MessageStore port - Interface for message persistence.
//!
//! The session layer creates and forwards messages; this port owns storage.
//! Booked messages are durable; anonymous messages are time-bounded and
//! implementations must enforce a one-hour retention window.

use async_trait::async_trait;

use crate::domain::foundation::BookingId;
use crate::domain::messaging::{
    AnonymousMessage, BookedMessage, NewAnonymousMessage, NewBookedMessage,
};

/// Errors that can occur in message persistence.
#[derive(Debug, thiserror::Error)]
pub enum MessageStoreError {
    /// Backing store unavailable or write failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Record rejected by the store's own validation.
    #[error("invalid message: {0}")]
    Invalid(String),
}

/// Port for persisting chat messages from both realtime channels.
///
/// Implementations assign `MessageId` and `sent_at` at write time; the
/// returned record is what gets broadcast, so clients always see
/// server-assigned identity.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a booked-session message.
    async fn save_booked(&self, message: NewBookedMessage)
        -> Result<BookedMessage, MessageStoreError>;

    /// Persist an anonymous-session message.
    ///
    /// Retention is time-bounded: implementations expire these records one
    /// hour after `sent_at`.
    async fn save_anonymous(
        &self,
        message: NewAnonymousMessage,
    ) -> Result<AnonymousMessage, MessageStoreError>;

    /// Bulk-delete every booked message belonging to a booking.
    ///
    /// Invoked when a counselor ends a session. Returns the number of
    /// records removed.
    async fn delete_by_booking(&self, booking: &BookingId) -> Result<u64, MessageStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that the trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn MessageStore) {}

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn message_store_is_send_sync() {
        fn check<T: MessageStore>() {
            assert_send_sync::<T>();
        }
    }
}
