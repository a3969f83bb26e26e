//! Presence directory: live mapping from user identity to connection.
//!
//! Call-signaling and direct routing on the booked channel are keyed by
//! durable user identity, so senders never have to track volatile connection
//! identifiers. The directory is plain data; the owning channel serializes
//! all mutation behind its lock.

use std::collections::HashMap;

use crate::domain::foundation::{ConnectionId, UserId};

/// Mapping from user identifier to that user's current connection.
///
/// At most one entry per user: a new connection for the same user overwrites
/// the prior mapping (last-connected-wins). The superseded connection is not
/// evicted, so a stale send to it is possible until it disconnects; its own
/// disconnect must not tear down the newer mapping.
#[derive(Debug, Default)]
pub struct PresenceDirectory {
    entries: HashMap<UserId, ConnectionId>,
}

impl PresenceDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overwrites) the presence entry for a user.
    ///
    /// Idempotent: re-identifying the same connection is a no-op. Returns
    /// the superseded connection when the user was previously mapped
    /// elsewhere.
    pub fn identify(&mut self, user: UserId, connection: ConnectionId) -> Option<ConnectionId> {
        match self.entries.insert(user, connection) {
            Some(previous) if previous != connection => Some(previous),
            _ => None,
        }
    }

    /// Looks up the current connection for a user.
    pub fn lookup(&self, user: &UserId) -> Option<ConnectionId> {
        self.entries.get(user).copied()
    }

    /// Removes the entry for `user` only if it still points at `connection`.
    ///
    /// This is the stale-disconnect guard: a disconnect of a superseded
    /// connection must not evict the newer session for the same user.
    /// Returns true when an entry was actually removed.
    pub fn release(&mut self, user: &UserId, connection: ConnectionId) -> bool {
        match self.entries.get(user) {
            Some(current) if *current == connection => {
                self.entries.remove(user);
                true
            }
            _ => false,
        }
    }

    /// Number of users currently present.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no user is currently present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_maps_user_to_connection() {
        let mut directory = PresenceDirectory::new();
        let user = UserId::new();
        let conn = ConnectionId::new();

        assert!(directory.identify(user, conn).is_none());
        assert_eq!(directory.lookup(&user), Some(conn));
    }

    #[test]
    fn re_identify_overwrites_and_reports_superseded_connection() {
        let mut directory = PresenceDirectory::new();
        let user = UserId::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        directory.identify(user, first);
        assert_eq!(directory.identify(user, second), Some(first));
        assert_eq!(directory.lookup(&user), Some(second));
    }

    #[test]
    fn re_identify_same_connection_is_idempotent() {
        let mut directory = PresenceDirectory::new();
        let user = UserId::new();
        let conn = ConnectionId::new();

        directory.identify(user, conn);
        assert!(directory.identify(user, conn).is_none());
        assert_eq!(directory.lookup(&user), Some(conn));
    }

    #[test]
    fn stale_disconnect_does_not_evict_newer_session() {
        let mut directory = PresenceDirectory::new();
        let user = UserId::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        directory.identify(user, first);
        directory.identify(user, second);

        // The superseded connection disconnects later.
        assert!(!directory.release(&user, first));
        assert_eq!(directory.lookup(&user), Some(second));

        // The owning connection's disconnect removes the mapping.
        assert!(directory.release(&user, second));
        assert_eq!(directory.lookup(&user), None);
    }

    #[test]
    fn release_for_unknown_user_is_a_noop() {
        let mut directory = PresenceDirectory::new();
        assert!(!directory.release(&UserId::new(), ConnectionId::new()));
    }
}
