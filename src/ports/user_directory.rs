//! UserDirectory port - Interface for identity display lookups.
//!
//! The booked channel embeds the sender's display profile in message
//! broadcasts. Profiles are looked up fresh on every send, never cached on
//! the connection, so renames and avatar changes propagate immediately.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

/// Display profile for a platform user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Errors that can occur during profile lookup.
#[derive(Debug, thiserror::Error)]
pub enum UserDirectoryError {
    /// Backing store unavailable.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Port for fetching user display profiles by identifier.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch the profile for a user, `None` if the user is unknown.
    async fn find_profile(&self, user: &UserId)
        -> Result<Option<UserProfile>, UserDirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn UserDirectory) {}
}
