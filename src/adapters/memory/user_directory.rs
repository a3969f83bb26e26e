//! In-memory user directory for tests and single-process development.
//!
//! # Panics
//!
//! Methods panic if the internal lock is poisoned. Acceptable for a
//! dev/test adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::UserId;
use crate::ports::{UserDirectory, UserDirectoryError, UserProfile};

/// In-memory implementation of [`UserDirectory`].
#[derive(Default)]
pub struct InMemoryUserDirectory {
    profiles: RwLock<HashMap<UserId, UserProfile>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a profile.
    pub fn upsert(&self, profile: UserProfile) {
        self.profiles
            .write()
            .expect("InMemoryUserDirectory: lock poisoned")
            .insert(profile.user_id, profile);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_profile(
        &self,
        user: &UserId,
    ) -> Result<Option<UserProfile>, UserDirectoryError> {
        Ok(self
            .profiles
            .read()
            .expect("InMemoryUserDirectory: lock poisoned")
            .get(user)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_profile_returns_upserted_profile() {
        let directory = InMemoryUserDirectory::new();
        let user = UserId::new();
        directory.upsert(UserProfile {
            user_id: user,
            username: "ada".to_string(),
            avatar_url: None,
        });

        let found = directory.find_profile(&user).await.unwrap().unwrap();
        assert_eq!(found.username, "ada");
    }

    #[tokio::test]
    async fn unknown_user_yields_none() {
        let directory = InMemoryUserDirectory::new();
        assert!(directory
            .find_profile(&UserId::new())
            .await
            .unwrap()
            .is_none());
    }
}
