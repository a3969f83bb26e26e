//! Static-table identity verifier for tests and single-process development.
//!
//! Maps opaque token strings to verified identities. Production deployments
//! swap in an adapter that validates the REST layer's session tokens; the
//! channel code only ever sees the port.
//!
//! # Panics
//!
//! Methods panic if the internal lock is poisoned. Acceptable for a
//! dev/test adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::ports::{IdentityError, IdentityVerifier, VerifiedIdentity};

/// In-memory implementation of [`IdentityVerifier`].
#[derive(Default)]
pub struct StaticIdentityVerifier {
    tokens: RwLock<HashMap<String, VerifiedIdentity>>,
}

impl StaticIdentityVerifier {
    /// Creates a verifier that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for an identity.
    pub fn issue(&self, token: impl Into<String>, identity: VerifiedIdentity) {
        self.tokens
            .write()
            .expect("StaticIdentityVerifier: lock poisoned")
            .insert(token.into(), identity);
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.tokens
            .read()
            .expect("StaticIdentityVerifier: lock poisoned")
            .get(token)
            .copied()
            .ok_or(IdentityError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Role, UserId};

    #[tokio::test]
    async fn issued_token_verifies_to_identity() {
        let verifier = StaticIdentityVerifier::new();
        let identity = VerifiedIdentity {
            user_id: UserId::new(),
            role: Role::Counselor,
        };
        verifier.issue("tok-1", identity);

        assert_eq!(verifier.verify("tok-1").await.unwrap(), identity);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let verifier = StaticIdentityVerifier::new();
        assert!(matches!(
            verifier.verify("nope").await,
            Err(IdentityError::InvalidToken)
        ));
    }
}
