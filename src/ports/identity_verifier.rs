//! IdentityVerifier port - Interface for binding sockets to verified users.
//!
//! The booked channel never trusts client-asserted identifiers. A connection
//! presents a token during the upgrade handshake; this port turns it into a
//! verified identity that the channel binds to the connection for its whole
//! lifetime. Token format and cryptography are the adapter's concern.

use async_trait::async_trait;

use crate::domain::foundation::{Role, UserId};

/// Identity established for a connection at handshake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: UserId,
    pub role: Role,
}

/// Errors that can occur during token verification.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Token missing, expired, or cryptographically invalid.
    #[error("invalid token")]
    InvalidToken,

    /// Verification backend unavailable.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// Port for verifying connection tokens.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a handshake token into a bound identity.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn IdentityVerifier) {}
}
