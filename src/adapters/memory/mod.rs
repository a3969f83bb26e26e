//! In-memory adapters for the ports, used in tests and development.

mod identity_verifier;
mod message_store;
mod user_directory;

pub use identity_verifier::StaticIdentityVerifier;
pub use message_store::{InMemoryMessageStore, ANONYMOUS_RETENTION_SECS};
pub use user_directory::InMemoryUserDirectory;
