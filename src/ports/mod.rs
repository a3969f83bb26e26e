//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the realtime core and the outside world. Adapters implement these ports.
//!
//! - `MessageStore` - message persistence (durable booked, 1h-TTL anonymous)
//! - `UserDirectory` - display-profile lookup by user id
//! - `IdentityVerifier` - token handshake for the booked channel
//! - `EventPublisher` / `EventSubscriber` - REST-to-realtime event bus

mod events;
mod identity_verifier;
mod message_store;
mod user_directory;

pub use events::{EventBus, EventHandler, EventPublisher, EventSubscriber};
pub use identity_verifier::{IdentityError, IdentityVerifier, VerifiedIdentity};
pub use message_store::{MessageStore, MessageStoreError};
pub use user_directory::{UserDirectory, UserDirectoryError, UserProfile};
