//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the Mindbridge realtime domain.

mod errors;
mod events;
mod ids;
mod role;
mod timestamp;

pub use errors::{SessionError, ValidationError};
pub use events::{EventEnvelope, EventId};
pub use ids::{BookingId, ConnectionId, MessageId, RoomId, UserId};
pub use role::Role;
pub use timestamp::Timestamp;
