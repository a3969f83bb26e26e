//! Core session-layer state machines.
//!
//! The presence directory (booked channel) and the anonymous match pool
//! (anonymous channel) are plain in-memory structures with no I/O; the
//! websocket channel services own one instance of each behind their state
//! lock and drive all mutation.

mod matchmaking;
mod presence;

pub use matchmaking::{MatchPool, MeetingMode, Pairing};
pub use presence::PresenceDirectory;
