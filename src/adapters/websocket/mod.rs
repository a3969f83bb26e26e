//! Realtime websocket adapter: the two session channels, their wire
//! protocol, the upgrade endpoints, and the bridge from REST-layer events.

mod anonymous;
mod booked;
mod event_bridge;
mod handler;
pub mod messages;

pub use anonymous::{AnonymousChannel, AnonymousSender};
pub use booked::{BookedChannel, BookedSender};
pub use event_bridge::{BookingEventBridge, BOOKING_EVENT_TYPES};
pub use handler::{router, RealtimeState};
