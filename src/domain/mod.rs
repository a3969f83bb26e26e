//! Domain layer - the vocabulary and state machines of the realtime core.

pub mod foundation;
pub mod messaging;
pub mod session;
