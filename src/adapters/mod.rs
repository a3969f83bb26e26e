//! Adapters implementing the ports against concrete infrastructure.

pub mod events;
pub mod memory;
pub mod websocket;
