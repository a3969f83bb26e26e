//! Mindbridge - Real-time session backend for a student mental-health
//! support platform.
//!
//! This crate implements the platform's live session layer: a presence and
//! routing directory for booked counseling sessions, and an anonymous peer
//! matchmaker with skip/requeue semantics. Everything else (REST surface,
//! message storage, identity) sits behind ports.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
