//! Error types for the domain layer.

use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the realtime session layer.
///
/// Per the platform's best-effort signaling policy, these degrade to an
/// explicit rejection event back to the caller rather than closing the
/// connection.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("wait queue for {mode} is full (depth {depth})")]
    QueueFull { mode: String, depth: usize },

    #[error("persistence failed: {0}")]
    Persistence(String),
}
