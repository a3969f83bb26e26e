//! Realtime channel configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Tunables for the two realtime channels.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Per-mode matchmaking queue depth cap (0 = unbounded)
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,

    /// Seconds a matchmaking waiter may queue before eviction
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: i64,

    /// Seconds anonymous messages are retained before purge
    #[serde(default = "default_anonymous_retention_secs")]
    pub anonymous_retention_secs: i64,
}

impl RealtimeConfig {
    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_wait_secs <= 0 {
            return Err(ValidationError::InvalidMaxWait);
        }
        if self.anonymous_retention_secs <= 0 {
            return Err(ValidationError::InvalidRetention);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_queue_depth: default_max_queue_depth(),
            max_wait_secs: default_max_wait_secs(),
            anonymous_retention_secs: default_anonymous_retention_secs(),
        }
    }
}

fn default_max_queue_depth() -> usize {
    1024
}

fn default_max_wait_secs() -> i64 {
    // Five minutes of unmatched waiting before the client is told to
    // try again later.
    300
}

fn default_anonymous_retention_secs() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RealtimeConfig::default();
        assert_eq!(config.max_queue_depth, 1024);
        assert_eq!(config.max_wait_secs, 300);
        assert_eq!(config.anonymous_retention_secs, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_nonpositive_wait() {
        let config = RealtimeConfig {
            max_wait_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_nonpositive_retention() {
        let config = RealtimeConfig {
            anonymous_retention_secs: -1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
