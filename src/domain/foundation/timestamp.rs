//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Nanoseconds since the Unix epoch.
    ///
    /// Falls back to microsecond precision when the instant is outside the
    /// nanosecond-representable range.
    pub fn unix_nanos(&self) -> i64 {
        self.0
            .timestamp_nanos_opt()
            .unwrap_or_else(|| self.0.timestamp_micros().saturating_mul(1_000))
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    ///
    /// Negative values subtract seconds.
    pub fn add_secs(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// RFC 3339 rendering, used in wire payloads.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_time() {
        let earlier = Timestamp::now();
        let later = earlier.add_secs(10);
        assert!(earlier.is_before(&later));
        assert!(later.is_after(&earlier));
    }

    #[test]
    fn duration_since_is_signed() {
        let earlier = Timestamp::now();
        let later = earlier.add_secs(60);
        assert_eq!(later.duration_since(&earlier), Duration::seconds(60));
        assert_eq!(earlier.duration_since(&later), Duration::seconds(-60));
    }

    #[test]
    fn unix_nanos_is_monotonic_with_add_secs() {
        let t = Timestamp::now();
        assert!(t.add_secs(1).unix_nanos() > t.unix_nanos());
    }
}
