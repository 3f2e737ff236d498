//! Time utility functions

use chrono::{DateTime, Utc};

/// Convert microseconds since Unix epoch to DateTime<Utc>
pub fn micros_to_datetime(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_else(|| {
        tracing::warn!(micros, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}

/// Convert a millisecond epoch value to nanoseconds, saturating on overflow
pub fn millis_to_nanos(millis: i64) -> i64 {
    millis.saturating_mul(1_000_000)
}
