//! File-time conversions
//!
//! Node timestamps are stored as Windows FILETIME ticks: 100 ns intervals since
//! 1601-01-01 00:00:00 UTC.

use chrono::{DateTime, Utc};

const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

/// Seconds between 1601-01-01 and the Unix epoch
const EPOCH_OFFSET_SECONDS: i64 = 11_644_473_600;

/// Convert a UTC instant to file-time ticks.
pub fn to_file_time(at: DateTime<Utc>) -> i64 {
    let seconds = at.timestamp() + EPOCH_OFFSET_SECONDS;
    seconds * TICKS_PER_SECOND + i64::from(at.timestamp_subsec_nanos()) / NANOS_PER_TICK
}

/// Convert file-time ticks back to a UTC instant. Out-of-range values map to the Unix epoch.
pub fn from_file_time(ticks: i64) -> DateTime<Utc> {
    let seconds = ticks.div_euclid(TICKS_PER_SECOND) - EPOCH_OFFSET_SECONDS;
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK) as u32;
    DateTime::from_timestamp(seconds, nanos).unwrap_or_default()
}

pub fn now_file_time() -> i64 {
    to_file_time(Utc::now())
}

/// Human-readable UTC timestamp used in the info table and listings
pub fn readable_utc(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
