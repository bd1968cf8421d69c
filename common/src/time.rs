// A simple module to define the time types used in the project
//
// The functions in this module use SystemTime::now() which is non deterministic.
// They are only used for logging, rate reports and nonce seeding.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Millis timestamps used to determine it using its type
pub type TimestampMillis = u64;

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

// A clock set before the unix epoch is reported as the epoch itself
#[inline]
pub fn get_current_time() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}

// Return timestamp in milliseconds
// We cast it to u64 as we have plenty of time before it overflows (year 584,942,417 AD)
pub fn get_current_time_in_millis() -> TimestampMillis {
    get_current_time().as_millis() as TimestampMillis
}
