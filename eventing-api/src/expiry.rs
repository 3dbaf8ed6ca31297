//! Lease expiry arithmetic
//!
//! Lease durations are real seconds agreed with a remote peer, so expiry
//! instants live on the wall clock. The maintenance scheduler's own tick
//! uses monotonic sleeps and never feeds back into these values.

use std::time::{Duration, SystemTime};

/// Absolute expiry instant for a lease granted now.
pub fn expires_at(lease: Duration) -> SystemTime {
    SystemTime::now() + lease
}

/// Seconds until the given expiry instant. Negative once the instant has
/// passed.
pub fn remaining_seconds(expire_at: SystemTime) -> f64 {
    match expire_at.duration_since(SystemTime::now()) {
        Ok(remaining) => remaining.as_secs_f64(),
        Err(elapsed) => -elapsed.duration().as_secs_f64(),
    }
}
