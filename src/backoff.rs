//! Linear backoff used between authorization checks.
//!
//! The n-th wait (0-based) lasts `(n + 1) * base_ms`. With the small attempt
//! budgets the login flows use (3–5 checks, 300–500 ms bases) this keeps the
//! worst-case wait in the low seconds.

use std::time::Duration;

/// Delay in milliseconds before retrying after attempt `attempt_index`.
///
/// Saturates at `u64::MAX` rather than overflowing.
pub fn delay(attempt_index: u32, base_ms: u64) -> u64 {
    u64::from(attempt_index)
        .saturating_add(1)
        .saturating_mul(base_ms)
}

/// [`delay`] as a `Duration`.
pub fn delay_duration(attempt_index: u32, base_ms: u64) -> Duration {
    Duration::from_millis(delay(attempt_index, base_ms))
}

/// Total time spent waiting when `checks` checks all come back indeterminate.
///
/// A wait only happens between checks, so `checks` checks incur `checks - 1` waits.
pub fn total_wait(checks: u32, base_ms: u64) -> u64 {
    (0..checks.saturating_sub(1)).fold(0u64, |acc, i| acc.saturating_add(delay(i, base_ms)))
}
