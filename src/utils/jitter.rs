//! Simple jitter utility for retry mechanisms
//!
//! Provides lightweight jitter generation using system time instead of external random crates.

use std::time::{SystemTime, UNIX_EPOCH};

/// Generate jitter using the clock's sub-second nanoseconds as pseudo-randomness
///
/// Returns a value between 0 and `max_jitter_ms` (inclusive).
///
/// ```
/// use iptv_viewer::utils::jitter::generate_jitter_ms;
///
/// let jitter = generate_jitter_ms(100);
/// assert!(jitter <= 100);
/// ```
pub fn generate_jitter_ms(max_jitter_ms: u64) -> u64 {
    if max_jitter_ms == 0 {
        return 0;
    }

    // A clock before the epoch only loses randomness, not correctness
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or_default();

    u64::from(nanos) % (max_jitter_ms + 1)
}

/// Generate jitter as a percentage of a base value
///
/// ```
/// use iptv_viewer::utils::jitter::generate_jitter_percent;
///
/// let jitter = generate_jitter_percent(1000, 25); // 0-250ms
/// assert!(jitter <= 250);
/// ```
pub fn generate_jitter_percent(base_value: u64, jitter_percent: u8) -> u64 {
    if jitter_percent == 0 || base_value == 0 {
        return 0;
    }

    let max_jitter = base_value.saturating_mul(u64::from(jitter_percent)) / 100;
    generate_jitter_ms(max_jitter)
}
