//! Common time/tick helpers for fuzzyof_core.

use std::time::Duration;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;
/// Number of milliseconds in one minute.
pub const MILLIS_PER_MIN: u64 = 60_000;

/// Convert device clock ticks to milliseconds: `ticks·1000 / tps`.
/// - Clamps `ticks_per_second` to at least 1 to avoid division by zero.
#[inline]
pub fn ticks_to_ms(ticks: u32, ticks_per_second: u32) -> u64 {
    u64::from(ticks) * MILLIS_PER_SEC / u64::from(ticks_per_second.max(1))
}

/// Whole milliseconds of a duration, saturating at `u64::MAX`.
#[inline]
pub fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_convert_with_truncation() {
        assert_eq!(ticks_to_ms(32_768, 32_768), 1_000);
        assert_eq!(ticks_to_ms(1, 3), 333);
        assert_eq!(ticks_to_ms(u32::MAX, 1), u64::from(u32::MAX) * 1_000);
    }

    #[test]
    fn zero_tick_rate_is_treated_as_one() {
        assert_eq!(ticks_to_ms(5, 0), 5_000);
    }
}
