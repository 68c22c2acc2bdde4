//! Reconnect backoff calculation.
//!
//! The pure math only. The reconnect scheduler in `einkauf-realtime` adds
//! uniform random jitter on top of the value computed here, so that many
//! clients dropped by the same server restart do not retry in lockstep.

/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default maximum delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Default jitter bound in milliseconds; actual jitter is uniform in
/// `[0, bound)`.
pub const DEFAULT_JITTER_MS: u64 = 1000;

/// Exponential reconnect delay without jitter.
///
/// Formula: `min(base_delay * 2^attempt, max_delay)`.
///
/// `attempt` is the zero-based count of failed attempts *before* this one;
/// attempt 0 yields exactly `base_delay_ms`. Shifts are clamped so very
/// high attempt counts saturate at `max_delay_ms` instead of overflowing.
#[must_use]
pub fn reconnect_delay_ms(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> u64 {
    base_delay_ms
        .saturating_mul(1u64 << attempt.min(31))
        .min(max_delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_per_attempt() {
        assert_eq!(reconnect_delay_ms(0, 1000, 30_000), 1000);
        assert_eq!(reconnect_delay_ms(1, 1000, 30_000), 2000);
        assert_eq!(reconnect_delay_ms(2, 1000, 30_000), 4000);
        assert_eq!(reconnect_delay_ms(3, 1000, 30_000), 8000);
        assert_eq!(reconnect_delay_ms(4, 1000, 30_000), 16_000);
    }

    #[test]
    fn delay_caps_at_max() {
        // 1000 * 2^5 = 32000 exceeds the cap
        assert_eq!(reconnect_delay_ms(5, 1000, 30_000), 30_000);
        assert_eq!(reconnect_delay_ms(10, 1000, 30_000), 30_000);
    }

    #[test]
    fn matches_formula_for_first_ten_attempts() {
        for attempt in 0..=10u32 {
            let expected = (1000u64 * 2u64.pow(attempt)).min(30_000);
            assert_eq!(
                reconnect_delay_ms(attempt, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS),
                expected,
                "attempt {attempt}"
            );
        }
    }

    #[test]
    fn high_attempt_does_not_overflow() {
        assert_eq!(reconnect_delay_ms(u32::MAX, 1000, 30_000), 30_000);
        assert_eq!(reconnect_delay_ms(63, u64::MAX, u64::MAX), u64::MAX);
    }

    #[test]
    fn zero_base_stays_zero() {
        assert_eq!(reconnect_delay_ms(4, 0, 30_000), 0);
    }
}
