//! Exponential retry backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff: `base * 2^(n-1)` for the n-th retry, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling applied to every computed delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Ceiling used when none is configured.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30 * 60);

    /// Policy with the default 30 minute ceiling.
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }

    /// Override the ceiling.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before retry number `retry_count` (1-based).
    pub fn backoff(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        let Some(factor) = 2u32.checked_pow(retry_count - 1) else {
            return self.max_delay;
        };
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_backoff_doubles_until_capped() {
        let policy = RetryPolicy::new(MINUTE);
        let delays: Vec<u64> = (1..=8).map(|n| policy.backoff(n).as_secs() / 60).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn test_backoff_never_overflows() {
        let policy = RetryPolicy::new(Duration::from_secs(3600));
        assert_eq!(policy.backoff(u32::MAX), RetryPolicy::DEFAULT_MAX_DELAY);
        assert_eq!(policy.backoff(40), RetryPolicy::DEFAULT_MAX_DELAY);
        // 2^31 still fits the factor, 2^32 does not.
        let tiny = RetryPolicy::new(Duration::from_nanos(1)).with_max_delay(Duration::MAX);
        assert_eq!(tiny.backoff(32), Duration::from_nanos(1 << 31));
        assert_eq!(tiny.backoff(33), Duration::MAX);
    }

    #[test]
    fn test_custom_ceiling() {
        let policy =
            RetryPolicy::new(Duration::from_millis(10)).with_max_delay(Duration::from_millis(25));
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(20));
        assert_eq!(policy.backoff(3), Duration::from_millis(25));
    }

    #[test]
    fn test_zeroth_retry_has_no_delay() {
        assert_eq!(RetryPolicy::default().backoff(0), Duration::ZERO);
    }
}
