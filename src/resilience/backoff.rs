//! Bounded exponential backoff for upstream reconnects.

use std::time::Duration;

use crate::config::BackoffConfig;

/// Reconnect delay policy.
///
/// Deterministic: no jitter, so a given sequence of failures always yields
/// the same delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    factor: u32,
    max: Duration,
}

impl Backoff {
    pub const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
    pub const FACTOR: u32 = 2;
    pub const MAX_DELAY: Duration = Duration::from_millis(30_000);

    pub fn new(initial: Duration, factor: u32, max: Duration) -> Self {
        Self {
            initial,
            factor: factor.max(1),
            max: max.max(initial),
        }
    }

    /// Delay used for the first failure after a successful connect.
    pub fn reset(&self) -> Duration {
        self.initial
    }

    /// Delay following `delay`: `min(delay * factor, max)`.
    pub fn next(&self, delay: Duration) -> Duration {
        delay.saturating_mul(self.factor).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Self::INITIAL_DELAY, Self::FACTOR, Self::MAX_DELAY)
    }
}

impl From<BackoffConfig> for Backoff {
    fn from(config: BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_ms),
            config.factor,
            Duration::from_millis(config.max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubling_sequence() {
        let backoff = Backoff::default();
        let mut delay = backoff.reset();
        let mut seen = vec![delay.as_millis()];
        for _ in 0..6 {
            delay = backoff.next(delay);
            seen.push(delay.as_millis());
        }
        assert_eq!(seen, vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
    }

    #[test]
    fn test_capped_at_max() {
        let backoff = Backoff::default();
        assert_eq!(backoff.next(Duration::from_millis(29_000)), Backoff::MAX_DELAY);
        assert_eq!(backoff.next(Backoff::MAX_DELAY), Backoff::MAX_DELAY);
    }

    #[test]
    fn test_huge_delay_does_not_overflow() {
        let backoff = Backoff::default();
        assert_eq!(backoff.next(Duration::MAX), Backoff::MAX_DELAY);
    }

    #[test]
    fn test_from_config() {
        let backoff = Backoff::from(BackoffConfig {
            initial_ms: 100,
            factor: 3,
            max_ms: 500,
        });
        assert_eq!(backoff.reset(), Duration::from_millis(100));
        assert_eq!(backoff.next(Duration::from_millis(100)), Duration::from_millis(300));
        assert_eq!(backoff.next(Duration::from_millis(300)), Duration::from_millis(500));
    }

    #[test]
    fn test_factor_one_is_constant() {
        let backoff = Backoff::new(Duration::from_millis(250), 1, Duration::from_secs(1));
        assert_eq!(backoff.next(backoff.reset()), Duration::from_millis(250));
    }
}
