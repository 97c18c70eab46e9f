//! Bounded retry for transient ledger conflicts.

use std::time::Duration;

use rand::Rng;

/// Default number of `try_admit` attempts per admission.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(25);

/// How often, and how patiently, the gate retries a transient conflict.
///
/// The delay before retry `n` (1-based) is `base * 2^(n-1)` plus up to
/// `base` of random jitter, so concurrent losers do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_BACKOFF)
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// A policy that never waits. Used in tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    /// Delay before the given retry, without jitter.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1 << exponent)
    }

    /// Delay before the given retry, with jitter.
    #[must_use]
    pub fn jittered_backoff(&self, retry: u32) -> Duration {
        let base = self.backoff(retry);
        if self.base_backoff.is_zero() {
            return base;
        }
        let jitter_ms = u64::try_from(self.base_backoff.as_millis()).unwrap_or(u64::MAX);
        base.saturating_add(Duration::from_millis(
            rand::rng().random_range(0..=jitter_ms),
        ))
    }
}
