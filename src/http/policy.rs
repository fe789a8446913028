//! Retry policy: how many attempts, how long to wait, and which statuses are transient.

use std::time::Duration;

use reqwest::StatusCode;

use super::error::PolicyError;
use super::retry::is_retryable_status;

/// Delay before the first retry in milliseconds.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1500;

/// Multiplier applied to the delay after each failed attempt.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Upper bound for the delay between attempts in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;

/// Attempt limit of the limited preset.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Classifies a response status as retryable.
pub type StatusPredicate = fn(StatusCode) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAttempts {
    /// Give up after this many attempts (the first attempt counts)
    Limited(u32),
    /// Keep retrying until success or a non-retryable response
    Unbounded,
}

impl MaxAttempts {
    /// Whether `attempt` (1-based) is the last one allowed.
    pub fn is_last(&self, attempt: u32) -> bool {
        match self {
            MaxAttempts::Limited(max) => attempt >= *max,
            MaxAttempts::Unbounded => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: MaxAttempts,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub retryable_status: StatusPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::limited(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Default delays, giving up after `max_attempts` attempts.
    pub fn limited(max_attempts: u32) -> Self {
        Self {
            max_attempts: MaxAttempts::Limited(max_attempts),
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            retryable_status: is_retryable_status,
        }
    }

    /// Default delays, retrying transient failures forever.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: MaxAttempts::Unbounded,
            ..Self::limited(DEFAULT_MAX_ATTEMPTS)
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_retryable_status(mut self, predicate: StatusPredicate) -> Self {
        self.retryable_status = predicate;
        self
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_attempts == MaxAttempts::Limited(0) {
            return Err(PolicyError::ZeroMaxAttempts);
        }
        if self.initial_delay.is_zero() {
            return Err(PolicyError::ZeroInitialDelay);
        }
        // NaN fails this comparison too
        if !(self.backoff_factor >= 1.0) {
            return Err(PolicyError::BackoffFactorBelowOne(self.backoff_factor));
        }
        if self.max_delay < self.initial_delay {
            return Err(PolicyError::MaxDelayBelowInitial);
        }
        Ok(())
    }

    pub fn is_retryable(&self, status: StatusCode) -> bool {
        (self.retryable_status)(status)
    }

    /// Delay before the `retry`-th retry (1-based):
    /// `min(initial_delay * backoff_factor^(retry - 1), max_delay)`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        scale(
            self.initial_delay,
            self.backoff_factor.powi(exponent),
            self.max_delay,
        )
    }

    /// Delay sequence for one logical call.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            retry: 0,
            last: Duration::ZERO,
        }
    }
}

/// Successive inter-attempt delays. Never shrinks; saturates at the cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    retry: u32,
    last: Duration,
}

impl Backoff {
    pub fn next_delay(&mut self) -> Duration {
        self.retry = self.retry.saturating_add(1);
        self.last = self.policy.delay_for_retry(self.retry).max(self.last);
        self.last
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

// Works in whole nanoseconds so products of exact values stay exact.
fn scale(delay: Duration, factor: f64, max: Duration) -> Duration {
    let nanos = delay.as_nanos() as f64 * factor;
    if !nanos.is_finite() || nanos >= max.as_nanos() as f64 {
        return max;
    }
    Duration::from_nanos(nanos.round() as u64).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_default_policy_matches_mobile_client() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, MaxAttempts::Limited(10));
        assert_eq!(policy.initial_delay, ms(1500));
        assert_eq!(policy.backoff_factor, 2.0);
        assert_eq!(policy.max_delay, ms(60_000));
        assert!(policy.validate().is_ok());

        let unbounded = RetryPolicy::unbounded();
        assert_eq!(unbounded.max_attempts, MaxAttempts::Unbounded);
        assert_eq!(unbounded.initial_delay, ms(1500));
        assert!(unbounded.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_policies() {
        assert_eq!(
            RetryPolicy::limited(0).validate(),
            Err(PolicyError::ZeroMaxAttempts)
        );
        assert_eq!(
            RetryPolicy::limited(3)
                .with_initial_delay(Duration::ZERO)
                .validate(),
            Err(PolicyError::ZeroInitialDelay)
        );
        assert_eq!(
            RetryPolicy::limited(3).with_backoff_factor(0.5).validate(),
            Err(PolicyError::BackoffFactorBelowOne(0.5))
        );
        assert!(matches!(
            RetryPolicy::limited(3)
                .with_backoff_factor(f64::NAN)
                .validate(),
            Err(PolicyError::BackoffFactorBelowOne(_))
        ));
        assert_eq!(
            RetryPolicy::limited(3)
                .with_initial_delay(ms(500))
                .with_max_delay(ms(100))
                .validate(),
            Err(PolicyError::MaxDelayBelowInitial)
        );
    }

    #[test]
    fn test_max_attempts_is_last() {
        assert!(!MaxAttempts::Limited(3).is_last(2));
        assert!(MaxAttempts::Limited(3).is_last(3));
        assert!(MaxAttempts::Limited(1).is_last(1));
        assert!(!MaxAttempts::Unbounded.is_last(u32::MAX));
    }

    #[test]
    fn test_default_backoff_sequence_caps_at_one_minute() {
        let delays: Vec<_> = RetryPolicy::default().backoff().take(8).collect();
        assert_eq!(
            delays,
            vec![
                ms(1500),
                ms(3000),
                ms(6000),
                ms(12_000),
                ms(24_000),
                ms(48_000),
                ms(60_000),
                ms(60_000),
            ]
        );
    }

    #[test]
    fn test_backoff_matches_closed_form() {
        for factor in [1.0, 1.5, 2.0, 3.0] {
            let policy = RetryPolicy::limited(5)
                .with_initial_delay(ms(100))
                .with_backoff_factor(factor)
                .with_max_delay(ms(10_000));

            let mut backoff = policy.backoff();
            for retry in 1..=12 {
                assert_eq!(
                    backoff.next_delay(),
                    policy.delay_for_retry(retry),
                    "factor {} retry {}",
                    factor,
                    retry
                );
            }
        }
    }

    #[test]
    fn test_fractional_factor_does_not_drift() {
        let policy = RetryPolicy::limited(12)
            .with_initial_delay(ms(100))
            .with_backoff_factor(1.5)
            .with_max_delay(ms(10_000));

        let delays: Vec<_> = policy.backoff().take(12).collect();
        assert_eq!(delays[10], Duration::from_nanos(5_766_503_906));
        assert_eq!(delays[11], Duration::from_nanos(8_649_755_859));
    }

    #[test]
    fn test_tiny_delay_still_grows_to_cap() {
        let policy = RetryPolicy::unbounded()
            .with_initial_delay(Duration::from_micros(1))
            .with_backoff_factor(1.0004)
            .with_max_delay(ms(1));

        let mut backoff = policy.backoff();
        assert_eq!(backoff.next_delay(), Duration::from_micros(1));
        assert_eq!(backoff.nth(1), Some(Duration::from_nanos(1001)));
        assert_eq!(backoff.nth(20_000), Some(ms(1)));
    }

    #[test]
    fn test_backoff_never_shrinks() {
        let policy = RetryPolicy::unbounded()
            .with_initial_delay(ms(7))
            .with_backoff_factor(1.3)
            .with_max_delay(ms(900));

        let delays: Vec<_> = policy.backoff().take(50).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*delays.last().unwrap(), ms(900));
    }

    #[test]
    fn test_huge_factor_saturates_without_overflow() {
        let policy = RetryPolicy::unbounded()
            .with_initial_delay(ms(1))
            .with_backoff_factor(f64::MAX)
            .with_max_delay(ms(5));

        let mut backoff = policy.backoff();
        assert_eq!(backoff.next_delay(), ms(1));
        assert_eq!(backoff.next_delay(), ms(5));
        assert_eq!(backoff.next_delay(), ms(5));
        assert_eq!(policy.delay_for_retry(u32::MAX), ms(5));
    }

    #[test]
    fn test_custom_status_predicate() {
        let policy = RetryPolicy::limited(3).with_retryable_status(|s| s == StatusCode::CONFLICT);
        assert!(policy.is_retryable(StatusCode::CONFLICT));
        assert!(!policy.is_retryable(StatusCode::SERVICE_UNAVAILABLE));
    }
}
