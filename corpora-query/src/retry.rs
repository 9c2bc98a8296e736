//! Bounded retry policy for transient fetch failures.
//!
//! Retry lives at the query layer, not inside the fetch executor, so retry
//! counts and backoff stay observable in one place. Only transport errors
//! are retried; remote 4xx responses are client errors and never transient.

use std::time::Duration;

/// Exponential backoff with jitter, bounded by an attempt count.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 disables retry.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Backoff growth factor per attempt.
    pub multiplier: f64,
    /// Uniform random jitter added to each delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            multiplier: 2.0,
            jitter: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff delay before the given retry (0-based retry index).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(retry as i32);
        let jitter = if self.jitter.is_zero() {
            0
        } else {
            rand::random_range(0..self.jitter.as_millis() as u64 + 1)
        };
        Duration::from_millis(base as u64 + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: Duration::ZERO,
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_none_policy_has_single_attempt() {
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
