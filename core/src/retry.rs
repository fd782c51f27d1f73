//! Retry policies consulted by the dispatcher.
//!
//! A policy is a pure function of the error kind, the service code and the
//! attempt count; it keeps no state between calls.

use std::fmt::Debug;
use std::time::Duration;

use crate::constants::*;
use crate::{Error, ErrorKind};

/// RetryPolicy decides whether a failed attempt is retried and how long to
/// wait before the next one.
pub trait RetryPolicy: Debug + Send + Sync + 'static {
    /// Check if another attempt should be made after `attempts` retries.
    ///
    /// `err == None` is used as a probe: "would this policy ever retry".
    fn should_retry(&self, err: Option<&Error>, attempts: u32) -> bool;

    /// Delay to wait before the next attempt.
    fn delay_before_next(&self, err: Option<&Error>, attempts: u32) -> Duration;
}

/// NoRetryPolicy never retries.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn should_retry(&self, _: Option<&Error>, _: u32) -> bool {
        false
    }

    fn delay_before_next(&self, _: Option<&Error>, _: u32) -> Duration {
        Duration::ZERO
    }
}

/// BackoffRetryPolicy retries network errors and a fixed set of service
/// codes with exponential backoff.
///
/// ```text
/// delay = min(base_interval * 2^attempts, max_delay)
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BackoffRetryPolicy {
    max_attempts: u32,
    max_delay: Duration,
    base_interval: Duration,
}

impl Default for BackoffRetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRY, DEFAULT_MAX_DELAY, DEFAULT_BASE_INTERVAL)
    }
}

impl BackoffRetryPolicy {
    /// Create a new backoff policy.
    pub fn new(max_attempts: u32, max_delay: Duration, base_interval: Duration) -> Self {
        Self {
            max_attempts,
            max_delay,
            base_interval,
        }
    }

    /// Check if the service code is worth retrying.
    fn is_retryable_code(code: i64) -> bool {
        matches!(code, 500 | 502 | 503 | 400 | CODE_REQUEST_EXPIRED)
    }
}

impl RetryPolicy for BackoffRetryPolicy {
    fn should_retry(&self, err: Option<&Error>, attempts: u32) -> bool {
        if attempts >= self.max_attempts {
            return false;
        }

        let Some(err) = err else {
            return true;
        };

        match err.kind() {
            ErrorKind::Network => true,
            ErrorKind::Service => err.code().is_some_and(Self::is_retryable_code),
            _ => false,
        }
    }

    fn delay_before_next(&self, _: Option<&Error>, attempts: u32) -> Duration {
        2u32.checked_pow(attempts)
            .and_then(|factor| self.base_interval.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}
