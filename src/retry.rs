//! Exponential backoff shared by listing fetches and file transfers
//!
//! Attempts are counted from zero. The delay slept before attempt `n` (n >= 1)
//! is `base ^ n` seconds, raised to the policy floor when that is larger.
//! An operation gives up once `max_attempts` attempts have been made.
//!
//! ```
//! use sumi_mirror::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, 2.0, 0.0);
//! let mut state = policy.state();
//! assert_eq!(state.record_failure(), Some(Duration::from_secs(2)));
//! assert_eq!(state.record_failure(), Some(Duration::from_secs(4)));
//! assert_eq!(state.record_failure(), None);
//! ```

use crate::config::RetryConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Whether another attempt is allowed after `attempt` attempts have been made
pub fn should_retry(attempt: u32, max_attempts: u32) -> bool {
    attempt < max_attempts
}

/// Raw exponential backoff, in seconds, before attempt `attempt`
pub fn backoff_seconds(attempt: u32, base: f64) -> f64 {
    base.powi(attempt.min(i32::MAX as u32) as i32)
}

/// Retry ceiling and backoff shape for one kind of operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: f64,
    floor_secs: f64,
    time_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: f64, floor_secs: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            floor_secs: floor_secs.max(0.0),
            time_unit: Duration::from_secs(1),
        }
    }

    /// Policy for listing page fetches
    pub fn for_pages(config: &RetryConfig) -> Self {
        Self::new(
            config.page_max_attempts,
            config.backoff_base,
            config.page_backoff_floor_secs,
        )
    }

    /// Policy for file probes and transfers
    pub fn for_files(config: &RetryConfig) -> Self {
        Self::new(
            config.file_max_attempts,
            config.backoff_base,
            config.file_backoff_floor_secs,
        )
    }

    /// Rescales what one backoff "second" lasts; tests use milliseconds
    pub fn with_time_unit(mut self, unit: Duration) -> Self {
        self.time_unit = unit;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_base(&self) -> f64 {
        self.backoff_base
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        should_retry(attempt, self.max_attempts)
    }

    /// Delay slept before attempt `attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let secs = backoff_seconds(attempt, self.backoff_base).max(self.floor_secs);
        Duration::try_from_secs_f64(secs * self.time_unit.as_secs_f64()).unwrap_or(Duration::MAX)
    }

    pub fn state(&self) -> RetryState {
        RetryState {
            attempt: 0,
            policy: *self,
        }
    }
}

/// Per-operation attempt counter
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    policy: RetryPolicy,
}

impl RetryState {
    /// Number of failed attempts recorded so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        !self.policy.should_retry(self.attempt)
    }

    /// Records a failed attempt
    ///
    /// Returns the delay to sleep before the next attempt, or `None` when the
    /// attempt ceiling has been reached.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.attempt = self.attempt.saturating_add(1);
        if self.is_exhausted() {
            None
        } else {
            Some(self.policy.backoff_delay(self.attempt))
        }
    }
}

/// Sleeps for `delay` unless cancelled first
///
/// Returns `false` when the token fired before the delay elapsed.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
