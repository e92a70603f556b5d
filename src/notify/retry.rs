//! Exponential backoff for transports that fail transiently.
//!
//! The same alert is redelivered unchanged on every attempt; transports must
//! tolerate seeing it more than once.

use std::time::Duration;

use super::Notifier;
use crate::alerts::Alert;
use crate::{RetryConfig, SentinelResult};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. 0 is treated as 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            multiplier: config.multiplier,
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), capped at `max_backoff`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        let secs = self.initial_backoff.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Wraps a notifier and retries failed deliveries per [`RetryPolicy`].
pub struct Retrying<N> {
    inner: N,
    policy: RetryPolicy,
}

impl<N: Notifier> Retrying<N> {
    pub fn new(inner: N, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

impl<N: Notifier> Notifier for Retrying<N> {
    fn notify(&mut self, alert: &Alert) -> SentinelResult<()> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.notify(alert) {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= attempts => {
                    log::error!(
                        "[RETRY] Giving up on {} after {} attempts: {}",
                        alert.dedup_key(),
                        attempt,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.policy.backoff_for(attempt);
                    log::warn!(
                        "[RETRY] Delivery of {} failed (attempt {}/{}): {}. Retrying in {:?}",
                        alert.dedup_key(),
                        attempt,
                        attempts,
                        e,
                        delay
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
