//! Connection retry with exponential backoff.
//!
//! Opening a `SQLite` file can fail transiently: the file may be locked by a
//! writer finishing a checkpoint, or the volume may not be mounted yet. The
//! [`retry_connection`] loop retries such failures a bounded number of times.
//!
//! # Backoff
//!
//! ```text
//! attempt 1 --fail--> sleep(base) --> attempt 2 --fail--> sleep(2*base) --> ...
//!                                                                   |
//!            after max_retries retries, or once the connect timeout  |
//!            would be exceeded, the last error is returned  <--------+
//! ```

use crate::Result;
use crate::config::DatabaseConfig;
use std::time::{Duration, Instant};

/// Retry settings for connection acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Overall budget for all attempts and sleeps.
    pub connect_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

impl RetryPolicy {
    /// Builds a policy from the database settings.
    #[must_use]
    pub const fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_delay,
            connect_timeout: config.connect_timeout,
        }
    }

    /// Sets the retry count.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the overall connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs `connect` until it succeeds or the policy is exhausted.
///
/// Each failed attempt that will be retried is logged at warn level. When
/// retries run out, or the next sleep would overrun the connect timeout, the
/// failure is logged at error level and the last error is returned as is.
pub fn retry_connection<T, F>(
    policy: &RetryPolicy,
    backend: &'static str,
    operation: &'static str,
    mut connect: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let started = Instant::now();
    let mut retry = 0u32;

    loop {
        let err = match connect() {
            Ok(value) => {
                if retry > 0 {
                    tracing::info!(
                        backend,
                        operation,
                        attempts = retry + 1,
                        "Connection established after retry"
                    );
                }
                return Ok(value);
            },
            Err(err) => err,
        };

        let attempt = retry + 1;
        if retry >= policy.max_retries {
            tracing::error!(
                backend,
                operation,
                attempts = attempt,
                error = %err,
                "Failed to connect after {attempt} attempts"
            );
            metrics::counter!(
                "storage_connection_failures_total",
                "backend" => backend,
                "operation" => operation
            )
            .increment(1);
            return Err(err);
        }

        let delay = policy.delay_for(retry);
        if started.elapsed().saturating_add(delay) > policy.connect_timeout {
            tracing::error!(
                backend,
                operation,
                attempts = attempt,
                timeout_ms = u64::try_from(policy.connect_timeout.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Connect timeout reached, giving up"
            );
            metrics::counter!(
                "storage_connection_failures_total",
                "backend" => backend,
                "operation" => operation
            )
            .increment(1);
            return Err(err);
        }

        tracing::warn!(
            backend,
            operation,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "Connection attempt failed, retrying"
        );
        metrics::counter!(
            "storage_connection_retries_total",
            "backend" => backend,
            "operation" => operation
        )
        .increment(1);

        std::thread::sleep(delay);
        retry += 1;
    }
}
