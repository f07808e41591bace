//! Retry with exponential backoff and jitter.
//!
//! Used for provider calls that are expected to fail for a while before they
//! succeed, such as fetching credentials from a control plane that was just
//! created, and for waiting on a cluster to disappear after delete.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::{error, warn};

use crate::Error;

/// Longest delay a retry schedule may ask for
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Backoff schedule and attempt budget for a retried operation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Maximum number of attempts before giving up (0 = unbounded)
    pub max_attempts: u32,
    /// Delay before the second attempt
    #[serde(with = "secs")]
    pub initial_delay: Duration,
    /// Upper bound for the delay between attempts
    #[serde(with = "secs")]
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each failure
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Config with the default backoff and the given attempt budget
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    /// Config that never gives up
    pub fn unbounded() -> Self {
        Self::with_max_attempts(0)
    }

    /// Reject schedules that would shrink, stall, or overflow the delay.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config(format!(
                "backoffMultiplier must be a finite number >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.max_delay < self.initial_delay {
            return Err(Error::config(format!(
                "maxDelay ({}s) must not be shorter than initialDelay ({}s)",
                self.max_delay.as_secs(),
                self.initial_delay.as_secs()
            )));
        }
        if self.max_delay > MAX_RETRY_DELAY {
            return Err(Error::config(format!(
                "maxDelay ({}s) exceeds the {}s limit",
                self.max_delay.as_secs(),
                MAX_RETRY_DELAY.as_secs()
            )));
        }
        Ok(())
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

/// The last failure of an operation whose attempt budget ran out.
#[derive(Debug, PartialEq)]
pub struct RetriesExhausted<E> {
    /// Number of attempts made
    pub attempts: u32,
    /// Error returned by the final attempt
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetriesExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

/// Run `operation` until it succeeds or the attempt budget is spent.
///
/// The delay grows by `backoff_multiplier` after every failure, capped at
/// `max_delay`, and each sleep is jittered to 0.5x-1.5x.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, RetriesExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay.min(config.max_delay);

    loop {
        attempt += 1;

        let e = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if config.exhausted(attempt) {
            error!(
                operation = %operation_name,
                attempt,
                error = %e,
                "Operation failed after max retries"
            );
            return Err(RetriesExhausted {
                attempts: attempt,
                last_error: e,
            });
        }

        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let jittered_delay = scaled(delay, jitter, config.max_delay);

        warn!(
            operation = %operation_name,
            attempt,
            error = %e,
            delay_ms = jittered_delay.as_millis(),
            "Operation failed, retrying"
        );

        tokio::time::sleep(jittered_delay).await;

        delay = scaled(delay, config.backoff_multiplier, config.max_delay).min(config.max_delay);
    }
}

/// `delay * factor`, falling back to `ceiling` when the product is not a
/// representable duration (negative, NaN, or too large).
fn scaled(delay: Duration, factor: f64, ceiling: Duration) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(ceiling)
}

/// Durations in config files are written as whole seconds
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
