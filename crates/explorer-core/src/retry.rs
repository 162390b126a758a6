//! Retry with exponential backoff
//!
//! Retries an operation up to `max_retries` times, sleeping
//! `base_delay * 2^attempt` between attempts, and surfaces the classified
//! error of the final attempt. Controllers only use it when retries are
//! enabled in configuration; otherwise the only recovery is a manual refetch.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::classify::{ClassifiedError, ErrorClassifier};

/// Which classified failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    /// Every failure
    Any,
    /// Only RATE_LIMIT, SERVER_ERROR and TIMEOUT
    Transient,
}

/// Backoff policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each following one
    pub base_delay: Duration,
    pub retry_on: RetryOn,
}

impl RetryPolicy {
    /// Policy that retries every failure
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            retry_on: RetryOn::Any,
        }
    }

    pub fn with_retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Delay after the given (zero-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Whether a failure of this kind should be retried
    pub fn should_retry(&self, error: &ClassifiedError) -> bool {
        match self.retry_on {
            RetryOn::Any => true,
            RetryOn::Transient => error.kind.is_transient(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Run `operation` under `policy`
///
/// Makes at most `max_retries + 1` attempts. Returns the first success, or
/// the classified error of the last attempt made.
pub async fn retry_with_backoff<T, F, Fut>(
    mut operation: F,
    policy: &RetryPolicy,
    classifier: &ErrorClassifier,
) -> Result<T, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    let mut attempt = 0;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => classifier.classify(&e),
        };

        if attempt >= policy.max_retries {
            debug!("Giving up after {} attempt(s): {}", attempt + 1, error.code());
            return Err(error);
        }
        if !policy.should_retry(&error) {
            debug!("Not retrying {} failure", error.code());
            return Err(error);
        }

        let delay = policy.delay_for(attempt);
        warn!(
            "Attempt {} failed ({}), retrying in {:?}",
            attempt + 1,
            error.code(),
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
