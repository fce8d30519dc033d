//! Bounded retry with exponential backoff for fallible async operations.
//!
//! [`with_retry`] is the one place in the realtime core that hands the final
//! error back to its caller. The cache and bus wrappers call it and then
//! decide themselves how to degrade.
//!
//! There is no jitter and no circuit breaker. The worst-case latency of a
//! call is the sum of its backoff delays (plus the per-attempt timeout when
//! [`with_retry_timeout`] is used).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

/// Errors that can tell whether a failed operation is worth another attempt.
pub trait Retryable {
    /// Returns `true` if the failure is transient.
    fn is_retryable(&self) -> bool;

    /// Returns `true` if the request provably never reached the remote
    /// side, so resending cannot apply it twice.
    fn is_unsent(&self) -> bool {
        false
    }
}

/// Which failures a [`RetryPolicy`] retries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RetryOn {
    /// Retry every failure.
    #[default]
    Any,
    /// Retry failures whose [`Retryable::is_retryable`] returns `true`.
    Transient,
    /// Retry only failures whose [`Retryable::is_unsent`] returns `true`.
    /// Use for commands that are not idempotent.
    Unsent,
    /// Retry failures whose message contains one of the substrings.
    /// An empty list retries everything.
    MessageContains(Vec<String>),
}

/// Retry configuration for [`with_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_retries: u32,
    /// Delay before the second attempt.
    pub delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,
    /// Failure filter.
    pub retry_on: RetryOn,
    /// Upper bound for a single attempt, used by [`with_retry_timeout`].
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(300),
            backoff_factor: 1.5,
            retry_on: RetryOn::Any,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Sets the total number of attempts.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    /// Sets the failure filter.
    #[must_use]
    pub fn with_retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Returns `true` if `err` passes the failure filter.
    pub fn should_retry<E: Retryable + Display>(&self, err: &E) -> bool {
        match &self.retry_on {
            RetryOn::Any => true,
            RetryOn::Transient => err.is_retryable(),
            RetryOn::Unsent => err.is_unsent(),
            RetryOn::MessageContains(needles) => {
                if needles.is_empty() {
                    return true;
                }
                let message = err.to_string();
                needles.iter().any(|n| message.contains(n.as_str()))
            }
        }
    }
}

/// Bookkeeping for a single [`with_retry`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based number of the attempt in flight.
    pub attempt: u32,
    /// Delay to wait before the next attempt.
    pub delay: Duration,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

impl RetryAttempt {
    fn first(delay: Duration) -> Self {
        Self {
            attempt: 1,
            delay,
            last_error: None,
        }
    }

    fn advance(&mut self, backoff_factor: f64) {
        self.attempt = self.attempt.saturating_add(1);
        self.delay = Duration::try_from_secs_f64(self.delay.as_secs_f64() * backoff_factor)
            .unwrap_or(self.delay);
    }
}

/// Runs `operation` until it succeeds, the failure is not retryable, or
/// `policy.max_retries` attempts have been made.
///
/// # Errors
///
/// Returns the last error produced by `operation` when retries are
/// exhausted or the failure does not pass the policy's filter.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = policy.max_retries.max(1);
    let mut state = RetryAttempt::first(policy.delay);

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if state.attempt >= max_attempts || !policy.should_retry(&err) {
            tracing::debug!(
                attempt = state.attempt,
                previous_error = state.last_error.as_deref().unwrap_or(""),
                error = %err,
                "giving up on operation"
            );
            return Err(err);
        }

        tracing::warn!(
            attempt = state.attempt,
            delay_ms = u64::try_from(state.delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "operation failed, retrying"
        );
        state.last_error = Some(err.to_string());
        tokio::time::sleep(state.delay).await;
        state.advance(policy.backoff_factor);
    }
}

/// Same as [`with_retry`], but bounds every attempt with
/// `policy.attempt_timeout`. An elapsed attempt fails with `E::from(Elapsed)`.
///
/// # Errors
///
/// Returns the last error, which may be a converted timeout.
pub async fn with_retry_timeout<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display + From<Elapsed>,
{
    let Some(limit) = policy.attempt_timeout else {
        return with_retry(policy, operation).await;
    };

    with_retry(policy, || {
        let attempt = operation();
        async move {
            match tokio::time::timeout(limit, attempt).await {
                Ok(result) => result,
                Err(elapsed) => Err(E::from(elapsed)),
            }
        }
    })
    .await
}
