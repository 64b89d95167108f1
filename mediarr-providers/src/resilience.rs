//! Retry and timeout layer for outbound provider calls
//!
//! Every network operation issued by a provider client goes through
//! [`execute`], which drives the call with bounded exponential backoff via
//! the `backon` crate. Retryability is decided by the classified error kind
//! (plus HTTP 408/429 by status), never by matching on error text.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};

use crate::error::ClassifiedError;

pub mod timeout {
    //! Default timeouts for provider HTTP calls

    use std::time::Duration;

    /// Default timeout for a single provider HTTP request
    pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Default TCP connect timeout
    pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Retry policy for a provider call.
///
/// Immutable value object; a process-wide default applies unless a
/// per-instance override is supplied through the connection config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the initial attempt; the operation runs at most
    /// `max_retries + 1` times.
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f32,
    /// Adds random jitter to each delay when enabled.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-indexed), capped at
    /// `max_delay`. Jitter is excluded; it is applied by the backoff
    /// builder at execution time.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self
            .base_delay
            .mul_f64(f64::from(self.backoff_factor).powi(attempt as i32));
        scaled.min(self.max_delay)
    }

    /// Build the `backon` backoff for this policy.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.backoff_factor)
            .with_max_times(self.max_retries);
        if self.jitter {
            builder = builder.with_jitter();
        }
        builder
    }
}

/// Run `operation` with retry per `policy`.
///
/// The operation must classify its own failures; the last classified error
/// propagates once retries are exhausted or a non-retryable failure occurs.
/// Dropping the returned future cancels any in-flight attempt and all
/// remaining retries.
pub async fn execute<T, F, Fut>(operation: F, policy: &RetryPolicy) -> Result<T, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClassifiedError>>,
{
    operation
        .retry(policy.backoff())
        .when(ClassifiedError::is_retryable)
        .notify(|err: &ClassifiedError, delay: Duration| {
            tracing::debug!(
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "retrying provider call after transient failure"
            );
        })
        .await
}
