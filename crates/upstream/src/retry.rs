//! Retry with exponential backoff around a single upstream call.

use crate::error::{ApiError, Result};
use std::future::Future;
use std::time::Duration;

/// Bounded exponential-backoff policy.
///
/// `max_attempts` counts the first try: a policy of 3 makes at most three
/// calls with sleeps of `initial_delay` and `initial_delay * multiplier`
/// between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Run `op`, re-attempting on retryable errors.
    ///
    /// Success returns immediately with no further attempts. Terminal errors
    /// (see [`ApiError::is_retryable`]) short-circuit on the attempt that
    /// raised them. On exhaustion the *last* error is surfaced, never the
    /// first.
    ///
    /// # Errors
    ///
    /// Returns the final attempt's error once retries are exhausted or a
    /// terminal error occurs.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    if attempt >= self.max_attempts {
                        tracing::warn!(
                            attempts = attempt,
                            error = %e,
                            "upstream call failed after final attempt"
                        );
                        return Err(e);
                    }
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "upstream call failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.multiplier);
                }
            }
        }
    }
}
