//! Retry with capped exponential backoff for transient extraction errors.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::ExtractError;

/// Backoff schedule shared by every tier. Delay for attempt `n` is
/// `min(2^n, 60)` seconds plus up to one second of jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    fn delay_for(attempt: u32) -> Duration {
        let base_secs = 2u64.saturating_pow(attempt.min(6)).min(60);
        let jitter_ms = rand::rng().random_range(0..1000);
        Duration::from_secs(base_secs) + Duration::from_millis(jitter_ms)
    }

    /// Runs `operation`, retrying transient failures up to `max_retries`
    /// additional times. A [`ExtractError::RateLimited`] error's own
    /// retry-after hint overrides the exponential delay when it is longer.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ExtractError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExtractError>>,
    {
        let mut attempt = 0u32;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_transient() || attempt >= self.max_retries {
                        return Err(err);
                    }
                    err
                }
            };

            let mut delay = Self::delay_for(attempt);
            if let ExtractError::RateLimited {
                retry_after_secs, ..
            } = &err
            {
                delay = delay.max(Duration::from_secs(*retry_after_secs));
            }
            warn!(
                attempt,
                max_retries = self.max_retries,
                delay_secs = delay.as_secs_f64(),
                error = %err,
                "transient extraction error, retrying after backoff"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
