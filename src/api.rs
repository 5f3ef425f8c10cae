//! Retry with exponential backoff for WordPress calls.
//!
//! The legacy site is slow and occasionally answers 502/503 under load, so
//! the export wraps its requests in a [`RetryPolicy`]. Only errors that
//! [`WpError::is_transient`] classifies as retryable are retried; a 404 or a
//! 401 fails immediately.
//!
//! # Retry Strategy
//!
//! - Up to `max_retries` retries after the first attempt
//! - Exponential backoff starting at `base_delay`
//! - Delay capped at `max_delay`
//! - Random jitter (0..=`max_jitter`) added to every delay

use crate::wordpress::WpError;
use rand::{Rng, rng};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Backoff parameters.
///
/// The delay before retry `n` (1-based) is:
/// ```text
/// delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries before giving up.
    pub max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to each delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rng().random_range(0..=max_ms))
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// # Arguments
    ///
    /// * `what` - Short label for logs (e.g. `"list actualites"`)
    /// * `op` - Produces a fresh future for each attempt
    ///
    /// # Returns
    ///
    /// The first successful result, or the last error.
    #[instrument(level = "debug", skip(self, op))]
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, WpError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, WpError>>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if !e.is_transient() {
                        return Err(e);
                    }
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "{what}: exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt) + self.jitter();
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "{what}: attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
