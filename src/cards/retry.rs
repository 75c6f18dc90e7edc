//! Fixed-schedule retry for transient inference failures

use backon::{BackoffBuilder, Retryable};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::warn;

use crate::config::GenerationConfig;
use crate::types::{ForgeError, Result};

/// Retry policy: `max_attempts` total tries with delays taken from a schedule
///
/// Attempt `k` (1-based) is followed by `delays[k - 1]`; the last delay repeats
/// when the schedule is shorter than the number of retries. Only errors where
/// `ForgeError::is_retryable` holds are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delays: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delays,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.max_retries, config.retry_delays())
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delays between consecutive attempts (`max_attempts - 1` entries)
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts - 1)
            .map(|i| {
                self.delays
                    .get(i)
                    .or(self.delays.last())
                    .copied()
                    .unwrap_or(Duration::ZERO)
            })
            .collect()
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    ///
    /// On exhaustion the last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, context: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempt = AtomicUsize::new(0);
        let max_attempts = self.max_attempts;

        (|| {
            attempt.fetch_add(1, Ordering::SeqCst);
            operation()
        })
        .retry(Schedule(self.schedule()))
        .when(|e: &ForgeError| e.is_retryable())
        .notify(|e: &ForgeError, delay: Duration| {
            warn!(
                attempt = attempt.load(Ordering::SeqCst),
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "{} failed, retrying: {}",
                context,
                e
            );
        })
        .await
    }
}

/// Backoff over a precomputed delay list
#[derive(Debug, Clone)]
struct Schedule(Vec<Duration>);

impl BackoffBuilder for Schedule {
    type Backoff = std::vec::IntoIter<Duration>;

    fn build(self) -> Self::Backoff {
        self.0.into_iter()
    }
}
