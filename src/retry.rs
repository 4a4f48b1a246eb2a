use std::{future::Future, time::Duration};

use bon::Builder;
use rand::Rng;
use tokio::time::{Instant, sleep};

use crate::prelude::*;

/// Call kind determines the retry policy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CallKind {
    /// Discovery-phase request, only used to determine applicability.
    Probe,

    /// Aggregation-phase request, the results are committed to the snapshot.
    Live,
}

/// Randomized exponential backoff, bounded by both the attempt count and the elapsed time.
#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct RetryPolicy {
    #[builder(default = 3)]
    pub max_attempts: u32,

    #[builder(default = Duration::from_secs(50))]
    pub max_elapsed: Duration,

    /// Upper bound of the first delay, doubled on every next attempt.
    #[builder(default = Duration::from_secs(2))]
    pub base_delay: Duration,

    #[builder(default = Duration::from_secs(3))]
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn probe() -> Self {
        Self::builder().max_attempts(2).build()
    }

    pub fn live() -> Self {
        Self::builder().max_attempts(3).build()
    }

    /// Policy that retries immediately, handy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::ZERO)
            .max_delay(Duration::ZERO)
            .build()
    }

    /// Random delay before the next attempt, `attempt` is 1-based.
    fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay);
        if ceiling.is_zero() {
            Duration::ZERO
        } else {
            rand::thread_rng().gen_range(Duration::ZERO..=ceiling)
        }
    }

    /// Run the call until it succeeds, fails permanently, or the policy is exhausted.
    ///
    /// The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, kind: CallKind, mut call: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let started_at = Instant::now();
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient(kind) && attempt < self.max_attempts => {
                    let delay = self.delay(attempt);
                    if started_at.elapsed() + delay >= self.max_elapsed {
                        debug!(attempt, "out of time");
                        return Err(error);
                    }
                    warn!(attempt, ?kind, ?delay, error = %error, "retrying…");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
