//! Retry policy shared by the network collaborators.
//!
//! The policy wraps a single async call; callers decide which errors are
//! retryable. Rate limits are never retried here.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// How long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay doubles after each failed attempt.
    Exponential,
}

/// Bounded retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_retries,
            base_delay,
            backoff,
        }
    }

    /// Generative model endpoint: exactly one retry.
    pub fn model_endpoint() -> Self {
        Self::new(1, Duration::from_secs(1), Backoff::Fixed)
    }

    /// Mail listing endpoint: three retries, exponential backoff.
    pub fn mail_endpoint() -> Self {
        Self::new(3, Duration::from_millis(500), Backoff::Exponential)
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                self.base_delay.saturating_mul(factor)
            }
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut, P>(&self, label: &str, mut op: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if retry < self.max_retries && is_retryable(&e) => {
                    retry += 1;
                    let delay = self.delay_for(retry) + jitter(self.base_delay);
                    warn!(
                        operation = label,
                        attempt = retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Up to a quarter of the base delay.
fn jitter(base: Duration) -> Duration {
    let max_ms = (base.as_millis() / 4) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn instant(policy: RetryPolicy) -> RetryPolicy {
        policy.with_base_delay(Duration::ZERO)
    }

    #[test]
    fn exponential_delays_double() {
        let policy = RetryPolicy::mail_endpoint();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn fixed_delay_is_constant() {
        let policy = RetryPolicy::model_endpoint();
        assert_eq!(policy.delay_for(1), policy.delay_for(5));
        assert_eq!(policy.max_retries, 1);
    }

    #[tokio::test]
    async fn model_policy_retries_exactly_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = instant(RetryPolicy::model_endpoint())
            .run(
                "test",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Transient)
                },
                |e| matches!(e, TestError::Transient),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mail_policy_retries_three_times() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = instant(RetryPolicy::mail_endpoint())
            .run(
                "test",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Transient)
                },
                |e| matches!(e, TestError::Transient),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = instant(RetryPolicy::mail_endpoint())
            .run(
                "test",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Fatal)
                },
                |e| matches!(e, TestError::Transient),
            )
            .await;
        assert!(matches!(result, Err(TestError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = instant(RetryPolicy::mail_endpoint())
            .run(
                "test",
                || async {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok("done")
                    }
                },
                |e| matches!(e, TestError::Transient),
            )
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
