use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Retries after the first attempt of a single remote change
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const BASE_DELAY_MS: u64 = 500;

/// Maximum backoff delay cap (milliseconds)
const MAX_BACKOFF_MS: u64 = 5000;

/// Bounded exponential backoff applied to remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES + 1,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before the attempt following `attempt` (0-based), capped and
    /// spread with a deterministic jitter of up to a quarter of the delay.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter = (delay / 4).saturating_mul(attempt % 4) / 4;
        delay.saturating_add(jitter)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error or
/// the attempt budget is spent. Returns the last error in the latter cases.
pub async fn with_retry<T, F, Fut>(operation_name: &str, policy: RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {}ms: {}",
                    operation_name,
                    attempt + 1,
                    attempts,
                    delay.as_millis(),
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(target_arch = "wasm32")]
async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        gloo_timers::future::TimeoutFuture::new(millis).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> SyncError {
        SyncError::Api {
            status: 503,
            message: "down".to_string(),
        }
    }

    #[test]
    fn delay_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_micros(1_062_500));
        assert!(policy.delay_for(10) <= Duration::from_millis(5000 + 1250));
        assert!(policy.delay_for(10) >= Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry("flaky", RetryPolicy::immediate(3), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_budget() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = with_retry("down", RetryPolicy::immediate(3), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn default_budget_is_three_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let budget = RetryPolicy::immediate(RetryPolicy::default().max_attempts);
        let result: Result<()> = with_retry("down", budget, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1 + 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = with_retry("missing", RetryPolicy::immediate(5), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SyncError::MissingToken)
        })
        .await;
        assert!(matches!(result, Err(SyncError::MissingToken)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
