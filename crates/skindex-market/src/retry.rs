//! Retry with bounded exponential backoff for provider calls.

use crate::error::MarketResult;
use serde::{Deserialize, Serialize};
use skindex_telemetry::Metrics;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for transient provider failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Default: 4.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry (ms). Default: 250.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on any single delay (ms). Default: 5,000.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    5_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    ///
    /// `base * 2^(attempt-1)`, raised to a server-provided `Retry-After`,
    /// capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let backoff_ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        let backoff = Duration::from_millis(backoff_ms);

        match retry_after {
            Some(hint) if hint > backoff => hint.min(Duration::from_millis(self.max_delay_ms)),
            _ => backoff,
        }
    }
}

/// Run `f` until it succeeds, fails permanently, or attempts run out.
///
/// Only errors whose `is_transient()` is true are retried. The last error
/// is returned on exhaustion.
pub async fn execute_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut f: F,
) -> MarketResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = MarketResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts && e.is_transient() => {
                let delay = policy.delay_for(attempt, e.retry_after());
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Provider call failed, retrying"
                );
                Metrics::provider_retry(operation);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        };
        assert_eq!(policy.delay_for(1, None), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2, None), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3, None), Duration::from_millis(400));
        assert_eq!(policy.delay_for(5, None), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(64, None), Duration::from_millis(1_000));
    }

    #[test]
    fn test_retry_after_hint() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        // Hint shorter than backoff is ignored; hint beyond the cap is capped.
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_millis(10))),
            Duration::from_millis(250)
        );
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(60))),
            Duration::from_millis(5_000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_eventually() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = execute_with_retry(&RetryPolicy::default(), "test", || {
            let counter = counter.clone();
            async move {
                let current = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if current < 3 {
                    Err(MarketError::Server(503))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_fails_after_max_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: MarketResult<()> = execute_with_retry(&RetryPolicy::default(), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(MarketError::Timeout("10s".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(MarketError::Timeout(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: MarketResult<()> = execute_with_retry(&RetryPolicy::default(), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(MarketError::Client {
                    status: 400,
                    body: "bad item".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(MarketError::Client { status: 400, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
