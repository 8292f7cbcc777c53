//! Bounded retry with per-attempt timeout and exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::config::ConnectRetryConfig;
use crate::metrics::METRICS;

/// A value obtained after `attempts` tries (1 = first try succeeded).
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// Every attempt failed or timed out; `reason` is from the last one.
    Exhausted { attempts: u32, reason: String },
    Cancelled,
}

fn backoff(config: &ConnectRetryConfig, attempt: u32) -> Duration {
    let factor = 1u64 << (attempt.saturating_sub(1)).min(16);
    Duration::from_millis(config.backoff_base_ms.saturating_mul(factor))
}

/// Run `attempt_fn` until it succeeds, the retry budget runs out, or `cancel` fires.
///
/// Each attempt is bounded by `config.timeout_ms`. The delay before retry `n`
/// is `backoff_base_ms * 2^(n-1)`. Cancellation is observed both during an
/// attempt and during the backoff sleep.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &ConnectRetryConfig,
    cancel: &CancellationToken,
    attempt_fn: F,
) -> Result<Attempted<T>, RetryError>
where
    E: Display,
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_retries + 1;
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut attempt = 1;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            result = tokio::time::timeout(timeout, attempt_fn(attempt)) => result,
        };

        let reason = match result {
            Ok(Ok(value)) => return Ok(Attempted { value, attempts: attempt }),
            Ok(Err(err)) => err.to_string(),
            Err(_elapsed) => format!("attempt timed out after {}ms", config.timeout_ms),
        };

        if attempt >= max_attempts {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                reason,
            });
        }

        let delay = backoff(config, attempt);
        tracing::warn!(attempt, max_attempts, delay_ms = delay.as_millis() as u64, reason = %reason, "retrying");
        METRICS.inc_connection_retries();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn config(max_retries: u32) -> ConnectRetryConfig {
        ConnectRetryConfig {
            timeout_ms: 1_000,
            max_retries,
            backoff_base_ms: 100,
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let cfg = config(3);
        assert_eq!(backoff(&cfg, 1), Duration::from_millis(100));
        assert_eq!(backoff(&cfg, 2), Duration::from_millis(200));
        assert_eq!(backoff(&cfg, 3), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let out = retry_with_backoff(&config(3), &CancellationToken::new(), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("connection refused")
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out.attempts, 3);
        assert_eq!(out.value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_reports_last_reason() {
        let err = retry_with_backoff(&config(1), &CancellationToken::new(), |attempt| async move {
            Err::<(), _>(format!("refused #{attempt}"))
        })
        .await
        .unwrap_err();
        assert_eq!(
            err,
            RetryError::Exhausted {
                attempts: 2,
                reason: "refused #2".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_failure() {
        let err = retry_with_backoff(&config(0), &CancellationToken::new(), |_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), String>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 1, ref reason } if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn test_cancelled_before_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = retry_with_backoff(&config(3), &cancel, |_| async { Ok::<(), String>(()) })
            .await
            .unwrap_err();
        assert_eq!(err, RetryError::Cancelled);
    }
}
