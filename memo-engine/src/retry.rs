//! Exponential backoff with jitter for transient provider failures (spec
//! §7, §11).

use std::{future::Future, time::Duration};

use rand::Rng;

use crate::error::{EngineError, Result};

/// Runs `op`, retrying on [`EngineError::is_retriable`] failures with
/// exponential backoff and full jitter, up to `attempts` total tries. Once
/// attempts are exhausted, the final retriable error is reported as
/// [`EngineError::ServiceDegraded`] rather than its original kind, so
/// callers can distinguish "still trying" failures from "gave up".
/// Non-retriable errors propagate on the first attempt.
pub async fn with_retry<T, F, Fut>(attempts: u32, base_backoff: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retriable() => return Err(err),
            Err(err) if attempt + 1 >= attempts => {
                tracing::warn!(%err, attempts, "retries exhausted, surfacing as service degraded");
                return Err(EngineError::ServiceDegraded(err.to_string()));
            }
            Err(err) => {
                let delay = backoff_delay(base_backoff, attempt);
                tracing::warn!(%err, attempt, ?delay, "retrying after transient provider failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1u32 << attempt.min(16));
    let jitter_bound = (exp.as_millis() as u64 / 2).max(1);
    let jitter_ms = rand::rng().random_range(0..=jitter_bound);
    exp + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, EngineError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(EngineError::ProviderTimeout)
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_retries_surfaces_service_degraded() {
        let result: Result<()> = with_retry(2, Duration::from_millis(1), || async {
            Err(EngineError::ProviderUnavailable("down".into()))
        })
        .await;
        assert!(matches!(result, Err(EngineError::ServiceDegraded(_))));
    }

    #[tokio::test]
    async fn non_retriable_errors_propagate_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(5, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(EngineError::InvalidInput("bad".into())) }
        })
        .await;
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
