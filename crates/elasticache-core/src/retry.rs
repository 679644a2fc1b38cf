//! Bounded retry for remote calls blocked by a transient condition

use crate::config::RetrySettings;
use crate::error::ApiError;
use crate::progress::deadline_after;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Floor for the wait between attempts, whatever the settings say
const MIN_BACKOFF: Duration = Duration::from_millis(100);

/// Retry `op` while `should_retry` holds, for at most `ceiling`
///
/// Backoff starts at `settings.initial_backoff()` and doubles up to
/// `settings.max_backoff()`. When the ceiling passes, one final attempt is
/// made and its error is returned as-is. Errors rejected by `should_retry`
/// are returned immediately.
pub async fn retry_when<T, F, Fut, P>(
    ceiling: Duration,
    settings: &RetrySettings,
    should_retry: P,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
    P: Fn(&ApiError) -> bool,
{
    let deadline = deadline_after(Instant::now(), ceiling);
    let mut backoff = settings.initial_backoff().max(MIN_BACKOFF);
    let mut attempt = 1u32;

    loop {
        let expired = Instant::now() >= deadline;

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !expired && should_retry(&e) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let wait = backoff.min(remaining);
                debug!(attempt, error = %e, backoff_ms = wait.as_millis() as u64, "retrying blocked request");
                tokio::time::sleep(wait).await;
                backoff = backoff
                    .saturating_mul(2)
                    .min(settings.max_backoff())
                    .max(MIN_BACKOFF);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Retry while the error is a transient invalid-state error
pub async fn retry_on_invalid_state<T, F, Fut>(
    ceiling: Duration,
    settings: &RetrySettings,
    op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    retry_when(
        ceiling,
        settings,
        |e| e.is_invalid_state() && e.is_retryable(),
        op,
    )
    .await
}
