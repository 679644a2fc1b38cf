//! Progress tracking and status polling for asynchronous remote operations
//!
//! Create, modify and delete calls return before the remote resource settles.
//! [`wait_for_status`] polls a refresh function until the resource reaches a
//! target status, with optional progress callbacks for UI updates.
//!
//! Abandoning a wait (dropping the future) is always safe: polling has no
//! remote side effects.

use crate::error::{ApiError, WaitError};
use crate::status::Status;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// `timeout` after `start`, saturating far in the future instead of overflowing
pub(crate) fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + Duration::from_secs(86_400 * 365 * 30))
}

/// Progress events emitted during a wait
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The wait has started
    Started { resource_id: String },
    /// Polling iteration with current status
    Polling {
        resource_id: String,
        status: String,
        elapsed: Duration,
    },
    /// A target status was reached, or the resource is gone for a delete wait
    Completed { resource_id: String },
    /// The wait failed
    Failed { resource_id: String, error: String },
}

/// Callback type for progress updates
///
/// A presentation layer can use this to update spinners or progress bars.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Parameters for a single poll-until-status cycle
///
/// An empty `target` means the wait succeeds once the resource is gone.
#[derive(Debug, Clone)]
pub struct WaitSpec<S> {
    pub pending: Vec<S>,
    pub target: Vec<S>,
    pub timeout: Duration,
    /// Fixed interval between checks
    pub min_interval: Duration,
    /// Sleep before the first check
    pub delay: Duration,
    /// Consecutive not-found results tolerated when `target` is non-empty
    pub not_found_checks: u32,
}

impl<S: Status> WaitSpec<S> {
    pub fn new(pending: Vec<S>, target: Vec<S>, timeout: Duration) -> Self {
        Self {
            pending,
            target,
            timeout,
            min_interval: Duration::from_secs(10),
            delay: Duration::ZERO,
            not_found_checks: 20,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    #[must_use]
    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    fn target_label(&self) -> String {
        if self.target.is_empty() {
            return "absent".to_string();
        }
        self.target
            .iter()
            .map(|s| s.as_str().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Poll `refresh` until the resource reaches a status in `spec.target`
///
/// `refresh` returns the fresh snapshot with its classified status, or
/// `Ok(None)` when the resource does not exist.
///
/// - a status in `target` returns the snapshot
/// - a status in `pending` keeps polling
/// - any other status fails immediately with [`WaitError::UnexpectedState`]
/// - not-found with an empty `target` returns `Ok(None)`
/// - throttling and request timeouts from `refresh` keep polling; other
///   refresh errors fail immediately
///
/// Once the deadline passes, exactly one more check is made before
/// [`WaitError::Timeout`] is returned, so a zero timeout still checks once.
///
/// # Example
///
/// ```rust,ignore
/// let spec = WaitSpec::new(
///     vec![ReplicationGroupStatus::Creating, ReplicationGroupStatus::Modifying],
///     vec![ReplicationGroupStatus::Available],
///     Duration::from_secs(3600),
/// )
/// .with_delay(Duration::from_secs(30));
///
/// let group = wait_for_status("my-group", &spec, None, || async {
///     match client.describe_replication_group("my-group").await {
///         Ok(rg) => { let status = rg.classify(); Ok(Some((rg, status))) }
///         Err(e) if e.is_not_found() => Ok(None),
///         Err(e) => Err(e),
///     }
/// })
/// .await?;
/// ```
pub async fn wait_for_status<T, S, F, Fut>(
    resource_id: &str,
    spec: &WaitSpec<S>,
    on_progress: Option<&ProgressCallback>,
    mut refresh: F,
) -> Result<Option<T>, WaitError>
where
    S: Status,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<(T, S)>, ApiError>>,
{
    let start = Instant::now();
    let deadline = deadline_after(start, spec.timeout);

    emit(
        on_progress,
        ProgressEvent::Started {
            resource_id: resource_id.to_string(),
        },
    );

    if !spec.delay.is_zero() {
        tokio::time::sleep(spec.delay).await;
    }

    let mut last_status = String::new();
    let mut not_found = 0u32;

    loop {
        let expired = Instant::now() >= deadline;

        match refresh().await {
            Ok(Some((snapshot, status))) => {
                not_found = 0;
                last_status = status.to_string();

                emit(
                    on_progress,
                    ProgressEvent::Polling {
                        resource_id: resource_id.to_string(),
                        status: last_status.clone(),
                        elapsed: start.elapsed(),
                    },
                );

                if spec.target.contains(&status) {
                    debug!(id = %resource_id, status = %status, "reached target status");
                    emit(
                        on_progress,
                        ProgressEvent::Completed {
                            resource_id: resource_id.to_string(),
                        },
                    );
                    return Ok(Some(snapshot));
                }

                if !spec.pending.contains(&status) {
                    let error = WaitError::UnexpectedState {
                        status: last_status,
                        target: spec.target_label(),
                    };
                    return Err(fail(on_progress, resource_id, error));
                }
            }
            Ok(None) => {
                if spec.target.is_empty() {
                    debug!(id = %resource_id, "resource no longer exists");
                    emit(
                        on_progress,
                        ProgressEvent::Completed {
                            resource_id: resource_id.to_string(),
                        },
                    );
                    return Ok(None);
                }

                not_found += 1;
                if not_found > spec.not_found_checks {
                    let error = WaitError::NotFound { checks: not_found };
                    return Err(fail(on_progress, resource_id, error));
                }
            }
            Err(e) if e.is_retryable() && !e.is_invalid_state() => {
                debug!(id = %resource_id, error = %e, "status refresh failed, will retry");
            }
            Err(e) => {
                return Err(fail(on_progress, resource_id, WaitError::Refresh(e)));
            }
        }

        if expired {
            let error = WaitError::Timeout {
                target: spec.target_label(),
                last_status,
                timeout: spec.timeout,
            };
            return Err(fail(on_progress, resource_id, error));
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(spec.min_interval.min(remaining)).await;
    }
}

fn fail(on_progress: Option<&ProgressCallback>, resource_id: &str, error: WaitError) -> WaitError {
    emit(
        on_progress,
        ProgressEvent::Failed {
            resource_id: resource_id.to_string(),
            error: error.to_string(),
        },
    );
    error
}

/// Helper to emit progress events
fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
