//! Polling until a stack condition holds.
//!
//! [`wait_for_resource`] is the only place that sleeps between status checks.
//! Delays grow exponentially (with jitter) from `initial_delay` up to
//! `max_delay`. The whole wait is capped by `timeout`; a cancelled token
//! interrupts a pending sleep at once.

use backon::{BackoffBuilder, ExponentialBuilder};
use cfn_nuke_common::defaults::{
    DEFAULT_POLL_INITIAL_DELAY_MS, DEFAULT_POLL_MAX_DELAY_SECS, DEFAULT_WAIT_TIMEOUT_SECS,
};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Backoff and deadline for one wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Deadline for the whole wait, measured from the first check
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_POLL_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_POLL_MAX_DELAY_SECS),
            timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }
}

/// Why a wait ended without the condition holding
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("gave up waiting for {resource} after {timeout:?} ({checks} checks)")]
    Timeout {
        resource: String,
        timeout: Duration,
        checks: u32,
    },

    #[error("wait for {resource} cancelled")]
    Cancelled { resource: String },

    /// The check failed, or the stack entered a state it cannot leave
    #[error("wait for {resource} failed")]
    Check {
        resource: String,
        #[source]
        source: anyhow::Error,
    },
}

impl WaitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled { .. })
    }
}

/// Run `check` until it returns `Ok(true)`.
///
/// `Ok(false)` schedules another check after the next backoff delay, never
/// sleeping past the deadline. An `Err` from `check` ends the wait with
/// [`WaitError::Check`]. `resource` names the wait in logs and errors.
pub async fn wait_for_resource<F, Fut>(
    config: &WaitConfig,
    cancel: &CancellationToken,
    check: F,
    resource: &str,
) -> Result<(), WaitError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    let deadline = deadline_after(config.timeout);
    let mut checks = 0u32;
    let mut backoff = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .without_max_times()
        .build();

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled {
                resource: resource.to_string(),
            });
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                resource: resource.to_string(),
                timeout: config.timeout,
                checks,
            });
        }

        checks += 1;
        let ready = check().await.map_err(|source| WaitError::Check {
            resource: resource.to_string(),
            source,
        })?;
        if ready {
            debug!(resource = %resource, checks, "Wait finished");
            return Ok(());
        }

        let delay = backoff
            .next()
            .unwrap_or(config.max_delay)
            .min(deadline.saturating_duration_since(Instant::now()));
        debug!(resource = %resource, checks, delay_ms = delay.as_millis(), "Still waiting");

        if !sleep_cancellable(delay, cancel).await {
            return Err(WaitError::Cancelled {
                resource: resource.to_string(),
            });
        }
    }
}

/// `now + timeout`, saturating to a far-future instant instead of overflowing
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS))
}

/// Roughly thirty years
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

/// Sleep for `delay` unless `cancel` fires first.
///
/// Returns `false` when cancelled.
pub async fn sleep_cancellable(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = cancel.cancelled() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn quick() -> WaitConfig {
        WaitConfig {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(20),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_once_condition_holds() {
        let statuses = Mutex::new(vec!["UPDATE_COMPLETE", "UPDATE_IN_PROGRESS", "UPDATE_IN_PROGRESS"]);
        let token = CancellationToken::new();

        wait_for_resource(
            &quick(),
            &token,
            || {
                let status = statuses.lock().unwrap().pop();
                async move { Ok(status == Some("UPDATE_COMPLETE")) }
            },
            "stack web",
        )
        .await
        .unwrap();

        assert!(statuses.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_enforced() {
        let token = CancellationToken::new();
        let start = Instant::now();
        let err = wait_for_resource(&quick(), &token, || async { Ok(false) }, "stack web")
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "unexpected error: {err}");
        // Delays are clipped to the deadline, so the wait ends right at it
        assert!(start.elapsed() >= Duration::from_secs(20));
        assert!(start.elapsed() < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_does_not_overflow() {
        let token = CancellationToken::new();
        let config = WaitConfig {
            timeout: Duration::MAX,
            ..quick()
        };
        let remaining = Mutex::new(2);

        wait_for_resource(
            &config,
            &token,
            || {
                let mut left = remaining.lock().unwrap();
                *left -= 1;
                let done = *left == 0;
                async move { Ok(done) }
            },
            "stack web",
        )
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_check_ends_wait() {
        let token = CancellationToken::new();
        let err = wait_for_resource(
            &quick(),
            &token,
            || async { Err(anyhow::anyhow!("stack web entered DELETE_FAILED")) },
            "stack web",
        )
        .await
        .unwrap_err();
        let WaitError::Check { source, .. } = err else {
            panic!("expected Check error");
        };
        assert!(source.to_string().contains("DELETE_FAILED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_wakes_sleeping_wait() {
        let token = CancellationToken::new();
        let config = WaitConfig {
            initial_delay: Duration::from_secs(120),
            max_delay: Duration::from_secs(120),
            timeout: Duration::from_secs(1800),
        };
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = wait_for_resource(&config, &token, || async { Ok(false) }, "stack web")
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_cancellable() {
        let token = CancellationToken::new();
        assert!(sleep_cancellable(Duration::from_millis(10), &token).await);
        token.cancel();
        assert!(!sleep_cancellable(Duration::from_secs(10), &token).await);
    }
}
