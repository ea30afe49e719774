//! Job runner: retry/backoff wrapper around every scheduled job body.
//!
//! Each invocation owns exactly one [`JobRunLog`] row, created in
//! `Running` state and mutated in place through retries until it is
//! finalized once as `Completed` or `Failed`. The runner knows nothing
//! about what a body does; bodies must be safe to re-run since a failed
//! attempt may already have committed partial work.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use keymetric_core::error::AppError;
use keymetric_core::result::AppResult;
use keymetric_core::traits::notifier::Notifier;
use keymetric_entity::job_log::JobLogStore;

/// What a job body reports back on success.
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    /// Number of items the body processed, if it counts anything.
    pub items_processed: Option<i64>,
    /// Job-specific metadata recorded on the log row.
    pub metadata: Option<serde_json::Value>,
}

/// Delays slept before retry 1, 2 and 3. Four attempts total.
const BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(5),
    Duration::from_secs(15),
];

/// Executes job bodies under a fixed retry schedule with persisted state.
///
/// The schedule is applied uniformly to every error class, including ones
/// that cannot succeed on retry (see `DESIGN.md`).
pub struct JobRunner {
    logs: Arc<dyn JobLogStore>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner").finish()
    }
}

impl JobRunner {
    /// Create a runner over the given log store and notifier.
    pub fn new(logs: Arc<dyn JobLogStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { logs, notifier }
    }

    /// Run `body` under the retry schedule, recording the whole run in a
    /// single job run log row.
    ///
    /// Returns the body's error (wrapped) only after every attempt failed;
    /// by then operators have been notified and the log row is `Failed`.
    pub async fn run<F, Fut>(&self, job_name: &str, body: F) -> AppResult<()>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<JobOutcome>>,
    {
        let log = self.logs.create(job_name).await?;
        let started = time::Instant::now();
        let max_attempts = BACKOFF.len() as u32 + 1;

        tracing::info!(job = job_name, log_id = %log.id, "Job started");

        for attempt in 1..=max_attempts {
            match body().await {
                Ok(outcome) => {
                    let duration_ms = started.elapsed().as_millis() as i64;
                    self.logs
                        .complete(
                            log.id,
                            duration_ms,
                            outcome.items_processed,
                            outcome.metadata.as_ref(),
                        )
                        .await?;
                    tracing::info!(
                        job = job_name,
                        log_id = %log.id,
                        duration_ms,
                        items_processed = outcome.items_processed,
                        "Job completed"
                    );
                    return Ok(());
                }
                Err(e) if attempt < max_attempts => {
                    let delay = BACKOFF[(attempt - 1) as usize];
                    tracing::warn!(
                        job = job_name,
                        log_id = %log.id,
                        attempt,
                        retry_in_seconds = delay.as_secs(),
                        "Job attempt failed: {}",
                        e
                    );
                    self.logs
                        .mark_retrying(log.id, attempt as i32, &e.to_string())
                        .await?;
                    time::sleep(delay).await;
                }
                Err(e) => {
                    let duration_ms = started.elapsed().as_millis() as i64;
                    let retry_count = BACKOFF.len() as i32;
                    self.logs
                        .fail(log.id, duration_ms, retry_count, &e.to_string())
                        .await?;
                    tracing::error!(
                        job = job_name,
                        log_id = %log.id,
                        attempts = max_attempts,
                        "Job failed after all attempts: {}",
                        e
                    );
                    self.notify_exhausted(job_name, &e, log.id).await;
                    return Err(AppError::job_exhausted(format!(
                        "Job '{}' failed after {} attempts: {}",
                        job_name, max_attempts, e
                    )));
                }
            }
        }
        unreachable!("retry loop always returns")
    }

    /// Best-effort operator alert; delivery failures are logged, never
    /// propagated.
    async fn notify_exhausted(&self, job_name: &str, error: &AppError, log_id: uuid::Uuid) {
        let recipients = match self.notifier.operator_recipients().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(job = job_name, "Failed to resolve operators: {}", e);
                return;
            }
        };
        if recipients.is_empty() {
            tracing::warn!(job = job_name, "No operators to notify about job failure");
            return;
        }
        let title = format!("Scheduled job '{}' failed", job_name);
        let body = format!(
            "Job '{}' exhausted all retry attempts. Last error: {}",
            job_name, error
        );
        if let Err(e) = self
            .notifier
            .notify(&recipients, &title, &body, Some(log_id))
            .await
        {
            tracing::warn!(job = job_name, "Failed to deliver job failure alert: {}", e);
        }
    }
}
