//! Cron scheduler for periodic jobs.
//!
//! Schedule expressions come from configuration; this module never owns
//! or interprets them beyond handing them to the cron library.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use keymetric_core::error::AppError;
use keymetric_core::result::AppResult;

use crate::runner::{JobOutcome, JobRunner};

/// A named job body registered with the scheduler.
///
/// Implementations must be safe to re-run; the runner retries them
/// without knowing what partial work a failed attempt committed.
#[async_trait::async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Registered job name, recorded on the job run log.
    fn name(&self) -> &str;

    /// Execute one run of the job.
    async fn run(&self) -> AppResult<JobOutcome>;
}

/// Cron-based scheduler that routes every trigger through the
/// [`JobRunner`] so each run gets a log row and the retry schedule.
pub struct CronScheduler {
    scheduler: JobScheduler,
    runner: Arc<JobRunner>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new scheduler over the shared job runner.
    pub async fn new(runner: Arc<JobRunner>) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;
        Ok(Self { scheduler, runner })
    }

    /// Register a job on a cron schedule.
    pub async fn register(&self, schedule: &str, job: Arc<dyn ScheduledJob>) -> AppResult<()> {
        let name = job.name().to_string();
        let runner = Arc::clone(&self.runner);

        let cron_job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let runner = Arc::clone(&runner);
            let job = Arc::clone(&job);
            Box::pin(async move {
                let name = job.name().to_string();
                let body = {
                    let job = Arc::clone(&job);
                    move || {
                        let job = Arc::clone(&job);
                        async move { job.run().await }
                    }
                };
                // The runner already notified operators; nothing left to
                // escalate to here.
                if let Err(e) = runner.run(&name, body).await {
                    tracing::error!(job = %name, "Scheduled run exhausted retries: {}", e);
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create schedule for '{}': {}", name, e))
        })?;

        self.scheduler.add(cron_job).await.map_err(|e| {
            AppError::internal(format!("Failed to add schedule for '{}': {}", name, e))
        })?;

        tracing::info!(job = %name, schedule, "Registered scheduled job");
        Ok(())
    }

    /// Start firing registered schedules.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;
        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
