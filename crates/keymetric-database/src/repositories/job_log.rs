//! Job run log repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use keymetric_core::error::{AppError, ErrorKind};
use keymetric_core::result::AppResult;
use keymetric_entity::job_log::model::JobRunLog;
use keymetric_entity::job_log::store::JobLogStore;

/// Repository for scheduled-job execution records.
#[derive(Debug, Clone)]
pub struct JobLogRepository {
    pool: PgPool,
}

impl JobLogRepository {
    /// Create a new job log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobLogStore for JobLogRepository {
    async fn create(&self, job_name: &str) -> AppResult<JobRunLog> {
        sqlx::query_as::<_, JobRunLog>(
            "INSERT INTO job_run_logs (job_name) VALUES ($1) RETURNING *",
        )
        .bind(job_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create job log", e))
    }

    async fn mark_retrying(&self, id: Uuid, retry_count: i32, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE job_run_logs SET status = 'retrying', retry_count = $2, \
             error_message = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark job log as retrying", e)
        })?;
        Ok(())
    }

    async fn complete(
        &self,
        id: Uuid,
        duration_ms: i64,
        items_processed: Option<i64>,
        metadata: Option<&serde_json::Value>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE job_run_logs SET status = 'completed', completed_at = NOW(), \
             duration_ms = $2, items_processed = $3, metadata = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(duration_ms)
        .bind(items_processed)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete job log", e))?;
        Ok(())
    }

    async fn fail(
        &self,
        id: Uuid,
        duration_ms: i64,
        retry_count: i32,
        error: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE job_run_logs SET status = 'failed', completed_at = NOW(), \
             duration_ms = $2, retry_count = $3, error_message = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(duration_ms)
        .bind(retry_count)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark job log as failed", e)
        })?;
        Ok(())
    }
}
