//! Persistence trait for job run logs.

use async_trait::async_trait;
use uuid::Uuid;

use keymetric_core::result::AppResult;

use super::model::JobRunLog;

/// Create/update operations on [`JobRunLog`] records.
///
/// A single row is mutated in place across retries; it is never duplicated.
#[async_trait]
pub trait JobLogStore: Send + Sync {
    /// Create a new log row in `Running` state.
    async fn create(&self, job_name: &str) -> AppResult<JobRunLog>;

    /// Record a failed attempt with a retry still to come.
    async fn mark_retrying(&self, id: Uuid, retry_count: i32, error: &str) -> AppResult<()>;

    /// Finalize the run as completed.
    async fn complete(
        &self,
        id: Uuid,
        duration_ms: i64,
        items_processed: Option<i64>,
        metadata: Option<&serde_json::Value>,
    ) -> AppResult<()>;

    /// Finalize the run as failed after all attempts.
    async fn fail(
        &self,
        id: Uuid,
        duration_ms: i64,
        retry_count: i32,
        error: &str,
    ) -> AppResult<()>;
}
