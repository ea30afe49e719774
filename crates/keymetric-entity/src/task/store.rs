//! Persistence trait for provider tasks.

use async_trait::async_trait;
use uuid::Uuid;

use keymetric_core::result::AppResult;

use super::model::{CreateProviderTask, ProviderTask};

/// Create/read/update operations on [`ProviderTask`] records.
///
/// Implemented by the Postgres repository; test code substitutes an
/// in-memory implementation.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task in `Pending` state.
    async fn create(&self, data: &CreateProviderTask) -> AppResult<ProviderTask>;

    /// All tasks in `Pending` or `Polling` state, oldest first.
    async fn find_pollable(&self) -> AppResult<Vec<ProviderTask>>;

    /// Record an unsuccessful poll attempt: bump `retry_count` and move the
    /// task to `Polling`.
    async fn mark_polling(&self, id: Uuid, retry_count: i32) -> AppResult<()>;

    /// Mark the task completed with its result payload.
    async fn complete(&self, id: Uuid, result: &serde_json::Value) -> AppResult<()>;

    /// Mark the task failed with a provider-reported error (terminal).
    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()>;

    /// Mark the task timed out after exhausting poll attempts (terminal).
    async fn timeout(&self, id: Uuid, retry_count: i32, error_message: &str) -> AppResult<()>;
}
