//! Provider task repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use keymetric_core::error::{AppError, ErrorKind};
use keymetric_core::result::AppResult;
use keymetric_entity::task::model::{CreateProviderTask, ProviderTask};
use keymetric_entity::task::store::TaskStore;

/// Repository for provider task CRUD and poller scan queries.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    /// Create a new task repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for TaskRepository {
    async fn create(&self, data: &CreateProviderTask) -> AppResult<ProviderTask> {
        sqlx::query_as::<_, ProviderTask>(
            "INSERT INTO provider_tasks (ticket_id, operation, params, max_retries) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&data.ticket_id)
        .bind(&data.operation)
        .bind(&data.params)
        .bind(data.max_retries)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create task", e))
    }

    async fn find_pollable(&self) -> AppResult<Vec<ProviderTask>> {
        sqlx::query_as::<_, ProviderTask>(
            "SELECT * FROM provider_tasks WHERE status IN ('pending', 'polling') \
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list pollable tasks", e)
        })
    }

    async fn mark_polling(&self, id: Uuid, retry_count: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE provider_tasks SET status = 'polling', retry_count = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark task as polling", e)
        })?;
        Ok(())
    }

    async fn complete(&self, id: Uuid, result: &serde_json::Value) -> AppResult<()> {
        sqlx::query(
            "UPDATE provider_tasks SET status = 'completed', result = $2, completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete task", e))?;
        Ok(())
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE provider_tasks SET status = 'failed', error_message = $2, \
             completed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark task as failed", e)
        })?;
        Ok(())
    }

    async fn timeout(&self, id: Uuid, retry_count: i32, error_message: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE provider_tasks SET status = 'timeout', retry_count = $2, \
             error_message = $3, completed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(retry_count)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark task as timed out", e)
        })?;
        Ok(())
    }
}
