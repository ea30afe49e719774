//! Operator notification persistence.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use keymetric_core::error::{AppError, ErrorKind};
use keymetric_core::result::AppResult;
use keymetric_core::traits::notifier::Notifier;

/// Postgres-backed operator notifier.
///
/// Resolves recipients from the `operators` table and writes one
/// `notifications` row per recipient.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for NotificationRepository {
    async fn operator_recipients(&self) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM operators WHERE active = TRUE")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list operators", e))
    }

    async fn notify(
        &self,
        recipients: &[Uuid],
        title: &str,
        body: &str,
        related_entity: Option<Uuid>,
    ) -> AppResult<()> {
        for recipient in recipients {
            sqlx::query(
                "INSERT INTO notifications (recipient_id, title, body, related_entity) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(recipient)
            .bind(title)
            .bind(body)
            .bind(related_entity)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to insert notification", e)
            })?;
        }

        tracing::debug!(
            recipients = recipients.len(),
            title,
            "Persisted operator notifications"
        );
        Ok(())
    }
}
