//! Operator notification trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;

/// Delivers operator-facing notifications.
///
/// Implementations are best-effort: callers treat delivery as
/// fire-and-forget and must not block or retry on failure.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Resolve the accounts that should receive operational alerts.
    async fn operator_recipients(&self) -> AppResult<Vec<Uuid>>;

    /// Deliver a notification to each recipient, optionally referencing a
    /// related entity (e.g. a job run log id).
    async fn notify(
        &self,
        recipients: &[Uuid],
        title: &str,
        body: &str,
        related_entity: Option<Uuid>,
    ) -> AppResult<()>;
}
