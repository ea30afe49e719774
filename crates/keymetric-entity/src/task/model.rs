//! Provider task entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::TaskStatus;

/// A persisted asynchronous provider request, keyed by its upstream ticket.
///
/// Created when a caller submits a request to the provider and receives a
/// ticket; mutated only by the ticket poller (status, retry_count, result)
/// and never deleted here — retention is an external concern.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProviderTask {
    /// Unique task identifier.
    pub id: Uuid,
    /// Opaque ticket returned by the provider at submit time.
    pub ticket_id: String,
    /// Logical operation name (e.g. `"keyword-check"`).
    pub operation: String,
    /// Parameters the request was submitted with (JSON).
    pub params: serde_json::Value,
    /// Current task status.
    pub status: TaskStatus,
    /// Number of poll attempts made so far.
    pub retry_count: i32,
    /// Maximum poll attempts before the task times out.
    pub max_retries: i32,
    /// Result payload on completion (JSON).
    pub result: Option<serde_json::Value>,
    /// Error message on failure or timeout.
    pub error_message: Option<String>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Data required to persist a new provider task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProviderTask {
    /// Ticket returned by the provider.
    pub ticket_id: String,
    /// Logical operation name.
    pub operation: String,
    /// Submitted parameters.
    pub params: serde_json::Value,
    /// Maximum poll attempts.
    pub max_retries: i32,
}
