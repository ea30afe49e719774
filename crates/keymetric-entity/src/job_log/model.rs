//! Job run log entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::JobRunStatus;

/// A single scheduled-job execution record.
///
/// Created in `Running` state when the job runner starts, mutated in place
/// through retries, and finalized exactly once to `Completed` or `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRunLog {
    /// Unique log identifier.
    pub id: Uuid,
    /// Registered job name (e.g. `"ticket_poll"`).
    pub job_name: String,
    /// Current run status.
    pub status: JobRunStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration of the whole run in milliseconds.
    pub duration_ms: Option<i64>,
    /// Items the job body reported processing.
    pub items_processed: Option<i64>,
    /// Job-specific metadata (JSON).
    pub metadata: Option<serde_json::Value>,
    /// Number of retries performed.
    pub retry_count: i32,
    /// Last error message on failure.
    pub error_message: Option<String>,
}
