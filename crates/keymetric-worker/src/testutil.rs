//! In-memory collaborators for worker tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use keymetric_core::error::AppError;
use keymetric_core::result::AppResult;
use keymetric_core::traits::notifier::Notifier;
use keymetric_entity::job_log::{JobLogStore, JobRunLog, JobRunStatus};
use keymetric_entity::task::{CreateProviderTask, ProviderTask, TaskStatus, TaskStore};
use keymetric_gateway::queue::RequestPriority;
use keymetric_gateway::{FetchOutcome, GatewayError, ResultFetcher};

/// Task store backed by a vector.
#[derive(Default)]
pub struct MemoryTaskStore {
    rows: Mutex<Vec<ProviderTask>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<ProviderTask> {
        self.rows.lock().unwrap().clone()
    }

    pub fn by_ticket(&self, ticket_id: &str) -> ProviderTask {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.ticket_id == ticket_id)
            .cloned()
            .expect("task exists")
    }

    fn update<F: FnOnce(&mut ProviderTask)>(&self, id: Uuid, f: F) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let task = rows
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::not_found(format!("Task not found: {id}")))?;
        f(task);
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, data: &CreateProviderTask) -> AppResult<ProviderTask> {
        let task = ProviderTask {
            id: Uuid::new_v4(),
            ticket_id: data.ticket_id.clone(),
            operation: data.operation.clone(),
            params: data.params.clone(),
            status: TaskStatus::Pending,
            retry_count: 0,
            max_retries: data.max_retries,
            result: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.rows.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn find_pollable(&self) -> AppResult<Vec<ProviderTask>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn mark_polling(&self, id: Uuid, retry_count: i32) -> AppResult<()> {
        self.update(id, |t| {
            t.status = TaskStatus::Polling;
            t.retry_count = retry_count;
        })
    }

    async fn complete(&self, id: Uuid, result: &serde_json::Value) -> AppResult<()> {
        let result = result.clone();
        self.update(id, move |t| {
            t.status = TaskStatus::Completed;
            t.result = Some(result);
            t.completed_at = Some(Utc::now());
        })
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()> {
        let message = error_message.to_string();
        self.update(id, move |t| {
            t.status = TaskStatus::Failed;
            t.error_message = Some(message);
            t.completed_at = Some(Utc::now());
        })
    }

    async fn timeout(&self, id: Uuid, retry_count: i32, error_message: &str) -> AppResult<()> {
        let message = error_message.to_string();
        self.update(id, move |t| {
            t.status = TaskStatus::Timeout;
            t.retry_count = retry_count;
            t.error_message = Some(message);
            t.completed_at = Some(Utc::now());
        })
    }
}

/// Job log store backed by a vector, recording every status transition.
#[derive(Default)]
pub struct MemoryJobLogStore {
    rows: Mutex<Vec<JobRunLog>>,
    transitions: Mutex<Vec<JobRunStatus>>,
}

impl MemoryJobLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The only row, for tests that run a single job.
    pub fn single_row(&self) -> JobRunLog {
        let rows = self.rows.lock().unwrap();
        assert_eq!(rows.len(), 1, "expected exactly one job run log row");
        rows[0].clone()
    }

    /// Every status ever written, in order, including the initial `Running`.
    pub fn transitions(&self) -> Vec<JobRunStatus> {
        self.transitions.lock().unwrap().clone()
    }

    fn update<F: FnOnce(&mut JobRunLog)>(&self, id: Uuid, status: JobRunStatus, f: F) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::not_found(format!("Job run log not found: {id}")))?;
        row.status = status;
        f(row);
        self.transitions.lock().unwrap().push(status);
        Ok(())
    }
}

#[async_trait]
impl JobLogStore for MemoryJobLogStore {
    async fn create(&self, job_name: &str) -> AppResult<JobRunLog> {
        let row = JobRunLog {
            id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            status: JobRunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            items_processed: None,
            metadata: None,
            retry_count: 0,
            error_message: None,
        };
        self.rows.lock().unwrap().push(row.clone());
        self.transitions.lock().unwrap().push(JobRunStatus::Running);
        Ok(row)
    }

    async fn mark_retrying(&self, id: Uuid, retry_count: i32, error: &str) -> AppResult<()> {
        let error = error.to_string();
        self.update(id, JobRunStatus::Retrying, move |r| {
            r.retry_count = retry_count;
            r.error_message = Some(error);
        })
    }

    async fn complete(
        &self,
        id: Uuid,
        duration_ms: i64,
        items_processed: Option<i64>,
        metadata: Option<&serde_json::Value>,
    ) -> AppResult<()> {
        let metadata = metadata.cloned();
        self.update(id, JobRunStatus::Completed, move |r| {
            r.duration_ms = Some(duration_ms);
            r.items_processed = items_processed;
            r.metadata = metadata;
            r.completed_at = Some(Utc::now());
        })
    }

    async fn fail(&self, id: Uuid, duration_ms: i64, retry_count: i32, error: &str) -> AppResult<()> {
        let error = error.to_string();
        self.update(id, JobRunStatus::Failed, move |r| {
            r.duration_ms = Some(duration_ms);
            r.retry_count = retry_count;
            r.error_message = Some(error);
            r.completed_at = Some(Utc::now());
        })
    }
}

/// A delivered notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub recipients: Vec<Uuid>,
    pub title: String,
    pub body: String,
    pub related_entity: Option<Uuid>,
}

/// Notifier that records deliveries instead of sending them.
pub struct RecordingNotifier {
    operators: Vec<Uuid>,
    sent: Mutex<Vec<SentNotification>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new(operators: Vec<Uuid>) -> Self {
        Self {
            operators,
            sent: Mutex::new(Vec::new()),
            failing: false,
        }
    }

    /// A notifier whose delivery always errors.
    pub fn failing() -> Self {
        Self {
            operators: vec![Uuid::new_v4()],
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn operator_recipients(&self) -> AppResult<Vec<Uuid>> {
        Ok(self.operators.clone())
    }

    async fn notify(
        &self,
        recipients: &[Uuid],
        title: &str,
        body: &str,
        related_entity: Option<Uuid>,
    ) -> AppResult<()> {
        if self.failing {
            return Err(AppError::internal("notification channel down"));
        }
        self.sent.lock().unwrap().push(SentNotification {
            recipients: recipients.to_vec(),
            title: title.to_string(),
            body: body.to_string(),
            related_entity,
        });
        Ok(())
    }
}

/// Fetcher that plays back a per-ticket script; tickets without a script
/// entry left always report pending.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Result<FetchOutcome, GatewayError>>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, ticket_id: &str, outcomes: Vec<Result<FetchOutcome, GatewayError>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(ticket_id.to_string(), outcomes.into());
    }
}

#[async_trait]
impl ResultFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        _operation: &str,
        ticket_id: &str,
        _priority: RequestPriority,
    ) -> Result<FetchOutcome, GatewayError> {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(ticket_id)
            .and_then(|q| q.pop_front())
            .unwrap_or(Ok(FetchOutcome::Pending))
    }
}
