//! Ticket poller: advances every outstanding provider task by one step.
//!
//! Poll retries are bounded and persisted on the task row, so they survive
//! process restarts. This is distinct from the short in-memory wait some
//! jobs use via `wait_for_result`; the two mechanisms must not be mixed.

use std::sync::Arc;

use keymetric_core::result::AppResult;
use keymetric_entity::task::{ProviderTask, TaskStore};
use keymetric_gateway::queue::RequestPriority;
use keymetric_gateway::{FetchOutcome, ResultFetcher};

/// Synthetic error stored when a task exhausts its poll budget.
const TIMEOUT_MESSAGE: &str = "max poll attempts exceeded";

/// Scans pending and polling tasks and fetches their results at low
/// priority, one fetch per task per pass.
pub struct TicketPoller {
    tasks: Arc<dyn TaskStore>,
    fetcher: Arc<dyn ResultFetcher>,
}

impl std::fmt::Debug for TicketPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketPoller").finish()
    }
}

impl TicketPoller {
    /// Create a poller over the given task store and fetch seam.
    pub fn new(tasks: Arc<dyn TaskStore>, fetcher: Arc<dyn ResultFetcher>) -> Self {
        Self { tasks, fetcher }
    }

    /// Advance every outstanding task by one fetch.
    ///
    /// Per-task failures are logged and swallowed so one bad task never
    /// blocks the scan. Returns the number of tasks that reached a
    /// terminal state in this pass.
    pub async fn poll_outstanding(&self) -> AppResult<usize> {
        let tasks = self.tasks.find_pollable().await?;
        if tasks.is_empty() {
            return Ok(0);
        }
        tracing::debug!(outstanding = tasks.len(), "Polling provider tasks");

        let mut terminal = 0;
        for task in tasks {
            match self.advance(&task).await {
                Ok(true) => terminal += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        task_id = %task.id,
                        ticket_id = %task.ticket_id,
                        "Failed to advance task: {}",
                        e
                    );
                }
            }
        }
        Ok(terminal)
    }

    /// One poll step for one task; returns whether it reached a terminal
    /// state.
    async fn advance(&self, task: &ProviderTask) -> AppResult<bool> {
        let outcome = self
            .fetcher
            .fetch(&task.operation, &task.ticket_id, RequestPriority::Low)
            .await;

        match outcome {
            Ok(FetchOutcome::Done(data)) => {
                self.tasks.complete(task.id, &data).await?;
                tracing::info!(
                    task_id = %task.id,
                    ticket_id = %task.ticket_id,
                    operation = %task.operation,
                    "Task completed"
                );
                Ok(true)
            }
            Ok(FetchOutcome::Failed(message)) => {
                // Terminal: resubmission is the producer's call, not ours.
                self.tasks.fail(task.id, &message).await?;
                tracing::warn!(
                    task_id = %task.id,
                    ticket_id = %task.ticket_id,
                    "Task failed upstream: {}",
                    message
                );
                Ok(true)
            }
            Ok(FetchOutcome::Pending) => self.record_attempt(task).await,
            Err(e) => {
                tracing::warn!(
                    task_id = %task.id,
                    ticket_id = %task.ticket_id,
                    "Fetch attempt failed: {}",
                    e
                );
                self.record_attempt(task).await
            }
        }
    }

    /// Count a non-terminal poll attempt against the task's budget.
    async fn record_attempt(&self, task: &ProviderTask) -> AppResult<bool> {
        let retry_count = task.retry_count + 1;
        if retry_count > task.max_retries {
            self.tasks
                .timeout(task.id, retry_count, TIMEOUT_MESSAGE)
                .await?;
            tracing::warn!(
                task_id = %task.id,
                ticket_id = %task.ticket_id,
                attempts = retry_count,
                "Task timed out"
            );
            Ok(true)
        } else {
            self.tasks.mark_polling(task.id, retry_count).await?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryTaskStore, ScriptedFetcher};
    use keymetric_entity::task::{CreateProviderTask, TaskStatus};
    use keymetric_gateway::GatewayError;
    use serde_json::json;

    async fn seed_task(store: &MemoryTaskStore, ticket_id: &str, max_retries: i32) {
        store
            .create(&CreateProviderTask {
                ticket_id: ticket_id.to_string(),
                operation: "keyword-check".to_string(),
                params: json!({"keyword": "fitness"}),
                max_retries,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_always_pending_times_out_after_budget() {
        let store = Arc::new(MemoryTaskStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        seed_task(&store, "tk-1", 3).await;
        let poller = TicketPoller::new(Arc::clone(&store) as _, fetcher);

        // Passes 1..=3 consume the budget without finishing the task.
        for pass in 1..=3 {
            assert_eq!(poller.poll_outstanding().await.unwrap(), 0);
            let task = store.by_ticket("tk-1");
            assert_eq!(task.status, TaskStatus::Polling);
            assert_eq!(task.retry_count, pass);
        }

        // Pass 4 exceeds the budget and is terminal.
        assert_eq!(poller.poll_outstanding().await.unwrap(), 1);
        let task = store.by_ticket("tk-1");
        assert_eq!(task.status, TaskStatus::Timeout);
        assert_eq!(task.retry_count, 4);
        assert_eq!(
            task.error_message.as_deref(),
            Some("max poll attempts exceeded")
        );

        // A timed-out task is no longer scanned.
        assert_eq!(poller.poll_outstanding().await.unwrap(), 0);
        assert_eq!(store.by_ticket("tk-1").retry_count, 4);
    }

    #[tokio::test]
    async fn test_done_result_completes_task() {
        let store = Arc::new(MemoryTaskStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.script(
            "tk-1",
            vec![Ok(FetchOutcome::Done(json!({"rank": 3})))],
        );
        seed_task(&store, "tk-1", 30).await;
        let poller = TicketPoller::new(Arc::clone(&store) as _, fetcher);

        assert_eq!(poller.poll_outstanding().await.unwrap(), 1);
        let task = store.by_ticket("tk-1");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result, Some(json!({"rank": 3})));
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_provider_error_is_terminal_failure() {
        let store = Arc::new(MemoryTaskStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.script(
            "tk-1",
            vec![Ok(FetchOutcome::Failed("keyword not indexed".to_string()))],
        );
        seed_task(&store, "tk-1", 30).await;
        let poller = TicketPoller::new(Arc::clone(&store) as _, fetcher);

        assert_eq!(poller.poll_outstanding().await.unwrap(), 1);
        let task = store.by_ticket("tk-1");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error_message.as_deref(), Some("keyword not indexed"));
        assert_eq!(task.retry_count, 0);
    }

    #[tokio::test]
    async fn test_transport_failure_counts_as_poll_attempt() {
        let store = Arc::new(MemoryTaskStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.script(
            "tk-1",
            vec![Err(GatewayError::Transport("connection reset".to_string()))],
        );
        seed_task(&store, "tk-1", 30).await;
        let poller = TicketPoller::new(Arc::clone(&store) as _, fetcher);

        assert_eq!(poller.poll_outstanding().await.unwrap(), 0);
        let task = store.by_ticket("tk-1");
        assert_eq!(task.status, TaskStatus::Polling);
        assert_eq!(task.retry_count, 1);
    }

    #[tokio::test]
    async fn test_one_bad_task_does_not_block_the_scan() {
        let store = Arc::new(MemoryTaskStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.script(
            "tk-bad",
            vec![Err(GatewayError::CircuitOpen)],
        );
        fetcher.script(
            "tk-good",
            vec![Ok(FetchOutcome::Done(json!({"rank": 1})))],
        );
        seed_task(&store, "tk-bad", 30).await;
        seed_task(&store, "tk-good", 30).await;
        let poller = TicketPoller::new(Arc::clone(&store) as _, fetcher);

        assert_eq!(poller.poll_outstanding().await.unwrap(), 1);
        assert_eq!(store.by_ticket("tk-bad").status, TaskStatus::Polling);
        assert_eq!(store.by_ticket("tk-good").status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_pending_then_done_across_two_passes() {
        let store = Arc::new(MemoryTaskStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.script(
            "tk-1",
            vec![
                Ok(FetchOutcome::Pending),
                Ok(FetchOutcome::Done(json!({"suggestions": ["yoga"]}))),
            ],
        );
        seed_task(&store, "tk-1", 30).await;
        let poller = TicketPoller::new(Arc::clone(&store) as _, fetcher);

        assert_eq!(store.by_ticket("tk-1").status, TaskStatus::Pending);
        assert_eq!(poller.poll_outstanding().await.unwrap(), 0);
        assert_eq!(store.by_ticket("tk-1").status, TaskStatus::Polling);
        assert_eq!(poller.poll_outstanding().await.unwrap(), 1);
        assert_eq!(store.by_ticket("tk-1").status, TaskStatus::Completed);
    }
}
