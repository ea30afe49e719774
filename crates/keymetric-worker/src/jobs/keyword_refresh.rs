//! Keyword refresh job: submits a rank check for every watchlist keyword.
//!
//! Results are not awaited here; each submission is persisted as a
//! provider task and the ticket poller completes it in the background.

use std::sync::Arc;

use serde_json::json;

use keymetric_core::config::worker::WatchlistConfig;
use keymetric_core::error::AppError;
use keymetric_core::result::AppResult;
use keymetric_entity::task::{CreateProviderTask, TaskStore};
use keymetric_gateway::queue::RequestPriority;
use keymetric_gateway::GatewayClient;

use crate::runner::JobOutcome;
use crate::scheduler::ScheduledJob;

const OPERATION: &str = "keyword-check";

/// Submits one `keyword-check` request per watchlist keyword and hands
/// the tickets off to the poller.
pub struct KeywordRefreshJob {
    client: Arc<GatewayClient>,
    tasks: Arc<dyn TaskStore>,
    watchlist: WatchlistConfig,
    max_poll_retries: i32,
}

impl KeywordRefreshJob {
    pub fn new(
        client: Arc<GatewayClient>,
        tasks: Arc<dyn TaskStore>,
        watchlist: WatchlistConfig,
        max_poll_retries: i32,
    ) -> Self {
        Self {
            client,
            tasks,
            watchlist,
            max_poll_retries,
        }
    }

    async fn submit_one(&self, keyword: &str) -> AppResult<()> {
        let params = json!({
            "keyword": keyword,
            "country": self.watchlist.country,
        });
        let ticket = self
            .client
            .submit(OPERATION, params.clone(), RequestPriority::Normal)
            .await?;
        self.tasks
            .create(&CreateProviderTask {
                ticket_id: ticket.ticket_id,
                operation: OPERATION.to_string(),
                params,
                max_retries: self.max_poll_retries,
            })
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ScheduledJob for KeywordRefreshJob {
    fn name(&self) -> &str {
        "keyword_refresh"
    }

    async fn run(&self) -> AppResult<JobOutcome> {
        let mut submitted: i64 = 0;
        let mut failed: Vec<String> = Vec::new();

        for keyword in &self.watchlist.keywords {
            match self.submit_one(keyword).await {
                Ok(()) => submitted += 1,
                Err(e) => {
                    tracing::warn!(keyword = %keyword, "Failed to submit keyword check: {}", e);
                    failed.push(keyword.clone());
                }
            }
        }

        // All submissions failing means the provider path is down; let the
        // runner's retry schedule take over.
        if submitted == 0 && !failed.is_empty() {
            return Err(AppError::upstream(format!(
                "All {} keyword submissions failed",
                failed.len()
            )));
        }

        Ok(JobOutcome {
            items_processed: Some(submitted),
            metadata: Some(json!({
                "country": self.watchlist.country,
                "failed_keywords": failed,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryTaskStore;
    use keymetric_core::config::gateway::GatewayConfig;
    use keymetric_entity::task::TaskStatus;
    use keymetric_gateway::queue::RequestQueue;

    // Submissions against an unreachable base URL fail at the transport
    // layer, which is enough to exercise the all-failed path.
    #[tokio::test]
    async fn test_all_submissions_failing_surfaces_an_error() {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_token: "secret".to_string(),
            requests_per_minute: 600,
            failure_threshold: 100,
            reset_timeout_seconds: 60,
            request_timeout_seconds: 1,
        };
        let queue = RequestQueue::from_config(&config);
        let client = Arc::new(GatewayClient::new(config, queue).unwrap());
        let store = Arc::new(MemoryTaskStore::new());
        let job = KeywordRefreshJob::new(
            client,
            Arc::clone(&store) as _,
            WatchlistConfig {
                keywords: vec!["meditation".to_string(), "sleep tracker".to_string()],
                country: "us".to_string(),
            },
            30,
        );

        let err = job.run().await.unwrap_err();
        assert_eq!(err.kind, keymetric_core::error::ErrorKind::Upstream);
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_empty_watchlist_is_a_noop_success() {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_token: "secret".to_string(),
            requests_per_minute: 600,
            failure_threshold: 100,
            reset_timeout_seconds: 60,
            request_timeout_seconds: 1,
        };
        let queue = RequestQueue::from_config(&config);
        let client = Arc::new(GatewayClient::new(config, queue).unwrap());
        let store = Arc::new(MemoryTaskStore::new());
        let job = KeywordRefreshJob::new(
            client,
            Arc::clone(&store) as _,
            WatchlistConfig::default(),
            30,
        );

        let outcome = job.run().await.unwrap();
        assert_eq!(outcome.items_processed, Some(0));
    }

    // Smoke-check that created tasks start in the state the poller scans.
    #[tokio::test]
    async fn test_created_tasks_are_pollable() {
        let store = MemoryTaskStore::new();
        let task = store
            .create(&CreateProviderTask {
                ticket_id: "tk-9".to_string(),
                operation: OPERATION.to_string(),
                params: json!({"keyword": "yoga", "country": "us"}),
                max_retries: 30,
            })
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(store.find_pollable().await.unwrap().len(), 1);
    }
}
