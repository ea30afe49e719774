//! Ticket poll job: one poller pass per trigger.

use std::sync::Arc;

use serde_json::json;

use keymetric_core::result::AppResult;
use keymetric_gateway::queue::RequestQueue;

use crate::poller::TicketPoller;
use crate::runner::JobOutcome;
use crate::scheduler::ScheduledJob;

/// Runs a single [`TicketPoller`] pass on each trigger and records a
/// queue diagnostics snapshot alongside the pass result.
pub struct TicketPollJob {
    poller: Arc<TicketPoller>,
    queue: Arc<RequestQueue>,
}

impl TicketPollJob {
    pub fn new(poller: Arc<TicketPoller>, queue: Arc<RequestQueue>) -> Self {
        Self { poller, queue }
    }
}

#[async_trait::async_trait]
impl ScheduledJob for TicketPollJob {
    fn name(&self) -> &str {
        "ticket_poll"
    }

    async fn run(&self) -> AppResult<JobOutcome> {
        let terminal = self.poller.poll_outstanding().await?;

        // The queue is the shared bottleneck for every provider call, so
        // each pass leaves a visibility trail on the log row.
        let snapshot = self.queue.snapshot();
        tracing::info!(
            terminal,
            queue_depth = snapshot.depth,
            breaker_state = ?snapshot.breaker_state,
            available_tokens = snapshot.available_tokens,
            "Ticket poll pass finished"
        );

        Ok(JobOutcome {
            items_processed: Some(terminal as i64),
            metadata: Some(json!({ "queue": serde_json::to_value(&snapshot)? })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryTaskStore, ScriptedFetcher};
    use keymetric_core::config::gateway::GatewayConfig;
    use keymetric_entity::task::{CreateProviderTask, TaskStore};
    use keymetric_gateway::FetchOutcome;

    fn idle_queue() -> Arc<RequestQueue> {
        RequestQueue::from_config(&GatewayConfig {
            base_url: "http://provider.invalid".to_string(),
            api_token: "secret".to_string(),
            requests_per_minute: 60,
            failure_threshold: 5,
            reset_timeout_seconds: 60,
            request_timeout_seconds: 5,
        })
    }

    #[tokio::test]
    async fn test_pass_reports_terminal_count_and_queue_snapshot() {
        let store = Arc::new(MemoryTaskStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.script(
            "tk-1",
            vec![Ok(FetchOutcome::Done(serde_json::json!({"rank": 2})))],
        );
        store
            .create(&CreateProviderTask {
                ticket_id: "tk-1".to_string(),
                operation: "keyword-check".to_string(),
                params: serde_json::json!({"keyword": "running"}),
                max_retries: 30,
            })
            .await
            .unwrap();

        let poller = Arc::new(TicketPoller::new(Arc::clone(&store) as _, fetcher));
        let job = TicketPollJob::new(poller, idle_queue());

        let outcome = job.run().await.unwrap();
        assert_eq!(outcome.items_processed, Some(1));

        let metadata = outcome.metadata.unwrap();
        assert_eq!(metadata["queue"]["depth"], serde_json::json!(0));
        assert_eq!(metadata["queue"]["breaker_state"], serde_json::json!("closed"));
        assert!(metadata["queue"]["available_tokens"].is_number());
    }
}
