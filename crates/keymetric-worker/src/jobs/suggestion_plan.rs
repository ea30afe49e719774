//! Suggestion plan job: expands the watchlist into candidate keywords.
//!
//! Unlike the refresh job this one needs the answer within its own run,
//! so it short-polls the result with a bounded in-memory wait instead of
//! persisting a ticket for the background poller.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use keymetric_core::config::worker::WatchlistConfig;
use keymetric_core::error::AppError;
use keymetric_core::result::AppResult;
use keymetric_gateway::queue::RequestPriority;
use keymetric_gateway::{wait_for_result, GatewayClient};

use crate::runner::JobOutcome;
use crate::scheduler::ScheduledJob;

const OPERATION: &str = "keyword-suggestions";
const WAIT_ATTEMPTS: u32 = 10;
const WAIT_INTERVAL: Duration = Duration::from_secs(3);

/// Submits the watchlist as suggestion seeds and waits for the expansion.
pub struct SuggestionPlanJob {
    client: Arc<GatewayClient>,
    watchlist: WatchlistConfig,
}

impl SuggestionPlanJob {
    pub fn new(client: Arc<GatewayClient>, watchlist: WatchlistConfig) -> Self {
        Self { client, watchlist }
    }
}

#[async_trait::async_trait]
impl ScheduledJob for SuggestionPlanJob {
    fn name(&self) -> &str {
        "suggestion_plan"
    }

    async fn run(&self) -> AppResult<JobOutcome> {
        if self.watchlist.keywords.is_empty() {
            tracing::info!("Watchlist is empty, skipping suggestion plan");
            return Ok(JobOutcome {
                items_processed: Some(0),
                metadata: None,
            });
        }

        let params = json!({
            "keywords": self.watchlist.keywords,
            "country": self.watchlist.country,
        });
        let ticket = self
            .client
            .submit(OPERATION, params, RequestPriority::Normal)
            .await
            .map_err(AppError::from)?;

        let data = wait_for_result(
            self.client.as_ref(),
            OPERATION,
            &ticket.ticket_id,
            RequestPriority::Normal,
            WAIT_ATTEMPTS,
            WAIT_INTERVAL,
        )
        .await
        .map_err(AppError::from)?;

        let suggestion_count = data
            .get("suggestions")
            .and_then(|s| s.as_array())
            .map(|s| s.len() as i64)
            .unwrap_or(0);

        Ok(JobOutcome {
            items_processed: Some(suggestion_count),
            metadata: Some(json!({
                "ticket_id": ticket.ticket_id,
                "seed_count": self.watchlist.keywords.len(),
                "suggestions": data.get("suggestions").cloned().unwrap_or(json!([])),
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keymetric_core::config::gateway::GatewayConfig;
    use keymetric_gateway::queue::RequestQueue;

    #[tokio::test]
    async fn test_empty_watchlist_skips_submission() {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_token: "secret".to_string(),
            requests_per_minute: 600,
            failure_threshold: 5,
            reset_timeout_seconds: 60,
            request_timeout_seconds: 1,
        };
        let queue = RequestQueue::from_config(&config);
        let client = Arc::new(GatewayClient::new(config, queue).unwrap());
        let job = SuggestionPlanJob::new(client, WatchlistConfig::default());

        let outcome = job.run().await.unwrap();
        assert_eq!(outcome.items_processed, Some(0));
        assert!(outcome.metadata.is_none());
    }
}
