//! Short synchronous-style wait for a provider result.
//!
//! Used by jobs that need the answer within their own run instead of
//! handing the ticket off to the background poller.

use std::time::Duration;

use serde_json::Value;

use crate::client::{FetchOutcome, ResultFetcher};
use crate::error::GatewayError;
use crate::queue::RequestPriority;

/// Poll for a result up to `max_attempts` times, sleeping `interval`
/// between attempts while the provider reports pending.
///
/// Returns [`GatewayError::Provider`] if the provider reports the request
/// failed, and [`GatewayError::Exhausted`] when every attempt came back
/// pending.
pub async fn wait_for_result(
    fetcher: &dyn ResultFetcher,
    operation: &str,
    ticket_id: &str,
    priority: RequestPriority,
    max_attempts: u32,
    interval: Duration,
) -> Result<Value, GatewayError> {
    for attempt in 1..=max_attempts {
        match fetcher.fetch(operation, ticket_id, priority).await? {
            FetchOutcome::Done(data) => return Ok(data),
            FetchOutcome::Failed(message) => return Err(GatewayError::Provider(message)),
            FetchOutcome::Pending => {
                tracing::debug!(operation, ticket_id, attempt, "Result still pending");
                if attempt < max_attempts {
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
    Err(GatewayError::Exhausted {
        attempts: max_attempts,
    })
}
