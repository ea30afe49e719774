//! Provider gateway client.
//!
//! Maps logical operations to provider endpoints and routes every call
//! through the shared [`RequestQueue`]. A pure protocol pass-through: no
//! retries live here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use keymetric_core::config::gateway::GatewayConfig;

use crate::error::GatewayError;
use crate::operations;
use crate::queue::{RequestPriority, RequestQueue, RequestResult};

/// Opaque handle to a submitted, not-yet-complete provider request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ticket {
    /// Provider-assigned ticket identifier.
    pub ticket_id: String,
}

/// Outcome of fetching a result. `Pending` is not an error; it signals the
/// caller to retry later.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The result is ready.
    Done(Value),
    /// The provider is still working on the request.
    Pending,
    /// The provider reported that the request itself failed (terminal).
    Failed(String),
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    status: String,
    data: Option<Value>,
    error: Option<String>,
}

/// Fetch seam used by the ticket poller so it can be driven by a scripted
/// provider in tests.
#[async_trait]
pub trait ResultFetcher: Send + Sync {
    /// Fetch the result for a previously submitted ticket.
    async fn fetch(
        &self,
        operation: &str,
        ticket_id: &str,
        priority: RequestPriority,
    ) -> Result<FetchOutcome, GatewayError>;
}

/// Client for the upstream intelligence provider.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    queue: Arc<RequestQueue>,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Create a client over the shared request queue.
    pub fn new(config: GatewayConfig, queue: Arc<RequestQueue>) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            queue,
            config,
        })
    }

    /// Submit a request for a logical operation; returns the provider's
    /// ticket. The result must be fetched later via [`Self::fetch`].
    pub async fn submit(
        &self,
        operation: &str,
        params: Value,
        priority: RequestPriority,
    ) -> Result<Ticket, GatewayError> {
        let spec = self.resolve(operation)?;
        let url = self.endpoint(spec.submit_path);

        tracing::debug!(operation, %url, ?priority, "Submitting provider request");

        let request = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&params);

        let body = self
            .queue
            .enqueue(priority, Box::pin(send_json(request)))
            .await?;

        serde_json::from_value(body)
            .map_err(|e| GatewayError::Transport(format!("Malformed submit response: {e}")))
    }

    /// Fetch the result for a ticket. `Pending` means try again later.
    pub async fn fetch(
        &self,
        operation: &str,
        ticket_id: &str,
        priority: RequestPriority,
    ) -> Result<FetchOutcome, GatewayError> {
        let spec = self.resolve(operation)?;
        let url = self.endpoint(spec.result_path);

        tracing::debug!(operation, ticket_id, ?priority, "Fetching provider result");

        let request = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&json!({ "ticket_id": ticket_id }));

        let body = self
            .queue
            .enqueue(priority, Box::pin(send_json(request)))
            .await?;

        let response: FetchResponse = serde_json::from_value(body)
            .map_err(|e| GatewayError::Transport(format!("Malformed result response: {e}")))?;

        match response.status.as_str() {
            "done" => Ok(FetchOutcome::Done(response.data.unwrap_or(Value::Null))),
            "pending" => Ok(FetchOutcome::Pending),
            "error" => Ok(FetchOutcome::Failed(
                response
                    .error
                    .unwrap_or_else(|| "provider reported failure".to_string()),
            )),
            other => Err(GatewayError::Transport(format!(
                "Unknown result status '{other}'"
            ))),
        }
    }

    fn resolve(&self, operation: &str) -> Result<&'static operations::OperationSpec, GatewayError> {
        if self.config.api_token.is_empty() {
            return Err(GatewayError::Config(
                "Provider API token is not configured".to_string(),
            ));
        }
        operations::lookup(operation).ok_or_else(|| {
            GatewayError::Config(format!(
                "Unknown operation '{operation}' (supported: {})",
                operations::names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ResultFetcher for GatewayClient {
    async fn fetch(
        &self,
        operation: &str,
        ticket_id: &str,
        priority: RequestPriority,
    ) -> Result<FetchOutcome, GatewayError> {
        GatewayClient::fetch(self, operation, ticket_id, priority).await
    }
}

/// Send a prepared request and decode the JSON body, mapping HTTP failures
/// into the gateway error taxonomy.
async fn send_json(request: reqwest::RequestBuilder) -> RequestResult {
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GatewayError::Upstream {
            status: status.as_u16(),
            message: truncate(&message, 200),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| GatewayError::Transport(format!("Malformed response body: {e}")))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
