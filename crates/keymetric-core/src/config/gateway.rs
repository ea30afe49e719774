//! Intelligence provider gateway configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the upstream keyword/app intelligence provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the provider API.
    pub base_url: String,
    /// Static bearer token for authentication.
    ///
    /// Usually supplied via the `KEYMETRIC__GATEWAY__API_TOKEN` environment
    /// variable rather than checked into a config file.
    #[serde(default)]
    pub api_token: String,
    /// Provider quota in requests per minute. One token-bucket credit is
    /// regenerated every `60000 / requests_per_minute` milliseconds.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Consecutive server-class failures before the circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before a half-open probe is allowed.
    #[serde(default = "default_reset_timeout")]
    pub reset_timeout_seconds: u64,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_reset_timeout() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}
