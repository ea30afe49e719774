//! # keymetric-gateway
//!
//! Integration with the upstream keyword/app intelligence provider.
//!
//! All outbound calls flow through a single [`queue::RequestQueue`] that
//! serializes execution under a token-bucket rate limit
//! ([`limiter::TokenBucketLimiter`]) and a circuit breaker
//! ([`breaker::CircuitBreaker`]). The [`client::GatewayClient`] maps logical
//! operation names to provider endpoints and routes them through the queue;
//! it carries no retry logic of its own.

pub mod breaker;
pub mod client;
pub mod error;
pub mod limiter;
pub mod operations;
pub mod queue;
pub mod wait;

pub use breaker::{CircuitBreaker, CircuitState, FailureClassifier, StatusThresholdClassifier};
pub use client::{FetchOutcome, GatewayClient, ResultFetcher, Ticket};
pub use error::GatewayError;
pub use limiter::TokenBucketLimiter;
pub use queue::{QueueSnapshot, RequestPriority, RequestQueue};
pub use wait::wait_for_result;
