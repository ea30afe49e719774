//! Circuit breaker for provider failure isolation.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::GatewayError;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitState {
    /// Normal operation, calls are allowed through.
    Closed,
    /// Failing fast, calls are rejected without a network attempt.
    Open,
    /// Testing recovery, a probe call is allowed through.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

/// Tracks consecutive server-class failures and opens after a threshold.
///
/// Transitions: `Open -> HalfOpen` once `reset_timeout` has elapsed since
/// the last failure; `HalfOpen -> Closed` on the next success; any failure
/// while `HalfOpen` returns to `Open`.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures and probes again after `reset_timeout`.
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
            }),
        }
    }

    /// Reject with [`GatewayError::CircuitOpen`] while the circuit is open
    /// and the reset timeout has not elapsed; otherwise admit the call,
    /// flipping to half-open when the timeout has passed.
    pub fn check(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|t| t.elapsed())
                    .unwrap_or(self.reset_timeout);
                if elapsed >= self.reset_timeout {
                    tracing::info!("Circuit breaker half-open, allowing probe request");
                    inner.state = CircuitState::HalfOpen;
                    Ok(())
                } else {
                    Err(GatewayError::CircuitOpen)
                }
            }
        }
    }

    /// Record a successful call: clears the failure count and closes the
    /// circuit if it was half-open.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != CircuitState::Closed {
            tracing::info!("Circuit breaker closed after successful probe");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
    }

    /// Record a server-class failure: opens the circuit at the threshold,
    /// or immediately when a half-open probe fails.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures += 1;
        inner.last_failure = Some(Instant::now());

        let should_open = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.failure_threshold,
            CircuitState::Open => false,
        };
        if should_open {
            tracing::warn!(
                consecutive_failures = inner.consecutive_failures,
                "Circuit breaker opened"
            );
            inner.state = CircuitState::Open;
        }
    }

    /// Current state (diagnostic snapshot).
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Current consecutive failure count (diagnostic snapshot).
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().unwrap().consecutive_failures
    }
}

/// Policy deciding which gateway errors count toward the breaker threshold.
///
/// Injectable because the "server-class" predicate is specific to the
/// upstream protocol; swapping providers means swapping this policy, not
/// the breaker.
pub trait FailureClassifier: Send + Sync {
    /// Whether the error indicates a server-side provider failure.
    fn is_server_error(&self, error: &GatewayError) -> bool;
}

/// Default classifier: upstream statuses at or above a threshold (500) and
/// transport failures are server-class; everything else is the caller's
/// fault and must not trip the breaker.
#[derive(Debug, Clone)]
pub struct StatusThresholdClassifier {
    threshold: u16,
}

impl StatusThresholdClassifier {
    /// Create a classifier with an explicit status threshold.
    pub fn new(threshold: u16) -> Self {
        Self { threshold }
    }
}

impl Default for StatusThresholdClassifier {
    fn default() -> Self {
        Self::new(500)
    }
}

impl FailureClassifier for StatusThresholdClassifier {
    fn is_server_error(&self, error: &GatewayError) -> bool {
        match error {
            GatewayError::Upstream { status, .. } => *status >= self.threshold,
            GatewayError::Transport(_) => true,
            _ => false,
        }
    }
}
