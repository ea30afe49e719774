//! Priority request queue: single serialized execution pipeline over all
//! outbound provider calls.
//!
//! The limiter and breaker are process-wide shared state, so operations are
//! executed strictly one at a time by a single drain loop. The loop exits
//! when the queue empties and is restarted lazily by the next enqueue; an
//! atomic flag plus a re-check after clearing it guards the race between
//! "loop about to exit" and "new item enqueued".

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use keymetric_core::config::gateway::GatewayConfig;

use crate::breaker::{CircuitBreaker, CircuitState, FailureClassifier, StatusThresholdClassifier};
use crate::error::GatewayError;
use crate::limiter::TokenBucketLimiter;

/// Result of a queued provider operation.
pub type RequestResult = Result<Value, GatewayError>;

/// Priority class for a queued request. Lower rank executes first;
/// ties preserve enqueue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPriority {
    /// Interactive or operator-triggered work.
    High,
    /// Default for scheduled submissions.
    Normal,
    /// Background polling.
    Low,
}

impl RequestPriority {
    /// Numeric rank used for ordering (lower executes first).
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }
}

struct QueuedRequest {
    rank: u8,
    seq: u64,
    operation: BoxFuture<'static, RequestResult>,
    reply: oneshot::Sender<RequestResult>,
}

/// Read-only diagnostics snapshot; not part of the execution contract.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    /// Requests waiting to execute.
    pub depth: usize,
    /// Current breaker state.
    pub breaker_state: CircuitState,
    /// Approximate rate-limit tokens available.
    pub available_tokens: f64,
}

/// The single in-process queue all provider calls flow through.
pub struct RequestQueue {
    /// Waiting requests, kept sorted by (rank, seq).
    waiting: Mutex<Vec<QueuedRequest>>,
    /// Monotonic sequence for stable FIFO within a priority class.
    seq: AtomicU64,
    /// True while a drain loop is running.
    draining: AtomicBool,
    limiter: TokenBucketLimiter,
    breaker: CircuitBreaker,
    classifier: Box<dyn FailureClassifier>,
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueue")
            .field("depth", &self.waiting.lock().unwrap().len())
            .finish()
    }
}

impl RequestQueue {
    /// Create a queue with explicit components.
    pub fn new(
        limiter: TokenBucketLimiter,
        breaker: CircuitBreaker,
        classifier: Box<dyn FailureClassifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            waiting: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
            draining: AtomicBool::new(false),
            limiter,
            breaker,
            classifier,
        })
    }

    /// Create a queue from gateway configuration with the default
    /// status-threshold failure classifier.
    pub fn from_config(config: &GatewayConfig) -> Arc<Self> {
        Self::new(
            TokenBucketLimiter::per_minute(config.requests_per_minute),
            CircuitBreaker::new(
                config.failure_threshold,
                Duration::from_secs(config.reset_timeout_seconds),
            ),
            Box::new(StatusThresholdClassifier::default()),
        )
    }

    /// Submit an operation and await its result.
    ///
    /// The operation future is not polled until the drain loop dequeues it,
    /// after the breaker check and token acquisition. The queue never
    /// retries; errors surface directly to the caller.
    pub async fn enqueue(
        self: &Arc<Self>,
        priority: RequestPriority,
        operation: BoxFuture<'static, RequestResult>,
    ) -> RequestResult {
        let (reply, rx) = oneshot::channel();
        let item = QueuedRequest {
            rank: priority.rank(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            operation,
            reply,
        };

        {
            let mut waiting = self.waiting.lock().unwrap();
            // Insert at the end of this request's priority class; seq is
            // monotonic so within a class the vector stays FIFO.
            let pos = waiting.partition_point(|q| q.rank <= item.rank);
            waiting.insert(pos, item);
        }
        self.ensure_drain();

        rx.await.unwrap_or(Err(GatewayError::Canceled))
    }

    /// Current diagnostics snapshot.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            depth: self.waiting.lock().unwrap().len(),
            breaker_state: self.breaker.state(),
            available_tokens: self.limiter.available(),
        }
    }

    /// Spawn the drain loop unless one is already running.
    fn ensure_drain(self: &Arc<Self>) {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let queue = Arc::clone(self);
            tokio::spawn(async move { queue.drain().await });
        }
    }

    async fn drain(self: Arc<Self>) {
        loop {
            while let Some(item) = self.pop_next() {
                self.execute(item).await;
            }

            self.draining.store(false, Ordering::Release);
            // An enqueue may have raced with the loop winding down: it saw
            // the flag still set and did not spawn. Reclaim the flag and
            // keep going if work arrived, otherwise exit for good.
            if self.waiting.lock().unwrap().is_empty() {
                return;
            }
            if self
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
        }
    }

    fn pop_next(&self) -> Option<QueuedRequest> {
        let mut waiting = self.waiting.lock().unwrap();
        if waiting.is_empty() {
            None
        } else {
            Some(waiting.remove(0))
        }
    }

    /// Run one dequeued request: breaker check (a rejection consumes no
    /// token), token acquisition (may suspend), execution, then exactly one
    /// breaker notification for the attempt.
    async fn execute(&self, item: QueuedRequest) {
        if let Err(e) = self.breaker.check() {
            let _ = item.reply.send(Err(e));
            return;
        }

        self.limiter.acquire().await;
        let result = item.operation.await;

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(e) if self.classifier.is_server_error(e) => self.breaker.record_failure(),
            Err(_) => {}
        }

        let _ = item.reply.send(result);
    }
}
