//! Gateway error taxonomy.

use thiserror::Error;

use keymetric_core::error::{AppError, ErrorKind};

/// Error from an outbound provider call.
///
/// `Upstream` carries the provider's HTTP status so the breaker's failure
/// classifier can separate server-class (5xx) failures from client-class
/// (4xx) ones. A pending result is **not** an error — see
/// [`crate::client::FetchOutcome::Pending`].
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Missing or invalid setup: unknown operation, absent credentials.
    #[error("Gateway configuration error: {0}")]
    Config(String),

    /// The provider responded with a non-success HTTP status.
    #[error("Provider returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The request never produced a usable response (connect failure,
    /// timeout, malformed body).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The circuit breaker rejected the call before any network attempt.
    #[error("Circuit breaker is open, request rejected")]
    CircuitOpen,

    /// The provider accepted the ticket but reported the request failed.
    #[error("Provider reported failure: {0}")]
    Provider(String),

    /// A bounded wait gave up with the result still pending.
    #[error("Result still pending after {attempts} fetch attempts")]
    Exhausted { attempts: u32 },

    /// The queue dropped the request before completion (shutdown).
    #[error("Request was dropped before completion")]
    Canceled,
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let kind = match &err {
            GatewayError::Config(_) => ErrorKind::Configuration,
            GatewayError::Upstream { .. }
            | GatewayError::Transport(_)
            | GatewayError::Provider(_)
            | GatewayError::Exhausted { .. } => ErrorKind::Upstream,
            GatewayError::CircuitOpen => ErrorKind::CircuitOpen,
            GatewayError::Canceled => ErrorKind::Internal,
        };
        AppError::new(kind, err.to_string())
    }
}
