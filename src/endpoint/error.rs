//! Error types for endpoint configuration and message exchange.

use thiserror::Error;

use crate::{
    context::ResolveError,
    correlation::CorrelationError,
    queue::QueueError,
    selector::SelectorError,
};

/// Failures surfaced by producers and consumers.
///
/// Every variant names the destination, correlation key or elapsed timeout
/// needed to diagnose a failing test without additional logging.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Neither a queue nor a queue name was configured.
    #[error("endpoint '{endpoint}' has neither a queue nor a queue name configured")]
    MissingDestination { endpoint: String },
    /// A queue configured by name could not be resolved.
    #[error("failed to resolve queue: {0}")]
    Resolve(#[from] ResolveError),
    /// No message arrived within the receive timeout.
    #[error("action timed out after {timeout_ms} ms while receiving message from '{destination}'")]
    ReceiveTimeout { destination: String, timeout_ms: u128 },
    /// No reply arrived for a synchronous request within the timeout.
    #[error(
        "reply timed out after {timeout_ms} ms waiting for reply from '{destination}' \
         (correlation key {correlation_key})"
    )]
    ReplyTimeout {
        destination: String,
        correlation_key: String,
        timeout_ms: u128,
    },
    /// The role has no correlation key registered in this context.
    #[error(transparent)]
    MissingCorrelationKey(#[from] CorrelationError),
    /// No reply channel was stored under the correlation key in time.
    #[error(
        "failed to find reply channel for correlation key {correlation_key} after {timeout_ms} ms"
    )]
    MissingReplyChannel {
        correlation_key: String,
        timeout_ms: u128,
    },
    /// A request was taken off its queue but the reply channel it names
    /// could not be resolved, so it cannot be answered.
    #[error("request '{message_id}' was consumed but its reply channel could not be resolved")]
    UnresolvableReplyChannel {
        message_id: String,
        #[source]
        source: ResolveError,
    },
    /// A selector expression could not be parsed.
    #[error("invalid message selector: {0}")]
    InvalidSelector(#[from] SelectorError),
    /// The destination queue rejected the message.
    #[error("failed to send message to '{destination}'")]
    Send {
        destination: String,
        #[source]
        source: QueueError,
    },
}

impl EndpointError {
    /// Returns `true` for failures caused by an elapsed wait.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ReceiveTimeout { .. } | Self::ReplyTimeout { .. } | Self::MissingReplyChannel { .. }
        )
    }
}

/// Invalid endpoint configuration values.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("polling interval must be greater than zero")]
    ZeroPollingInterval,
}

/// Result alias used by endpoint operations.
pub type Result<T> = std::result::Result<T, EndpointError>;
