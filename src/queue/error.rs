//! Error types for queue operations.

use thiserror::Error;

/// Errors raised by [`super::MessageQueue`].
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The queue no longer accepts messages.
    #[error("queue '{queue}' is closed")]
    Closed {
        /// Name of the closed queue.
        queue: String,
    },
}
