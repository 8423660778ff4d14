//! Metric helpers for `agenix`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking messages moved through endpoints.
pub const MESSAGES_TOTAL: &str = "agenix_messages_total";
/// Name of the counter tracking elapsed receive and reply waits.
pub const TIMEOUTS_TOTAL: &str = "agenix_timeouts_total";
/// Name of the counter tracking failed correlation lookups.
pub const CORRELATION_MISSES_TOTAL: &str = "agenix_correlation_misses_total";

/// Direction of message flow relative to the endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Messages taken from a queue.
    Inbound,
    /// Messages put onto a queue.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a message moving in `direction`.
pub fn inc_messages(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record an elapsed wait.
pub fn inc_timeouts() {
    #[cfg(feature = "metrics")]
    counter!(TIMEOUTS_TOTAL).increment(1);
}

/// Record a correlation lookup that found no key or no stored object.
pub fn inc_correlation_misses() {
    #[cfg(feature = "metrics")]
    counter!(CORRELATION_MISSES_TOTAL).increment(1);
}
