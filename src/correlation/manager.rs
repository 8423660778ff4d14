//! Keyed store with timeout-bounded, destructive lookup.

use std::{fmt, time::Duration};

use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::context::TestContext;

/// Default interval between two lookups while [`CorrelationManager::find`] waits.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(500);

/// Errors raised by [`CorrelationManager`].
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorrelationError {
    /// No correlation key was saved for the role in this context.
    #[error("no correlation key registered for '{name}'; correlation key not yet available")]
    MissingKey { name: String },
}

/// Stores values of type `T` under correlation keys.
///
/// Values are typically reply messages (requester side) or reply queues
/// (replier side). Every stored value is returned by at most one successful
/// lookup: [`find`](Self::find) removes the entry it returns, so concurrent
/// finders can never both observe the same value.
///
/// The association from an endpoint role to its in-flight correlation key is
/// kept in the [`TestContext`], not in the manager, so one manager can serve
/// several isolated test runs.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use agenix::correlation::CorrelationManager;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let manager = CorrelationManager::new();
/// manager.store("key", 7_u32);
/// assert_eq!(manager.find("key", Duration::from_millis(10)).await, Some(7));
/// assert_eq!(manager.find("key", Duration::ZERO).await, None);
/// # }
/// ```
pub struct CorrelationManager<T> {
    entries: DashMap<String, T>,
    polling_interval: Duration,
}

impl<T> Default for CorrelationManager<T> {
    fn default() -> Self { Self::with_polling_interval(DEFAULT_POLLING_INTERVAL) }
}

impl<T> CorrelationManager<T> {
    /// Create an empty manager polling at [`DEFAULT_POLLING_INTERVAL`].
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Create an empty manager with a custom polling interval.
    #[must_use]
    pub fn with_polling_interval(polling_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            polling_interval,
        }
    }

    #[must_use]
    pub fn polling_interval(&self) -> Duration { self.polling_interval }

    /// Record `key` as the in-flight correlation key for `key_name` in `context`.
    pub fn save_correlation_key(&self, key_name: &str, key: &str, context: &TestContext) {
        debug!(key_name, correlation_key = key, "saving correlation key");
        context.set_variable(key_name, key);
    }

    /// Return the correlation key saved for `key_name` in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::MissingKey`] if no key was saved.
    pub fn correlation_key(
        &self,
        key_name: &str,
        context: &TestContext,
    ) -> Result<String, CorrelationError> {
        context
            .variable(key_name)
            .ok_or_else(|| CorrelationError::MissingKey {
                name: key_name.to_owned(),
            })
    }

    /// Insert or overwrite the value stored under `key`.
    pub fn store(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        debug!(correlation_key = %key, "storing correlated object");
        self.entries.insert(key, value);
    }

    /// Remove and return the value under `key` without waiting.
    #[must_use]
    pub fn try_find(&self, key: &str) -> Option<T> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Remove and return the value under `key`, polling until `timeout` elapses.
    ///
    /// Returns `None` if nothing was stored in time. Callers decide whether
    /// that is an error. A timeout too large to be represented as a deadline
    /// polls indefinitely.
    pub async fn find(&self, key: &str, timeout: Duration) -> Option<T> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(value) = self.try_find(key) {
                return Some(value);
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(correlation_key = key, ?timeout, "correlated object not found");
                        return None;
                    }
                    (deadline - now).min(self.polling_interval)
                }
                None => self.polling_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }

    /// Number of stored entries not yet retrieved.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl<T> fmt::Debug for CorrelationManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationManager")
            .field("pending", &self.entries.len())
            .field("polling_interval", &self.polling_interval)
            .finish()
    }
}
