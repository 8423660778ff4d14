//! Static settings for direct endpoints.
//!
//! Configurations are assembled with a builder and are immutable afterwards,
//! so endpoints can share them freely across concurrently running actions.

use std::{fmt, sync::Arc, time::Duration};

use static_assertions::const_assert;

use super::{ConfigError, EndpointError};
use crate::{
    context::TestContext,
    correlation::{DEFAULT_POLLING_INTERVAL, DefaultMessageCorrelator, MessageCorrelator},
    queue::{MessageQueue, QueueRef},
};

/// Default time a receive waits for a message.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

const_assert!(DEFAULT_POLLING_INTERVAL.as_millis() < DEFAULT_TIMEOUT.as_millis());

/// Settings of a [`DirectEndpoint`](super::DirectEndpoint).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use agenix::endpoint::DirectEndpointConfiguration;
///
/// let config = DirectEndpointConfiguration::builder()
///     .queue_name("orders")
///     .timeout(Duration::from_secs(10))
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.destination_name(), "orders");
/// assert_eq!(config.timeout(), Duration::from_secs(10));
/// ```
#[derive(Clone, Debug)]
pub struct DirectEndpointConfiguration {
    destination: Option<QueueRef>,
    timeout: Duration,
}

impl Default for DirectEndpointConfiguration {
    fn default() -> Self {
        Self {
            destination: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DirectEndpointConfiguration {
    #[must_use]
    pub fn builder() -> DirectEndpointConfigurationBuilder {
        DirectEndpointConfigurationBuilder::default()
    }

    /// Configured destination, if any.
    #[must_use]
    pub fn destination(&self) -> Option<&QueueRef> { self.destination.as_ref() }

    /// Name of the destination for diagnostics; empty when none is set.
    #[must_use]
    pub fn destination_name(&self) -> &str { self.destination.as_ref().map_or("", QueueRef::name) }

    #[must_use]
    pub fn timeout(&self) -> Duration { self.timeout }

    /// Resolve the destination queue on behalf of `role`.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::MissingDestination`] if neither a queue nor a
    /// queue name is configured, or [`EndpointError::Resolve`] if a named queue
    /// cannot be resolved through the context.
    pub fn destination_queue(
        &self,
        role: &str,
        context: &TestContext,
    ) -> Result<MessageQueue, EndpointError> {
        let destination = self
            .destination
            .as_ref()
            .ok_or_else(|| EndpointError::MissingDestination {
                endpoint: role.to_owned(),
            })?;
        Ok(destination.resolve(context)?)
    }
}

/// Builder for [`DirectEndpointConfiguration`].
#[derive(Debug, Default)]
pub struct DirectEndpointConfigurationBuilder {
    inner: DirectEndpointConfiguration,
}

impl DirectEndpointConfigurationBuilder {
    /// Use a live queue handle as destination.
    #[must_use]
    pub fn queue(mut self, queue: MessageQueue) -> Self {
        self.inner.destination = Some(QueueRef::Direct(queue));
        self
    }

    /// Resolve the destination by name at send or receive time.
    #[must_use]
    pub fn queue_name(mut self, name: impl Into<String>) -> Self {
        self.inner.destination = Some(QueueRef::Named(name.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner.timeout = timeout;
        self
    }

    /// Finish the configuration.
    ///
    /// A missing destination is accepted here and reported when the endpoint
    /// is first used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTimeout`] if the timeout is zero.
    pub fn build(self) -> Result<DirectEndpointConfiguration, ConfigError> {
        if self.inner.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self.inner)
    }
}

/// Settings of a [`DirectSyncEndpoint`](super::DirectSyncEndpoint).
///
/// Extends the direct settings with the polling interval used for correlated
/// lookups and the correlator deriving keys from requests.
#[derive(Clone)]
pub struct DirectSyncEndpointConfiguration {
    direct: Arc<DirectEndpointConfiguration>,
    polling_interval: Duration,
    correlator: Arc<dyn MessageCorrelator>,
}

impl Default for DirectSyncEndpointConfiguration {
    fn default() -> Self {
        Self {
            direct: Arc::default(),
            polling_interval: DEFAULT_POLLING_INTERVAL,
            correlator: Arc::new(DefaultMessageCorrelator),
        }
    }
}

impl DirectSyncEndpointConfiguration {
    #[must_use]
    pub fn builder() -> DirectSyncEndpointConfigurationBuilder {
        DirectSyncEndpointConfigurationBuilder::default()
    }

    /// The underlying direct settings.
    #[must_use]
    pub fn direct(&self) -> &Arc<DirectEndpointConfiguration> { &self.direct }

    #[must_use]
    pub fn timeout(&self) -> Duration { self.direct.timeout() }

    #[must_use]
    pub fn polling_interval(&self) -> Duration { self.polling_interval }

    #[must_use]
    pub fn correlator(&self) -> &Arc<dyn MessageCorrelator> { &self.correlator }
}

impl fmt::Debug for DirectSyncEndpointConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectSyncEndpointConfiguration")
            .field("direct", &self.direct)
            .field("polling_interval", &self.polling_interval)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DirectSyncEndpointConfiguration`].
#[derive(Default)]
pub struct DirectSyncEndpointConfigurationBuilder {
    direct: DirectEndpointConfigurationBuilder,
    polling_interval: Option<Duration>,
    correlator: Option<Arc<dyn MessageCorrelator>>,
}

impl DirectSyncEndpointConfigurationBuilder {
    #[must_use]
    pub fn queue(mut self, queue: MessageQueue) -> Self {
        self.direct = self.direct.queue(queue);
        self
    }

    #[must_use]
    pub fn queue_name(mut self, name: impl Into<String>) -> Self {
        self.direct = self.direct.queue_name(name);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.direct = self.direct.timeout(timeout);
        self
    }

    /// Interval between two correlation lookups while waiting.
    #[must_use]
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = Some(interval);
        self
    }

    /// Replace the [`DefaultMessageCorrelator`].
    #[must_use]
    pub fn correlator(mut self, correlator: Arc<dyn MessageCorrelator>) -> Self {
        self.correlator = Some(correlator);
        self
    }

    /// Finish the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the timeout or polling interval is zero.
    pub fn build(self) -> Result<DirectSyncEndpointConfiguration, ConfigError> {
        let polling_interval = self.polling_interval.unwrap_or(DEFAULT_POLLING_INTERVAL);
        if polling_interval.is_zero() {
            return Err(ConfigError::ZeroPollingInterval);
        }
        Ok(DirectSyncEndpointConfiguration {
            direct: Arc::new(self.direct.build()?),
            polling_interval,
            correlator: self
                .correlator
                .unwrap_or_else(|| Arc::new(DefaultMessageCorrelator)),
        })
    }
}
