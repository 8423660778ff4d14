//! Endpoints and the producer/consumer contracts they hand out.
//!
//! An [`Endpoint`] bundles a configuration with lazily created, cached
//! producer and consumer instances. Producers push messages towards a
//! destination; consumers pull them. The reply variants ([`ReplyProducer`],
//! [`ReplyConsumer`]) complete a synchronous exchange from the opposite side:
//! the consumer of a request replies through a [`ReplyProducer`], and the
//! producer of a request collects its reply through a [`ReplyConsumer`].

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{context::TestContext, message::Message};

mod config;
pub mod direct;
mod error;

pub use config::{
    DEFAULT_TIMEOUT,
    DirectEndpointConfiguration,
    DirectEndpointConfigurationBuilder,
    DirectSyncEndpointConfiguration,
    DirectSyncEndpointConfigurationBuilder,
};
pub use direct::{
    DirectConsumer,
    DirectEndpoint,
    DirectProducer,
    DirectSyncConsumer,
    DirectSyncEndpoint,
    DirectSyncProducer,
};
pub use error::{ConfigError, EndpointError, Result};

/// Sends messages to an endpoint's destination.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Role name identifying this producer, e.g. `orders:producer`.
    fn name(&self) -> &str;

    /// Send `message` within `context`.
    ///
    /// # Errors
    ///
    /// Returns an [`EndpointError`] if the destination cannot be resolved or
    /// rejects the message.
    async fn send(&self, message: Message, context: &TestContext) -> Result<()>;
}

/// Receives messages from an endpoint's destination.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Role name identifying this consumer, e.g. `orders:consumer`.
    fn name(&self) -> &str;

    /// Timeout applied when no explicit timeout is given.
    fn default_timeout(&self) -> Duration;

    /// Receive the next message, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an [`EndpointError`] if the destination cannot be resolved or
    /// nothing arrives in time.
    async fn receive_timeout(&self, context: &TestContext, timeout: Duration) -> Result<Message>;

    /// Receive the next message using the configured timeout.
    ///
    /// # Errors
    ///
    /// See [`Consumer::receive_timeout`].
    async fn receive(&self, context: &TestContext) -> Result<Message> {
        self.receive_timeout(context, self.default_timeout()).await
    }
}

/// Consumer able to pick messages by a selector expression.
#[async_trait]
pub trait SelectiveConsumer: Consumer {
    /// Receive the first message matching `selector`, waiting up to `timeout`.
    ///
    /// An empty selector behaves like [`Consumer::receive_timeout`].
    ///
    /// # Errors
    ///
    /// Returns an [`EndpointError`] if the selector is invalid, the destination
    /// cannot be resolved or nothing matching arrives in time.
    async fn receive_selected_timeout(
        &self,
        selector: &str,
        context: &TestContext,
        timeout: Duration,
    ) -> Result<Message>;

    /// Receive the first message matching `selector` using the configured timeout.
    ///
    /// # Errors
    ///
    /// See [`SelectiveConsumer::receive_selected_timeout`].
    async fn receive_selected(&self, selector: &str, context: &TestContext) -> Result<Message> {
        self.receive_selected_timeout(selector, context, self.default_timeout())
            .await
    }
}

/// Producer sending replies to previously received requests.
pub trait ReplyProducer: Producer {}

/// Consumer collecting replies to previously sent requests.
pub trait ReplyConsumer: SelectiveConsumer {}

/// Factory for the producer and consumer of one destination.
///
/// Repeated calls return the same cached instances.
pub trait Endpoint: Send + Sync {
    fn name(&self) -> &str;

    /// Default timeout of the endpoint's receive operations.
    fn timeout(&self) -> Duration;

    fn create_producer(&self) -> Arc<dyn Producer>;

    fn create_consumer(&self) -> Arc<dyn SelectiveConsumer>;
}
