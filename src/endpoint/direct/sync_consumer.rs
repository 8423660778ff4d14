//! Consumer side of a synchronous exchange.
//!
//! Receiving a request records its reply channel in a correlation manager
//! under the request's correlation key, and remembers that key for this
//! consumer's role in the test context. A later reply sent through the same
//! consumer recovers the key, looks up the channel and delivers the reply.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{DirectConsumer, send_to};
use crate::{
    context::TestContext,
    correlation::CorrelationManager,
    endpoint::{
        Consumer,
        DirectSyncEndpointConfiguration,
        EndpointError,
        Producer,
        ReplyProducer,
        Result,
        SelectiveConsumer,
    },
    message::{HeaderValue, Message, headers},
    metrics,
    queue::MessageQueue,
};

/// Receives requests and sends correlated replies.
pub struct DirectSyncConsumer {
    consumer: DirectConsumer,
    configuration: Arc<DirectSyncEndpointConfiguration>,
    correlation_manager: CorrelationManager<MessageQueue>,
}

impl DirectSyncConsumer {
    pub fn new(name: impl Into<String>, configuration: Arc<DirectSyncEndpointConfiguration>) -> Self {
        Self {
            consumer: DirectConsumer::new(name, Arc::clone(configuration.direct())),
            correlation_manager: CorrelationManager::with_polling_interval(
                configuration.polling_interval(),
            ),
            configuration,
        }
    }

    #[must_use]
    pub fn configuration(&self) -> &DirectSyncEndpointConfiguration { &self.configuration }

    /// Reply channels awaiting a reply, keyed by correlation key.
    #[must_use]
    pub fn correlation_manager(&self) -> &CorrelationManager<MessageQueue> {
        &self.correlation_manager
    }

    /// Remember where `request` wants its reply.
    ///
    /// Requests without a reply channel are logged and skipped; replying to
    /// them later fails. A reply channel that cannot be resolved is an
    /// [`EndpointError::UnresolvableReplyChannel`] naming the request, which
    /// has already left its queue at that point.
    fn save_reply_destination(&self, request: &Message, context: &TestContext) -> Result<()> {
        let unresolvable = |source| EndpointError::UnresolvableReplyChannel {
            message_id: request.id().to_string(),
            source,
        };
        let reply_queue = match request.header(headers::REPLY_QUEUE) {
            Some(HeaderValue::Queue(reference)) => reference.resolve(context).map_err(unresolvable)?,
            Some(HeaderValue::Text(name)) => context
                .resolve::<MessageQueue>(name)
                .map_err(unresolvable)?,
            Some(_) | None => {
                warn!(
                    consumer = self.consumer.name(),
                    message_id = %request.id(),
                    "unable to get reply channel for message: no reply queue header set"
                );
                return Ok(());
            }
        };

        let correlator = self.configuration.correlator();
        let correlation_key = correlator.correlation_key(request);
        let key_name = correlator.correlation_key_name(self.consumer.name());
        self.correlation_manager
            .save_correlation_key(&key_name, &correlation_key, context);
        debug!(
            consumer = self.consumer.name(),
            reply_queue = reply_queue.name(),
            %correlation_key,
            "reply channel registered"
        );
        self.correlation_manager.store(correlation_key, reply_queue);
        Ok(())
    }
}

impl fmt::Debug for DirectSyncConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectSyncConsumer")
            .field("name", &self.consumer.name())
            .field("correlation_manager", &self.correlation_manager)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Consumer for DirectSyncConsumer {
    fn name(&self) -> &str { self.consumer.name() }

    fn default_timeout(&self) -> Duration { self.configuration.timeout() }

    async fn receive_timeout(&self, context: &TestContext, timeout: Duration) -> Result<Message> {
        self.receive_selected_timeout("", context, timeout).await
    }
}

#[async_trait]
impl SelectiveConsumer for DirectSyncConsumer {
    async fn receive_selected_timeout(
        &self,
        selector: &str,
        context: &TestContext,
        timeout: Duration,
    ) -> Result<Message> {
        let request = self
            .consumer
            .receive_selected_timeout(selector, context, timeout)
            .await?;
        self.save_reply_destination(&request, context)?;
        Ok(request)
    }
}

#[async_trait]
impl Producer for DirectSyncConsumer {
    fn name(&self) -> &str { self.consumer.name() }

    async fn send(&self, message: Message, context: &TestContext) -> Result<()> {
        let key_name = self
            .configuration
            .correlator()
            .correlation_key_name(self.consumer.name());
        let correlation_key = self
            .correlation_manager
            .correlation_key(&key_name, context)
            .inspect_err(|_| metrics::inc_correlation_misses())?;

        let timeout = self.configuration.timeout();
        let Some(reply_queue) = self.correlation_manager.find(&correlation_key, timeout).await
        else {
            metrics::inc_correlation_misses();
            return Err(EndpointError::MissingReplyChannel {
                correlation_key,
                timeout_ms: timeout.as_millis(),
            });
        };

        debug!(
            consumer = self.consumer.name(),
            reply_queue = reply_queue.name(),
            %correlation_key,
            "sending reply"
        );
        send_to(&reply_queue, message)
    }
}

impl ReplyProducer for DirectSyncConsumer {}
