//! Plain consumer pulling messages from the configured queue.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;

use super::receive_timeout;
use crate::{
    context::TestContext,
    endpoint::{Consumer, DirectEndpointConfiguration, Result, SelectiveConsumer},
    message::Message,
    metrics::{self, Direction},
    selector::DelegatingSelector,
};

/// Receives messages from the destination of a [`DirectEndpoint`](super::DirectEndpoint).
#[derive(Debug)]
pub struct DirectConsumer {
    name: String,
    configuration: Arc<DirectEndpointConfiguration>,
}

impl DirectConsumer {
    pub fn new(name: impl Into<String>, configuration: Arc<DirectEndpointConfiguration>) -> Self {
        Self {
            name: name.into(),
            configuration,
        }
    }

    #[must_use]
    pub fn configuration(&self) -> &DirectEndpointConfiguration { &self.configuration }
}

#[async_trait]
impl Consumer for DirectConsumer {
    fn name(&self) -> &str { &self.name }

    fn default_timeout(&self) -> Duration { self.configuration.timeout() }

    async fn receive_timeout(&self, context: &TestContext, timeout: Duration) -> Result<Message> {
        self.receive_selected_timeout("", context, timeout).await
    }
}

#[async_trait]
impl SelectiveConsumer for DirectConsumer {
    async fn receive_selected_timeout(
        &self,
        selector: &str,
        context: &TestContext,
        timeout: Duration,
    ) -> Result<Message> {
        let queue = self.configuration.destination_queue(&self.name, context)?;
        debug!(
            consumer = %self.name,
            destination = queue.name(),
            selector,
            timeout_ms = timeout.as_millis(),
            "receiving message"
        );

        let received = if selector.trim().is_empty() {
            queue.receive(timeout).await
        } else {
            let selector = DelegatingSelector::parse(selector, context)?;
            queue.receive_matching(&selector, timeout).await
        };
        let message = received.ok_or_else(|| receive_timeout(queue.name(), timeout))?;

        metrics::inc_messages(Direction::Inbound);
        debug!(destination = queue.name(), message_id = %message.id(), "message received");
        Ok(message)
    }
}
