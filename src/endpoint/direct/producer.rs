//! Plain producer pushing messages onto the configured queue.

use std::sync::Arc;

use async_trait::async_trait;

use super::send_to;
use crate::{
    context::TestContext,
    endpoint::{DirectEndpointConfiguration, Producer, Result},
    message::Message,
};

/// Sends messages to the destination of a [`DirectEndpoint`](super::DirectEndpoint).
#[derive(Debug)]
pub struct DirectProducer {
    name: String,
    configuration: Arc<DirectEndpointConfiguration>,
}

impl DirectProducer {
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
impl Producer for DirectProducer {
    fn name(&self) -> &str { &self.name }

    async fn send(&self, message: Message, context: &TestContext) -> Result<()> {
        let queue = self.configuration.destination_queue(&self.name, context)?;
        send_to(&queue, message)
    }
}
