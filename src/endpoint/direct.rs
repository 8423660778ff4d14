//! Endpoints backed by in-process [`MessageQueue`]s.
//!
//! [`DirectEndpoint`] hands out a plain producer and consumer.
//! [`DirectSyncEndpoint`] adds request/reply correlation: its producer waits
//! for a reply after every send and its consumer remembers where each
//! received request wants its reply.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use tracing::{debug, warn};

use super::{
    DirectEndpointConfiguration,
    DirectSyncEndpointConfiguration,
    Endpoint,
    EndpointError,
    Producer,
    SelectiveConsumer,
};
use crate::{
    message::Message,
    metrics::{self, Direction},
    queue::MessageQueue,
};

mod consumer;
mod producer;
mod sync_consumer;
mod sync_producer;

pub use consumer::DirectConsumer;
pub use producer::DirectProducer;
pub use sync_consumer::DirectSyncConsumer;
pub use sync_producer::DirectSyncProducer;

/// Push `message` onto `queue`, wrapping queue failures with the destination.
fn send_to(queue: &MessageQueue, message: Message) -> Result<(), EndpointError> {
    let message_id = message.id().clone();
    queue.send(message).map_err(|source| EndpointError::Send {
        destination: queue.name().to_owned(),
        source,
    })?;
    metrics::inc_messages(Direction::Outbound);
    debug!(destination = queue.name(), %message_id, "message sent");
    Ok(())
}

/// Build the error for a receive that found nothing in time.
fn receive_timeout(destination: &str, timeout: Duration) -> EndpointError {
    metrics::inc_timeouts();
    warn!(destination, timeout_ms = timeout.as_millis(), "receive timed out");
    EndpointError::ReceiveTimeout {
        destination: destination.to_owned(),
        timeout_ms: timeout.as_millis(),
    }
}

fn producer_role(endpoint: &str) -> String { format!("{endpoint}:producer") }

fn consumer_role(endpoint: &str) -> String { format!("{endpoint}:consumer") }

/// Asynchronous endpoint over an in-memory queue.
///
/// # Examples
///
/// ```
/// use agenix::{
///     context::TestContext,
///     endpoint::{Consumer, DirectEndpoint, DirectEndpointConfiguration, Producer},
///     message::Message,
///     queue::MessageQueue,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> agenix::Result<()> {
/// let config = DirectEndpointConfiguration::builder()
///     .queue(MessageQueue::new("orders"))
///     .build()
///     .expect("valid configuration");
/// let endpoint = DirectEndpoint::new("orders", config);
/// let context = TestContext::new();
///
/// endpoint.producer().send(Message::new("hello"), &context).await?;
/// let received = endpoint.consumer().receive(&context).await?;
/// assert_eq!(received.payload().as_text(), "hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DirectEndpoint {
    name: String,
    configuration: Arc<DirectEndpointConfiguration>,
    producer: OnceLock<Arc<DirectProducer>>,
    consumer: OnceLock<Arc<DirectConsumer>>,
}

impl DirectEndpoint {
    pub fn new(name: impl Into<String>, configuration: DirectEndpointConfiguration) -> Self {
        Self {
            name: name.into(),
            configuration: Arc::new(configuration),
            producer: OnceLock::new(),
            consumer: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn configuration(&self) -> &DirectEndpointConfiguration { &self.configuration }

    /// The endpoint's producer, created on first use.
    pub fn producer(&self) -> Arc<DirectProducer> {
        Arc::clone(self.producer.get_or_init(|| {
            Arc::new(DirectProducer::new(
                producer_role(&self.name),
                Arc::clone(&self.configuration),
            ))
        }))
    }

    /// The endpoint's consumer, created on first use.
    pub fn consumer(&self) -> Arc<DirectConsumer> {
        Arc::clone(self.consumer.get_or_init(|| {
            Arc::new(DirectConsumer::new(
                consumer_role(&self.name),
                Arc::clone(&self.configuration),
            ))
        }))
    }
}

impl Endpoint for DirectEndpoint {
    fn name(&self) -> &str { &self.name }

    fn timeout(&self) -> Duration { self.configuration.timeout() }

    fn create_producer(&self) -> Arc<dyn Producer> { self.producer() }

    fn create_consumer(&self) -> Arc<dyn SelectiveConsumer> { self.consumer() }
}

/// Synchronous request/reply endpoint over an in-memory queue.
///
/// The producer sends a request, waits for the correlated reply and caches it
/// for [`ReplyConsumer`](super::ReplyConsumer) retrieval. The consumer
/// receives requests and replies to them through
/// [`ReplyProducer`](super::ReplyProducer).
#[derive(Debug)]
pub struct DirectSyncEndpoint {
    name: String,
    configuration: Arc<DirectSyncEndpointConfiguration>,
    producer: OnceLock<Arc<DirectSyncProducer>>,
    consumer: OnceLock<Arc<DirectSyncConsumer>>,
}

impl DirectSyncEndpoint {
    pub fn new(name: impl Into<String>, configuration: DirectSyncEndpointConfiguration) -> Self {
        Self {
            name: name.into(),
            configuration: Arc::new(configuration),
            producer: OnceLock::new(),
            consumer: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn configuration(&self) -> &DirectSyncEndpointConfiguration { &self.configuration }

    /// The endpoint's requesting producer, created on first use.
    pub fn producer(&self) -> Arc<DirectSyncProducer> {
        Arc::clone(self.producer.get_or_init(|| {
            Arc::new(DirectSyncProducer::new(
                producer_role(&self.name),
                Arc::clone(&self.configuration),
            ))
        }))
    }

    /// The endpoint's replying consumer, created on first use.
    pub fn consumer(&self) -> Arc<DirectSyncConsumer> {
        Arc::clone(self.consumer.get_or_init(|| {
            Arc::new(DirectSyncConsumer::new(
                consumer_role(&self.name),
                Arc::clone(&self.configuration),
            ))
        }))
    }
}

impl Endpoint for DirectSyncEndpoint {
    fn name(&self) -> &str { &self.name }

    fn timeout(&self) -> Duration { self.configuration.timeout() }

    fn create_producer(&self) -> Arc<dyn Producer> { self.producer() }

    fn create_consumer(&self) -> Arc<dyn SelectiveConsumer> { self.consumer() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_endpoint() -> DirectSyncEndpoint {
        let config = DirectSyncEndpointConfiguration::builder()
            .queue(MessageQueue::new("requests"))
            .build()
            .expect("valid configuration");
        DirectSyncEndpoint::new("hello", config)
    }

    #[test]
    fn producer_and_consumer_are_memoized() {
        let endpoint = sync_endpoint();
        assert!(Arc::ptr_eq(&endpoint.producer(), &endpoint.producer()));
        assert!(Arc::ptr_eq(&endpoint.consumer(), &endpoint.consumer()));
    }

    #[test]
    fn trait_factories_return_cached_instances() {
        let config = DirectEndpointConfiguration::builder()
            .queue_name("requests")
            .build()
            .expect("valid configuration");
        let endpoint = DirectEndpoint::new("plain", config);
        let first = endpoint.create_producer();
        let second = endpoint.create_producer();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "plain:producer");
        assert_eq!(endpoint.create_consumer().name(), "plain:consumer");
    }

    #[test]
    fn concurrent_first_use_creates_one_producer() {
        let endpoint = Arc::new(sync_endpoint());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let endpoint = Arc::clone(&endpoint);
                std::thread::spawn(move || endpoint.producer())
            })
            .collect();
        let producers: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect();
        assert!(producers.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn endpoint_reports_configured_timeout() {
        let endpoint = sync_endpoint();
        assert_eq!(Endpoint::timeout(&endpoint), crate::endpoint::DEFAULT_TIMEOUT);
    }
}
