//! Producer side of a synchronous exchange.
//!
//! `send` registers the request's correlation key for this producer's role,
//! makes sure the request carries a reply channel, sends it and then waits on
//! that channel for the reply. The reply is cached in a correlation manager so
//! a later `receive` can hand it to the caller through the same key-based
//! lookup the consumer side uses.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{DirectProducer, send_to};
use crate::{
    context::TestContext,
    correlation::CorrelationManager,
    endpoint::{
        Consumer,
        DirectSyncEndpointConfiguration,
        EndpointError,
        Producer,
        ReplyConsumer,
        Result,
        SelectiveConsumer,
    },
    message::{HeaderValue, Message, headers},
    metrics::{self, Direction},
    queue::{MessageQueue, QueueRef},
};

/// Sends requests and collects their correlated replies.
pub struct DirectSyncProducer {
    producer: DirectProducer,
    configuration: Arc<DirectSyncEndpointConfiguration>,
    correlation_manager: CorrelationManager<Message>,
}

impl DirectSyncProducer {
    pub fn new(name: impl Into<String>, configuration: Arc<DirectSyncEndpointConfiguration>) -> Self {
        Self {
            producer: DirectProducer::new(name, Arc::clone(configuration.direct())),
            correlation_manager: CorrelationManager::with_polling_interval(
                configuration.polling_interval(),
            ),
            configuration,
        }
    }

    #[must_use]
    pub fn configuration(&self) -> &DirectSyncEndpointConfiguration { &self.configuration }

    /// Replies received but not yet collected, keyed by correlation key.
    #[must_use]
    pub fn correlation_manager(&self) -> &CorrelationManager<Message> { &self.correlation_manager }

    /// Resolve the reply channel already named by `message`, if any.
    fn existing_reply_queue(message: &Message, context: &TestContext) -> Result<Option<MessageQueue>> {
        Ok(match message.header(headers::REPLY_QUEUE) {
            Some(HeaderValue::Queue(reference)) => Some(reference.resolve(context)?),
            Some(HeaderValue::Text(name)) => Some(context.resolve::<MessageQueue>(name)?),
            Some(_) | None => None,
        })
    }
}

impl fmt::Debug for DirectSyncProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectSyncProducer")
            .field("name", &self.producer.name())
            .field("correlation_manager", &self.correlation_manager)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Producer for DirectSyncProducer {
    fn name(&self) -> &str { self.producer.name() }

    async fn send(&self, mut message: Message, context: &TestContext) -> Result<()> {
        let name = self.producer.name();
        let destination = self
            .configuration
            .direct()
            .destination_queue(name, context)?;

        // A request whose reply channel cannot be resolved fails before its
        // key is registered, so no stale key is left in the context.
        let existing = Self::existing_reply_queue(&message, context)?;

        // The key must be registered and the reply channel stamped before the
        // request leaves, or a fast reply could not be matched.
        let correlator = self.configuration.correlator();
        let correlation_key = correlator.correlation_key(&message);
        let key_name = correlator.correlation_key_name(name);
        self.correlation_manager
            .save_correlation_key(&key_name, &correlation_key, context);
        let reply_queue = existing.unwrap_or_else(|| {
            let queue = MessageQueue::temporary();
            message.set_header(headers::REPLY_QUEUE, QueueRef::Direct(queue.clone()));
            queue
        });

        debug!(
            producer = name,
            destination = destination.name(),
            reply_queue = reply_queue.name(),
            %correlation_key,
            "sending synchronous request"
        );
        send_to(&destination, message)?;

        let timeout = self.configuration.timeout();
        let Some(reply) = reply_queue.receive(timeout).await else {
            metrics::inc_timeouts();
            warn!(
                producer = name,
                destination = destination.name(),
                timeout_ms = timeout.as_millis(),
                "reply timed out"
            );
            return Err(EndpointError::ReplyTimeout {
                destination: destination.name().to_owned(),
                correlation_key,
                timeout_ms: timeout.as_millis(),
            });
        };

        metrics::inc_messages(Direction::Inbound);
        debug!(producer = name, message_id = %reply.id(), %correlation_key, "reply received");
        self.correlation_manager.store(correlation_key, reply);
        Ok(())
    }
}

#[async_trait]
impl Consumer for DirectSyncProducer {
    fn name(&self) -> &str { self.producer.name() }

    fn default_timeout(&self) -> Duration { self.configuration.timeout() }

    async fn receive_timeout(&self, context: &TestContext, timeout: Duration) -> Result<Message> {
        self.receive_selected_timeout("", context, timeout).await
    }
}

#[async_trait]
impl SelectiveConsumer for DirectSyncProducer {
    /// Collect the cached reply for `selector`, which is used verbatim as the
    /// correlation key. An empty selector uses the key of the last request
    /// sent by this producer in `context`.
    async fn receive_selected_timeout(
        &self,
        selector: &str,
        context: &TestContext,
        timeout: Duration,
    ) -> Result<Message> {
        let correlation_key = if selector.trim().is_empty() {
            let key_name = self
                .configuration
                .correlator()
                .correlation_key_name(self.producer.name());
            self.correlation_manager
                .correlation_key(&key_name, context)
                .inspect_err(|_| metrics::inc_correlation_misses())?
        } else {
            selector.to_owned()
        };

        if let Some(reply) = self.correlation_manager.find(&correlation_key, timeout).await {
            return Ok(reply);
        }
        metrics::inc_correlation_misses();
        Err(EndpointError::ReplyTimeout {
            destination: self.configuration.direct().destination_name().to_owned(),
            correlation_key,
            timeout_ms: timeout.as_millis(),
        })
    }
}

impl ReplyConsumer for DirectSyncProducer {}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::correlation::{DefaultMessageCorrelator, MessageCorrelator};

    struct Harness {
        requests: MessageQueue,
        producer: Arc<DirectSyncProducer>,
    }

    #[fixture]
    fn harness() -> Harness {
        let requests = MessageQueue::new("requests");
        let configuration = DirectSyncEndpointConfiguration::builder()
            .queue(requests.clone())
            .timeout(Duration::from_millis(500))
            .polling_interval(Duration::from_millis(10))
            .build()
            .expect("valid configuration");
        Harness {
            requests,
            producer: Arc::new(DirectSyncProducer::new(
                "hello:producer",
                Arc::new(configuration),
            )),
        }
    }

    /// Answer the next request on `requests` with `payload`.
    fn answer_next(requests: MessageQueue, payload: &'static str) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let request = requests
                .receive(Duration::from_secs(5))
                .await
                .expect("request arrives");
            let Some(HeaderValue::Queue(reply_to)) = request.header(headers::REPLY_QUEUE) else {
                panic!("request lacks a reply channel");
            };
            reply_to
                .resolve(&TestContext::new())
                .expect("direct channel")
                .send(Message::new(payload))
                .expect("reply queue open");
        })
    }

    #[rstest]
    #[tokio::test]
    async fn send_waits_for_reply_and_receive_returns_it(harness: Harness) {
        let responder = answer_next(harness.requests.clone(), "<Res/>");
        let context = TestContext::new();
        harness
            .producer
            .send(Message::new("<Req/>"), &context)
            .await
            .expect("reply within timeout");
        responder.await.expect("responder");

        let reply = harness.producer.receive(&context).await.expect("cached reply");
        assert_eq!(reply.payload().as_text(), "<Res/>");
        assert!(harness.producer.correlation_manager().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn explicit_selector_is_the_correlation_key(harness: Harness) {
        let responder = answer_next(harness.requests.clone(), "<Res/>");
        let request = Message::new("<Req/>");
        let key = DefaultMessageCorrelator.correlation_key(&request);
        harness
            .producer
            .send(request, &TestContext::new())
            .await
            .expect("reply within timeout");
        responder.await.expect("responder");

        let reply = harness
            .producer
            .receive_selected(&key, &TestContext::new())
            .await
            .expect("reply by key");
        assert_eq!(reply.payload().as_text(), "<Res/>");
    }

    #[rstest]
    #[tokio::test]
    async fn existing_reply_channel_is_reused(harness: Harness) {
        let reply_queue = MessageQueue::new("fixed-replies");
        let responder = answer_next(harness.requests.clone(), "<Res/>");
        let request = Message::new("<Req/>")
            .with_header(headers::REPLY_QUEUE, QueueRef::Direct(reply_queue.clone()));
        harness
            .producer
            .send(request, &TestContext::new())
            .await
            .expect("reply within timeout");
        responder.await.expect("responder");
        assert!(reply_queue.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn unresolvable_reply_channel_registers_no_key(harness: Harness) {
        let context = TestContext::new();
        let request = Message::new("<Req/>").with_header(headers::REPLY_QUEUE, "unknown");
        let err = harness
            .producer
            .send(request, &context)
            .await
            .expect_err("reply channel cannot be resolved");
        assert!(matches!(err, EndpointError::Resolve(_)));
        assert!(harness.requests.is_empty());

        let err = harness
            .producer
            .receive(&context)
            .await
            .expect_err("no request was sent");
        assert!(matches!(err, EndpointError::MissingCorrelationKey(_)));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn missing_reply_is_a_reply_timeout(harness: Harness) {
        let err = harness
            .producer
            .send(Message::new("<Req/>"), &TestContext::new())
            .await
            .expect_err("nobody answers");
        assert!(matches!(
            err,
            EndpointError::ReplyTimeout { ref destination, timeout_ms: 500, .. } if destination == "requests"
        ));
        assert_eq!(harness.requests.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn receive_before_any_send_reports_missing_key(harness: Harness) {
        let err = harness
            .producer
            .receive(&TestContext::new())
            .await
            .expect_err("nothing sent");
        assert!(matches!(err, EndpointError::MissingCorrelationKey(_)));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn reply_is_collected_only_once(harness: Harness) {
        let responder = answer_next(harness.requests.clone(), "<Res/>");
        let context = TestContext::new();
        harness
            .producer
            .send(Message::new("<Req/>"), &context)
            .await
            .expect("reply within timeout");
        responder.await.expect("responder");

        harness.producer.receive(&context).await.expect("first collect");
        let err = harness
            .producer
            .receive(&context)
            .await
            .expect_err("already collected");
        assert!(matches!(err, EndpointError::ReplyTimeout { .. }));
    }
}
