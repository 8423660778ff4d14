//! In-memory message queues backing direct endpoints.
//!
//! A [`MessageQueue`] is a cloneable handle to a shared, unbounded FIFO
//! buffer. Sends never block. Receives remove the head message, or the first
//! message accepted by a [`MessageSelector`], and may wait up to a timeout for
//! one to arrive. Each queue guards its own buffer; there is no global lock.
//!
//! Waiting receivers re-check the buffer whenever a message is sent and at
//! least once per polling interval, giving up when the timeout measured from
//! the start of the call has elapsed.

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{sync::Notify, time::Instant};
use tracing::debug;

use crate::{
    context::{ResolveError, TestContext},
    message::Message,
    selector::MessageSelector,
};

mod error;

pub use error::QueueError;

/// Upper bound between two buffer checks while a receiver waits.
pub const DEFAULT_QUEUE_POLL: Duration = Duration::from_millis(50);

struct QueueInner {
    name: String,
    buffer: Mutex<VecDeque<Message>>,
    arrivals: Notify,
    closed: AtomicBool,
    polling_interval: Duration,
}

/// Shared handle to an in-memory message queue.
///
/// Clones refer to the same buffer. Two handles compare equal only when they
/// point at the same queue.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use agenix::{message::Message, queue::MessageQueue};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = MessageQueue::new("orders");
/// queue.send(Message::new("first")).expect("queue open");
/// let received = queue.receive(Duration::from_millis(10)).await;
/// assert_eq!(
///     received.map(|m| m.payload().as_text().into_owned()),
///     Some("first".into())
/// );
/// # }
/// ```
#[derive(Clone)]
pub struct MessageQueue(Arc<QueueInner>);

impl MessageQueue {
    /// Create an empty queue polling at [`DEFAULT_QUEUE_POLL`].
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_polling_interval(name, DEFAULT_QUEUE_POLL)
    }

    /// Create an empty queue with a custom polling interval for waiting receivers.
    pub fn with_polling_interval(name: impl Into<String>, polling_interval: Duration) -> Self {
        Self(Arc::new(QueueInner {
            name: name.into(),
            buffer: Mutex::new(VecDeque::new()),
            arrivals: Notify::new(),
            closed: AtomicBool::new(false),
            polling_interval,
        }))
    }

    /// Create a uniquely named queue, used for temporary reply channels.
    #[must_use]
    pub fn temporary() -> Self { Self::new(format!("reply-{}", uuid::Uuid::new_v4())) }

    #[must_use]
    pub fn name(&self) -> &str { &self.0.name }

    #[must_use]
    pub fn polling_interval(&self) -> Duration { self.0.polling_interval }

    fn buffer(&self) -> MutexGuard<'_, VecDeque<Message>> {
        self.0.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `message` to the tail of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the queue has been closed.
    pub fn send(&self, message: Message) -> Result<(), QueueError> {
        let mut buffer = self.buffer();
        // Checked under the buffer lock so nothing is enqueued after `close`.
        if self.is_closed() {
            return Err(QueueError::Closed {
                queue: self.0.name.clone(),
            });
        }
        debug!(queue = %self.0.name, message_id = %message.id(), "message enqueued");
        buffer.push_back(message);
        drop(buffer);
        self.0.arrivals.notify_waiters();
        Ok(())
    }

    /// Remove and return the head message without waiting.
    #[must_use]
    pub fn try_receive(&self) -> Option<Message> { self.buffer().pop_front() }

    /// Remove and return the first message accepted by `selector` without waiting.
    ///
    /// Messages that do not match stay in place and keep their relative order.
    #[must_use]
    pub fn try_receive_matching(&self, selector: &dyn MessageSelector) -> Option<Message> {
        let mut buffer = self.buffer();
        let position = buffer.iter().position(|message| selector.accept(message))?;
        buffer.remove(position)
    }

    /// Remove and return the head message, waiting up to `timeout` for one.
    ///
    /// Returns `None` if the queue is still empty when the timeout elapses.
    pub async fn receive(&self, timeout: Duration) -> Option<Message> {
        self.receive_matching(&|_: &Message| true, timeout).await
    }

    /// Remove and return the first message accepted by `selector`, waiting up
    /// to `timeout` for a match.
    ///
    /// A timeout too large to be represented as a deadline waits indefinitely.
    pub async fn receive_matching(
        &self,
        selector: &dyn MessageSelector,
        timeout: Duration,
    ) -> Option<Message> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            // Register interest before checking so a send between the check
            // and the wait still wakes this receiver.
            let arrival = self.0.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            if let Some(message) = self.try_receive_matching(selector) {
                return Some(message);
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    (deadline - now).min(self.0.polling_interval)
                }
                None => self.0.polling_interval,
            };
            // Elapsed waits simply trigger the next check.
            let _ = tokio::time::timeout(wait, arrival).await;
        }
    }

    /// Remove every message accepted by `selector`, returning how many were dropped.
    pub fn purge(&self, selector: &dyn MessageSelector) -> usize {
        let mut buffer = self.buffer();
        let before = buffer.len();
        buffer.retain(|message| !selector.accept(message));
        let purged = before - buffer.len();
        if purged > 0 {
            debug!(queue = %self.0.name, purged, "messages purged");
        }
        purged
    }

    /// Reject further sends. Pending messages can still be received.
    pub fn close(&self) {
        let buffer = self.buffer();
        self.0.closed.store(true, Ordering::Release);
        drop(buffer);
        self.0.arrivals.notify_waiters();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.0.closed.load(Ordering::Acquire) }

    #[must_use]
    pub fn len(&self) -> usize { self.buffer().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.buffer().is_empty() }
}

impl PartialEq for MessageQueue {
    fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl Eq for MessageQueue {}

impl fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageQueue")
            .field("name", &self.0.name)
            .field("pending", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Reference to a queue: either a live handle or a name to resolve later.
///
/// Endpoint configurations use it for their destination and synchronous
/// requests carry it in the [`reply_queue`](crate::message::headers::REPLY_QUEUE)
/// header as their reply channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueRef {
    Direct(MessageQueue),
    Named(String),
}

impl QueueRef {
    /// Produce a queue handle, looking named queues up through the
    /// context's reference resolver.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] if no resolver is installed or the name does
    /// not resolve to a [`MessageQueue`].
    pub fn resolve(&self, context: &TestContext) -> Result<MessageQueue, ResolveError> {
        match self {
            Self::Direct(queue) => Ok(queue.clone()),
            Self::Named(name) => context.resolve::<MessageQueue>(name),
        }
    }

    /// Name of the referenced queue.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Direct(queue) => queue.name(),
            Self::Named(name) => name,
        }
    }
}

impl fmt::Display for QueueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl From<MessageQueue> for QueueRef {
    fn from(value: MessageQueue) -> Self { Self::Direct(value) }
}

impl From<&str> for QueueRef {
    fn from(value: &str) -> Self { Self::Named(value.to_owned()) }
}

impl From<String> for QueueRef {
    fn from(value: String) -> Self { Self::Named(value) }
}
