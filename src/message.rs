//! Logical messages exchanged through endpoints.
//!
//! A [`Message`] carries an immutable [`MessageId`], an untyped [`Payload`]
//! and a set of named [`HeaderValue`]s. Header names are case-sensitive.
//! Processors may mutate payload and headers before a message is handed to a
//! producer, but the identifier never changes once the message exists.

use std::{borrow::Cow, collections::HashMap, time::SystemTime};

use bytes::Bytes;
use derive_more::{Display, From, Into};
use tracing::warn;

use crate::queue::QueueRef;

/// Reserved header names understood by the messaging core.
pub mod headers {
    /// Pseudo-header resolving to the message identifier.
    pub const MESSAGE_ID: &str = "message_id";
    /// Header carrying the reply channel of a synchronous request.
    pub const REPLY_QUEUE: &str = "reply_queue";
    /// Prefix of the context variable holding a role's current correlation key.
    pub const CORRELATION_KEY_PREFIX: &str = "agenix_message_correlator_";
}

/// Globally unique identifier assigned to a [`Message`] on creation.
///
/// # Examples
///
/// ```
/// use agenix::message::MessageId;
///
/// assert_ne!(MessageId::random(), MessageId::random());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self { Self(uuid::Uuid::new_v4().to_string()) }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

/// Untyped message body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Payload {
    #[default]
    Empty,
    Text(String),
    Binary(Bytes),
}

impl Payload {
    /// Render the payload as text.
    ///
    /// Binary payloads are decoded lossily as UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Text(text) => Cow::Borrowed(text),
            Self::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// Returns `true` when no body is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self { Self::Text(value.to_owned()) }
}

impl From<String> for Payload {
    fn from(value: String) -> Self { Self::Text(value) }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self { Self::Binary(Bytes::from(value)) }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self { Self::Binary(value) }
}

/// Value stored under a message header.
///
/// Most headers are plain scalars. [`HeaderValue::Queue`] carries a reply
/// channel, either as a live queue handle or as a name to be resolved by the
/// receiver.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Queue(QueueRef),
}

impl HeaderValue {
    /// Render the header as a string for selector matching and logging.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Integer(value) => Cow::Owned(value.to_string()),
            Self::Boolean(value) => Cow::Owned(value.to_string()),
            Self::Queue(queue) => Cow::Owned(queue.to_string()),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self { Self::Text(value.to_owned()) }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self { Self::Text(value) }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self { Self::Integer(value) }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self { Self::Boolean(value) }
}

impl From<QueueRef> for HeaderValue {
    fn from(value: QueueRef) -> Self { Self::Queue(value) }
}

/// A unit of data travelling through queues and endpoints.
///
/// # Examples
///
/// ```
/// use agenix::message::{Message, headers};
///
/// let message = Message::new("<Req/>").with_header("Operation", "sayHello");
/// assert_eq!(message.payload().as_text(), "<Req/>");
/// assert_eq!(message.header_text("Operation").as_deref(), Some("sayHello"));
/// assert_eq!(
///     message.header_text(headers::MESSAGE_ID).as_deref(),
///     Some(message.id().as_str())
/// );
/// ```
#[derive(Clone, Debug)]
pub struct Message {
    id: MessageId,
    name: Option<String>,
    timestamp: SystemTime,
    payload: Payload,
    headers: HashMap<String, HeaderValue>,
}

impl Default for Message {
    fn default() -> Self { Self::new(Payload::Empty) }
}

impl Message {
    /// Create a message with a fresh identifier and no headers.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            id: MessageId::random(),
            name: None,
            timestamp: SystemTime::now(),
            payload: payload.into(),
            headers: HashMap::new(),
        }
    }

    /// Attach a header, replacing any existing value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Replace the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Give the message a logical name used in logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &MessageId { &self.id }

    #[must_use]
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }

    #[must_use]
    pub fn timestamp(&self) -> SystemTime { self.timestamp }

    #[must_use]
    pub fn payload(&self) -> &Payload { &self.payload }

    pub fn set_payload(&mut self, payload: impl Into<Payload>) { self.payload = payload.into(); }

    /// Insert or overwrite a header.
    ///
    /// [`headers::MESSAGE_ID`] is reserved for the identifier and cannot be
    /// set; such a call is logged and ignored.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) {
        let name = name.into();
        if name == headers::MESSAGE_ID {
            warn!(message_id = %self.id, "ignoring attempt to set the reserved message id header");
            return;
        }
        self.headers.insert(name, value.into());
    }

    /// Remove a header, returning its previous value.
    pub fn remove_header(&mut self, name: &str) -> Option<HeaderValue> { self.headers.remove(name) }

    /// Look up a header by exact name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&HeaderValue> { self.headers.get(name) }

    /// Render a header as text.
    ///
    /// The reserved [`headers::MESSAGE_ID`] name resolves to the identifier
    /// so correlation keys can be evaluated as selectors.
    #[must_use]
    pub fn header_text(&self, name: &str) -> Option<Cow<'_, str>> {
        if name == headers::MESSAGE_ID {
            return Some(Cow::Borrowed(self.id.as_str()));
        }
        self.headers.get(name).map(HeaderValue::as_text)
    }

    /// Iterate over all headers in unspecified order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.headers.iter().map(|(name, value)| (name.as_str(), value))
    }
}
