//! Correlation of replies with the requests that triggered them.
//!
//! A [`MessageCorrelator`] derives a deterministic correlation key from a
//! message, so the requesting and replying sides compute the same key
//! independently. The [`CorrelationManager`] stores replies or reply channels
//! under those keys and hands each one out at most once.

use crate::message::{Message, headers};

mod manager;

pub use manager::{CorrelationError, CorrelationManager, DEFAULT_POLLING_INTERVAL};

/// Derives correlation keys from messages and key names from endpoint roles.
pub trait MessageCorrelator: Send + Sync {
    /// Correlation key identifying the exchange `message` belongs to.
    fn correlation_key(&self, message: &Message) -> String;

    /// Context variable name holding the current correlation key of `role`.
    fn correlation_key_name(&self, role: &str) -> String {
        format!("{}{role}", headers::CORRELATION_KEY_PREFIX)
    }
}

/// Correlates on the message identifier.
///
/// Keys have the form `message_id = '<id>'`, which doubles as a selector
/// expression.
///
/// # Examples
///
/// ```
/// use agenix::{
///     correlation::{DefaultMessageCorrelator, MessageCorrelator},
///     message::Message,
/// };
///
/// let message = Message::new("<Req/>");
/// let key = DefaultMessageCorrelator.correlation_key(&message);
/// assert_eq!(key, format!("message_id = '{}'", message.id()));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultMessageCorrelator;

impl MessageCorrelator for DefaultMessageCorrelator {
    fn correlation_key(&self, message: &Message) -> String {
        format!("{} = '{}'", headers::MESSAGE_ID, message.id())
    }
}

/// Correlates on the value of a chosen header.
///
/// Messages lacking the header get an empty value, so every such message
/// shares one key.
#[derive(Clone, Debug)]
pub struct HeaderCorrelator {
    header: String,
}

impl HeaderCorrelator {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl MessageCorrelator for HeaderCorrelator {
    fn correlation_key(&self, message: &Message) -> String {
        let value = message.header_text(&self.header).unwrap_or_default();
        format!("{} = '{value}'", self.header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_key_is_deterministic() {
        let message = Message::new("x");
        let correlator = DefaultMessageCorrelator;
        assert_eq!(
            correlator.correlation_key(&message),
            correlator.correlation_key(&message.clone())
        );
    }

    #[test]
    fn distinct_messages_get_distinct_keys() {
        let correlator = DefaultMessageCorrelator;
        assert_ne!(
            correlator.correlation_key(&Message::new("x")),
            correlator.correlation_key(&Message::new("x"))
        );
    }

    #[test]
    fn key_name_prefixes_role() {
        assert_eq!(
            DefaultMessageCorrelator.correlation_key_name("orders:producer"),
            "agenix_message_correlator_orders:producer"
        );
    }

    #[test]
    fn header_correlator_uses_header_value() {
        let correlator = HeaderCorrelator::new("conversation");
        let message = Message::new("x").with_header("conversation", "c-1");
        assert_eq!(correlator.correlation_key(&message), "conversation = 'c-1'");
        assert_eq!(correlator.correlation_key(&Message::new("y")), "conversation = ''");
    }
}
