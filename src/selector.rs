//! Predicates used to pick specific messages out of a queue.
//!
//! Any `Fn(&Message) -> bool` closure is a [`MessageSelector`]. For string
//! selectors such as `Operation = 'sayHello'`, [`DelegatingSelector`] parses
//! the expression into header and payload comparisons.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    context::{TestContext, VariableError},
    message::Message,
};

/// Key that compares against the textual payload instead of a header.
pub const PAYLOAD_KEY: &str = "payload";

/// Errors raised when parsing selector expressions.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("malformed selector expression '{expression}': {reason}")]
    Malformed {
        expression: String,
        reason: &'static str,
    },
    #[error("failed to expand selector: {0}")]
    Variable(#[from] VariableError),
}

/// Boolean predicate over a [`Message`].
pub trait MessageSelector: Send + Sync {
    /// Returns `true` if `message` should be picked.
    fn accept(&self, message: &Message) -> bool;
}

impl<F> MessageSelector for F
where
    F: Fn(&Message) -> bool + Send + Sync,
{
    fn accept(&self, message: &Message) -> bool { self(message) }
}

/// Accepts messages whose headers match every configured value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderValueSelector {
    expected: HashMap<String, String>,
}

impl HeaderValueSelector {
    /// Require header `name` to render as `value`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.expected.insert(name.into(), value.into());
        self
    }
}

impl MessageSelector for HeaderValueSelector {
    fn accept(&self, message: &Message) -> bool {
        self.expected
            .iter()
            .all(|(name, value)| message.header_text(name).as_deref() == Some(value.as_str()))
    }
}

/// Selector built from a `key = 'value' [AND key = 'value' ...]` expression.
///
/// Each key names a header, except [`PAYLOAD_KEY`] which compares the textual
/// payload. `${name}` placeholders are expanded from the test context first.
///
/// # Examples
///
/// ```
/// use agenix::{
///     context::TestContext,
///     message::Message,
///     selector::{DelegatingSelector, MessageSelector},
/// };
///
/// let context = TestContext::new();
/// context.set_variable("op", "sayHello");
/// let selector = DelegatingSelector::parse("Operation = '${op}'", &context).expect("valid");
/// assert!(selector.accept(&Message::new("").with_header("Operation", "sayHello")));
/// assert!(!selector.accept(&Message::new("").with_header("Operation", "sayBye")));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegatingSelector {
    headers: HeaderValueSelector,
    payload: Option<String>,
}

impl DelegatingSelector {
    /// Parse `expression` after expanding context variables.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::Malformed`] for empty terms, missing `=` or
    /// unbalanced quotes and [`SelectorError::Variable`] if expansion fails.
    pub fn parse(expression: &str, context: &TestContext) -> Result<Self, SelectorError> {
        let expanded = context.replace_dynamic_content(expression)?;
        let malformed = |reason| SelectorError::Malformed {
            expression: expanded.clone(),
            reason,
        };

        let mut headers = HeaderValueSelector::default();
        let mut payload = None;
        for term in split_conjunction(&expanded) {
            let (key, value) = term.split_once('=').ok_or_else(|| malformed("missing '='"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed("empty key"));
            }
            let value = unquote(value.trim()).ok_or_else(|| malformed("unbalanced quotes"))?;
            if key == PAYLOAD_KEY {
                payload = Some(value.to_owned());
            } else {
                headers = headers.with(key, value);
            }
        }
        if headers.expected.is_empty() && payload.is_none() {
            return Err(malformed("no terms"));
        }
        Ok(Self { headers, payload })
    }
}

impl MessageSelector for DelegatingSelector {
    fn accept(&self, message: &Message) -> bool {
        self.payload
            .as_deref()
            .is_none_or(|expected| message.payload().as_text() == expected)
            && self.headers.accept(message)
    }
}

/// Split on the `AND` keyword, ignoring case and anything inside quotes.
fn split_conjunction(expression: &str) -> Vec<&str> {
    let bytes = expression.as_bytes();
    let mut terms = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'\'' {
            in_quotes = !in_quotes;
        } else if !in_quotes && is_and_keyword(bytes, index) {
            terms.push(expression[start..index].trim());
            start = index + 5;
            index = start;
            continue;
        }
        index += 1;
    }
    terms.push(expression[start..].trim());
    terms.into_iter().filter(|term| !term.is_empty()).collect()
}

/// Matches a whitespace-delimited ` AND ` at `index`.
fn is_and_keyword(bytes: &[u8], index: usize) -> bool {
    bytes.len() >= index + 5
        && bytes[index].is_ascii_whitespace()
        && bytes[index + 1..index + 4].eq_ignore_ascii_case(b"and")
        && bytes[index + 4].is_ascii_whitespace()
}

fn unquote(value: &str) -> Option<&str> {
    match (value.starts_with('\''), value.ends_with('\'')) {
        (true, true) if value.len() >= 2 => Some(&value[1..value.len() - 1]),
        (false, false) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::message::headers;

    fn parse(expression: &str) -> Result<DelegatingSelector, SelectorError> {
        DelegatingSelector::parse(expression, &TestContext::new())
    }

    #[rstest]
    #[case("Operation = 'sayHello'", true)]
    #[case("Operation = sayHello", true)]
    #[case("Operation = 'sayHello' AND lang = 'en'", true)]
    #[case("Operation = 'sayHello' and lang = 'de'", false)]
    #[case("payload = '<Req/>'", true)]
    #[case("payload = '<Res/>' AND Operation = 'sayHello'", false)]
    fn evaluates_expressions(#[case] expression: &str, #[case] expected: bool) {
        let message = Message::new("<Req/>")
            .with_header("Operation", "sayHello")
            .with_header("lang", "en");
        let selector = parse(expression).expect("valid expression");
        assert_eq!(selector.accept(&message), expected);
    }

    #[test]
    fn quoted_and_is_not_a_separator() {
        let message = Message::new("").with_header("title", "salt AND pepper");
        let selector = parse("title = 'salt AND pepper'").expect("valid expression");
        assert!(selector.accept(&message));
    }

    #[test]
    fn correlation_key_format_selects_by_identifier() {
        let message = Message::new("");
        let expression = format!("{} = '{}'", headers::MESSAGE_ID, message.id());
        assert!(parse(&expression).expect("valid").accept(&message));
        assert!(!parse(&expression).expect("valid").accept(&Message::new("")));
    }

    #[rstest]
    #[case("")]
    #[case("Operation")]
    #[case(" = 'x'")]
    #[case("Operation = 'open")]
    fn rejects_malformed_expressions(#[case] expression: &str) {
        assert!(matches!(
            parse(expression),
            Err(SelectorError::Malformed { .. })
        ));
    }

    #[test]
    fn closures_are_selectors() {
        let selector = |m: &Message| m.payload().as_text().starts_with("<Req");
        assert!(selector.accept(&Message::new("<Req/>")));
    }
}
