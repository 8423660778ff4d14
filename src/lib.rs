#![doc(html_root_url = "https://docs.rs/agenix/latest")]
//! Public API for the `agenix` library.
//!
//! This crate provides the asynchronous request/reply messaging core of an
//! integration-test automation framework: in-memory queues, selectors,
//! correlation of replies with requests, and the direct endpoints that tie
//! them together.

pub mod context;
pub mod correlation;
pub mod endpoint;
pub mod message;
pub mod metrics;
pub mod prelude;
pub mod queue;
pub mod selector;

pub use context::{ReferenceResolver, SimpleReferenceResolver, TestContext};
pub use correlation::{CorrelationManager, DefaultMessageCorrelator, MessageCorrelator};
/// Result type alias re-exported for convenience when driving endpoints.
pub use endpoint::Result;
pub use endpoint::{DirectEndpoint, DirectSyncEndpoint, EndpointError};
pub use message::{HeaderValue, Message, MessageId, Payload};
pub use queue::{MessageQueue, QueueRef};
pub use selector::{DelegatingSelector, MessageSelector};
