//! Utilities for driving `agenix` endpoints in tests.
//!
//! [`Responder`] plays the replying side of a synchronous exchange in a
//! background task, and [`logging`] serialises access to a captured logger.
//!
//! ```rust,no_run
//! use agenix::{DirectSyncEndpoint, TestContext};
//! use agenix_testing::{Responder, ResponderMode};
//!
//! # async fn example(endpoint: &DirectSyncEndpoint) {
//! let responder = Responder::spawn(endpoint.consumer(), TestContext::new(), ResponderMode::Echo);
//! // ... drive the producer ...
//! let answered = responder.stop().await;
//! # let _ = answered;
//! # }
//! ```

pub mod logging;
pub mod responder;

pub use logging::{LoggerHandle, logger};
pub use responder::{Responder, ResponderMode};
