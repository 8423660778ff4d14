//! Optional convenience imports for common `agenix` workflows.
//!
//! This module is intentionally small and focused on high-frequency types.
//! Prefer importing specialised APIs directly from their owning modules.
//!
//! # Examples
//!
//! ```rust,no_run
//! use agenix::prelude::*;
//!
//! async fn request(endpoint: &DirectSyncEndpoint, context: &TestContext) -> Result<Message> {
//!     endpoint.producer().send(Message::new("<Req/>"), context).await?;
//!     endpoint.producer().receive(context).await
//! }
//! ```

pub use crate::{
    context::TestContext,
    endpoint::{
        Consumer,
        DirectEndpoint,
        DirectEndpointConfiguration,
        DirectSyncEndpoint,
        DirectSyncEndpointConfiguration,
        Endpoint,
        EndpointError,
        Producer,
        Result,
        SelectiveConsumer,
    },
    message::Message,
    queue::MessageQueue,
};
