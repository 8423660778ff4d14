//! Shared utilities for integration tests.
//!
//! Provides fixtures for synchronous endpoints wired to a fresh request queue
//! and a resolver-backed test context.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{sync::Arc, time::Duration};

use agenix::{
    context::{SimpleReferenceResolver, TestContext},
    endpoint::{DirectSyncEndpoint, DirectSyncEndpointConfiguration},
    queue::MessageQueue,
};
use rstest::fixture;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A synchronous endpoint together with the queue carrying its requests.
pub struct SyncHarness {
    pub requests: MessageQueue,
    pub endpoint: DirectSyncEndpoint,
}

/// Build a synchronous endpoint named `name` with the given timeout.
#[allow(
    clippy::expect_used,
    reason = "a non-zero timeout and polling interval always form a valid configuration"
)]
pub fn sync_harness_with(name: &str, timeout: Duration) -> SyncHarness {
    let requests = MessageQueue::new(format!("{name}.requests"));
    let configuration = DirectSyncEndpointConfiguration::builder()
        .queue(requests.clone())
        .timeout(timeout)
        .polling_interval(Duration::from_millis(10))
        .build()
        .expect("valid configuration");
    SyncHarness {
        requests,
        endpoint: DirectSyncEndpoint::new(name, configuration),
    }
}

#[fixture]
pub fn sync_harness() -> SyncHarness { sync_harness_with("hello", Duration::from_secs(2)) }

/// Context whose resolver knows `queue` under its own name.
pub fn context_with_queue(queue: &MessageQueue) -> TestContext {
    let resolver = SimpleReferenceResolver::default();
    resolver.bind(queue.name().to_owned(), queue.clone());
    TestContext::new().with_reference_resolver(Arc::new(resolver))
}
