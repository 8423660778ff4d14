//! Background replier for synchronous endpoints.

use std::{sync::Arc, time::Duration};

use agenix::{
    context::TestContext,
    endpoint::{Consumer, DirectSyncConsumer, Producer},
    message::Message,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How the [`Responder`] answers each request.
#[derive(Debug, Clone, Default)]
pub enum ResponderMode {
    /// Reply with the request payload.
    #[default]
    Echo,
    /// Reply with a fixed payload.
    Fixed(String),
    /// Receive requests but never reply.
    Silent,
}

/// Interval after which an idle receive is retried, so cancellation is seen.
const IDLE_RECEIVE: Duration = Duration::from_millis(100);

/// Answers requests arriving at a [`DirectSyncConsumer`] until stopped.
///
/// Any receive failure other than a timeout ends the task, since a
/// misconfigured or unresolvable endpoint fails the same way on every retry.
pub struct Responder {
    shutdown: CancellationToken,
    handle: JoinHandle<usize>,
}

impl Responder {
    /// Spawn the responder on the current runtime.
    #[must_use]
    pub fn spawn(consumer: Arc<DirectSyncConsumer>, context: TestContext, mode: ResponderMode) -> Self {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut answered = 0;
            loop {
                let request = tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    received = consumer.receive_timeout(&context, IDLE_RECEIVE) => received,
                };
                let request = match request {
                    Ok(request) => request,
                    Err(error) if error.is_timeout() => continue,
                    Err(error) => {
                        warn!(%error, "responder stopped: cannot receive requests");
                        break;
                    }
                };
                let payload = match &mode {
                    ResponderMode::Echo => request.payload().clone(),
                    ResponderMode::Fixed(payload) => payload.clone().into(),
                    ResponderMode::Silent => continue,
                };
                match consumer.send(Message::new(payload), &context).await {
                    Ok(()) => answered += 1,
                    Err(error) => warn!(%error, "responder failed to send reply"),
                }
            }
            answered
        });
        Self { shutdown, handle }
    }

    /// Stop the responder and return how many requests it answered.
    pub async fn stop(self) -> usize {
        self.shutdown.cancel();
        self.handle.await.unwrap_or_default()
    }
}
