//! Step definitions for synchronous exchange behavioural tests.

use agenix::endpoint::EndpointError;
use cucumber::{given, then, when};

use crate::world::SyncExchangeWorld;

#[given(expr = "a synchronous endpoint {string} with a {int} ms timeout")]
fn given_endpoint(world: &mut SyncExchangeWorld, name: String, timeout_ms: u64) {
    world.configure(&name, timeout_ms);
}

#[given(expr = "a background consumer replying {string}")]
fn given_responder(world: &mut SyncExchangeWorld, payload: String) { world.start_responder(&payload); }

#[when(expr = "the producer sends {string}")]
async fn when_send(world: &mut SyncExchangeWorld, payload: String) { world.send_request(&payload).await; }

#[when(expr = "the consumer replies {string} without a request")]
async fn when_reply(world: &mut SyncExchangeWorld, payload: String) {
    world.reply_without_request(&payload).await;
}

#[then(expr = "the producer receives a reply with payload {string}")]
async fn then_reply(world: &mut SyncExchangeWorld, payload: String) {
    let reply = world.collect_reply().await;
    assert_eq!(reply.payload().as_text(), payload);
}

#[then("the reply fails because the correlation key is not yet available")]
fn then_missing_key(world: &mut SyncExchangeWorld) {
    let error = world.failure();
    assert!(matches!(error, EndpointError::MissingCorrelationKey(_)), "{error}");
    assert!(error.to_string().contains("correlation key not yet available"));
}

#[then("the send fails with a reply timeout")]
fn then_reply_timeout(world: &mut SyncExchangeWorld) {
    let error = world.failure();
    assert!(matches!(error, EndpointError::ReplyTimeout { .. }), "{error}");
    assert!(error.is_timeout());
}
