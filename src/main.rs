//! Minimal binary demonstrating `agenix` usage.
//!
//! Sends one request through a [`DirectSyncEndpoint`] while a background task
//! answers it, then prints the correlated reply.

mod cli;

use std::time::Duration;

use agenix::{
    context::TestContext,
    endpoint::{
        Consumer,
        DirectSyncEndpoint,
        DirectSyncEndpointConfiguration,
        Producer,
    },
    message::Message,
    queue::MessageQueue,
};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Enable structured logging for the demo. Applications embedding the
    // library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let timeout = Duration::from_millis(cli.timeout_ms);
    let configuration = DirectSyncEndpointConfiguration::builder()
        .queue(MessageQueue::new("demo"))
        .timeout(timeout)
        .polling_interval(Duration::from_millis(cli.polling_interval_ms))
        .build()?;
    let endpoint = DirectSyncEndpoint::new("demo", configuration);

    let consumer = endpoint.consumer();
    let reply = cli.reply.clone();
    let responder = tokio::spawn(async move {
        let context = TestContext::new();
        let request = consumer.receive(&context).await?;
        let payload = reply.unwrap_or_else(|| request.payload().as_text().into_owned());
        consumer.send(Message::new(payload), &context).await
    });

    let context = TestContext::new();
    let producer = endpoint.producer();
    producer.send(Message::new(cli.request), &context).await?;
    responder.await??;

    let reply = producer.receive(&context).await?;
    info!(message_id = %reply.id(), "reply collected");
    println!("{}", reply.payload().as_text());
    Ok(())
}
