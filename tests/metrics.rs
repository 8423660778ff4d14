#![cfg(feature = "metrics")]
//! Tests for `agenix` metrics helpers.
//!
//! Counters are observed through `metrics_util::debugging::DebuggingRecorder`.
use agenix::metrics::{self, Direction};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn counter_value(snapshotter: &Snapshotter, name: &str, direction: Option<&str>) -> u64 {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(key, _, _, _)| key.key().name() == name)
        .filter(|(key, _, _, _)| {
            direction.is_none_or(|expected| {
                key.key()
                    .labels()
                    .any(|label| label.key() == "direction" && label.value() == expected)
            })
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(count) => count,
            _ => 0,
        })
        .sum()
}

#[rstest]
#[case(Direction::Inbound, "inbound")]
#[case(Direction::Outbound, "outbound")]
fn message_counter_is_labelled_by_direction(#[case] direction: Direction, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    ::metrics::with_local_recorder(&recorder, || metrics::inc_messages(direction));
    assert_eq!(
        counter_value(&snapshotter, metrics::MESSAGES_TOTAL, Some(label)),
        1
    );
}

#[test]
fn timeout_counter_increments() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    ::metrics::with_local_recorder(&recorder, || {
        metrics::inc_timeouts();
        metrics::inc_timeouts();
    });
    assert_eq!(counter_value(&snapshotter, metrics::TIMEOUTS_TOTAL, None), 2);
}

#[test]
fn correlation_miss_counter_increments() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    ::metrics::with_local_recorder(&recorder, metrics::inc_correlation_misses);
    assert_eq!(
        counter_value(&snapshotter, metrics::CORRELATION_MISSES_TOTAL, None),
        1
    );
}

/// A plain send and receive records one outbound and one inbound message.
#[test]
fn endpoint_traffic_is_counted() {
    use std::time::Duration;

    use agenix::{
        context::TestContext,
        endpoint::{Consumer, DirectEndpoint, DirectEndpointConfiguration, Producer},
        message::Message,
        queue::MessageQueue,
    };

    let (snapshotter, recorder) = debugging_recorder_setup();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let configuration = DirectEndpointConfiguration::builder()
        .queue(MessageQueue::new("counted"))
        .timeout(Duration::from_millis(20))
        .build()
        .expect("valid configuration");
    let endpoint = DirectEndpoint::new("counted", configuration);
    let context = TestContext::new();

    ::metrics::with_local_recorder(&recorder, || {
        runtime.block_on(async {
            endpoint
                .producer()
                .send(Message::new("x"), &context)
                .await
                .expect("send");
            endpoint.consumer().receive(&context).await.expect("receive");
            endpoint
                .consumer()
                .receive(&context)
                .await
                .expect_err("queue drained");
        });
    });

    assert_eq!(counter_value(&snapshotter, metrics::MESSAGES_TOTAL, Some("outbound")), 1);
    assert_eq!(counter_value(&snapshotter, metrics::MESSAGES_TOTAL, Some("inbound")), 1);
    assert_eq!(counter_value(&snapshotter, metrics::TIMEOUTS_TOTAL, None), 1);
}
