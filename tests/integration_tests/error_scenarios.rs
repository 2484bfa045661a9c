//! Error scenario tests
//!
//! Infrastructure failures must leave the inbound event for redelivery;
//! malformed payloads must be dropped for good.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

use hsched::bus::consumer;
use hsched::bus::memory::TestDelivery;
use hsched::bus::{BusError, MessageHandler, Outcome};
use hsched::index::IndexError;

use super::fixtures::MALFORMED_PAYLOADS;
use crate::common::{found_payload, TestPipeline};

#[tokio::test]
async fn test_index_unreachable_nacks() {
    let pipeline = TestPipeline::disabled();
    pipeline
        .index
        .fail_with(IndexError::Network("connection refused".into()));

    let outcome = pipeline.adapter.handle(&found_payload("http://abc.onion/")).await;

    assert_eq!(outcome, Outcome::Nack);
    assert_eq!(pipeline.bus.publish_count(), 0);
}

#[tokio::test]
async fn test_index_client_error_still_nacks() {
    let pipeline = TestPipeline::disabled();
    pipeline.index.fail_with(IndexError::Http {
        status: 400,
        message: "bad request".into(),
    });

    let outcome = pipeline.adapter.handle(&found_payload("http://abc.onion/")).await;

    // The bus's delivery limit bounds the redeliveries
    assert_eq!(outcome, Outcome::Nack);
}

#[tokio::test]
async fn test_redelivery_after_recovery_schedules() {
    let pipeline = TestPipeline::disabled();
    let payload = found_payload("http://abc.onion/");

    pipeline.index.fail_with(IndexError::Network("timeout".into()));
    assert_eq!(pipeline.adapter.handle(&payload).await, Outcome::Nack);

    pipeline.index.recover();
    assert_eq!(pipeline.adapter.handle(&payload).await, Outcome::Ack);
    assert_eq!(pipeline.scheduled_urls(), vec!["http://abc.onion/"]);
}

#[tokio::test]
async fn test_publish_failure_nacks_then_recovers() {
    let pipeline = TestPipeline::disabled();
    let payload = found_payload("http://abc.onion/");

    pipeline.bus.fail_publishes("no responders");
    assert_eq!(pipeline.adapter.handle(&payload).await, Outcome::Nack);
    assert_eq!(pipeline.bus.publish_count(), 0);

    pipeline.bus.recover();
    assert_eq!(pipeline.adapter.handle(&payload).await, Outcome::Ack);
    assert_eq!(pipeline.bus.publish_count(), 1);
}

#[tokio::test]
async fn test_index_failure_on_known_url_nacks() {
    let pipeline = TestPipeline::disabled();
    pipeline.index.insert("http://abc.onion/", Utc::now());
    pipeline.index.fail_with(IndexError::Network("down".into()));

    // Without an answer the scheduler cannot know the URL is indexed
    let outcome = pipeline.adapter.handle(&found_payload("http://abc.onion/")).await;
    assert_eq!(outcome, Outcome::Nack);
}

#[tokio::test]
async fn test_malformed_payloads_are_rejected() {
    let pipeline = TestPipeline::disabled();

    for payload in MALFORMED_PAYLOADS {
        let outcome = pipeline.adapter.handle(payload.as_bytes()).await;
        assert_eq!(outcome, Outcome::Reject, "payload {payload:?}");
    }

    assert_eq!(pipeline.index.query_count(), 0);
    assert_eq!(pipeline.bus.publish_count(), 0);
}

#[tokio::test]
async fn test_mixed_batch_settles_each_delivery() {
    let pipeline = TestPipeline::disabled();
    pipeline.index.insert("http://known.onion/", Utc::now());

    let payloads: Vec<Vec<u8>> = vec![
        found_payload("http://new.onion/"),
        found_payload("http://known.onion/"),
        found_payload("http://example.com/"),
        b"{broken".to_vec(),
    ];
    let (deliveries, settlements) = TestDelivery::batch(&payloads);
    let (_tx, rx) = watch::channel(false);

    let stats = consumer::run(
        futures::stream::iter(deliveries.into_iter().map(Ok::<_, BusError>)),
        Arc::clone(&pipeline.adapter),
        2,
        rx,
    )
    .await;

    assert_eq!(stats.acked, 3);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.nacked, 0);
    assert_eq!(settlements.outcome_for(b"{broken"), Some(Outcome::Reject));
    assert_eq!(pipeline.scheduled_urls(), vec!["http://new.onion/"]);
}
