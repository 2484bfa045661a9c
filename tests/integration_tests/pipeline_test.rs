//! Pipeline integration tests
//!
//! Drives `url.found` payloads through the consumer loop, the ingress adapter,
//! the decision engine and the emitter, then inspects what reached `url.todo`.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::sync::watch;

use hsched::bus::consumer;
use hsched::bus::memory::TestDelivery;
use hsched::bus::{BusError, Outcome};
use hsched::onion::OnionUrl;

use super::fixtures::{ONION_URLS, REJECTED_URLS};
use crate::common::{found_payload, TestPipeline};

async fn consume(pipeline: &TestPipeline, urls: &[&str]) -> Vec<Outcome> {
    let payloads: Vec<Vec<u8>> = urls.iter().map(|u| found_payload(u)).collect();
    let (deliveries, settlements) = TestDelivery::batch(&payloads);
    let (_tx, rx) = watch::channel(false);

    consumer::run(
        futures::stream::iter(deliveries.into_iter().map(Ok::<_, BusError>)),
        pipeline.adapter.clone(),
        4,
        rx,
    )
    .await;

    payloads
        .iter()
        .map(|p| settlements.outcome_for(p).expect("every delivery is settled"))
        .collect()
}

#[tokio::test]
async fn test_unknown_url_is_scheduled() {
    let pipeline = TestPipeline::disabled();

    let outcomes = consume(&pipeline, &["http://abc.onion/x"]).await;

    assert_eq!(outcomes, vec![Outcome::Ack]);
    assert_eq!(pipeline.scheduled_urls(), vec!["http://abc.onion/x"]);
}

#[tokio::test]
async fn test_indexed_url_is_not_scheduled_when_refresh_disabled() {
    let pipeline = TestPipeline::disabled();
    pipeline
        .index
        .insert("http://abc.onion/x", Utc::now() - ChronoDuration::days(365));

    let outcomes = consume(&pipeline, &["http://abc.onion/x"]).await;

    assert_eq!(outcomes, vec![Outcome::Ack]);
    assert!(pipeline.scheduled_urls().is_empty());
}

#[tokio::test]
async fn test_stale_url_is_rescheduled() {
    let pipeline = TestPipeline::daily();
    pipeline
        .index
        .insert("http://abc.onion/x", Utc::now() - ChronoDuration::days(2));

    consume(&pipeline, &["http://abc.onion/x"]).await;

    assert_eq!(pipeline.scheduled_urls(), vec!["http://abc.onion/x"]);
}

#[tokio::test]
async fn test_fresh_url_is_not_rescheduled() {
    let pipeline = TestPipeline::daily();
    pipeline
        .index
        .insert("http://abc.onion/x", Utc::now() - ChronoDuration::hours(1));

    consume(&pipeline, &["http://abc.onion/x"]).await;

    assert!(pipeline.scheduled_urls().is_empty());
}

#[tokio::test]
async fn test_normalized_variants_share_index_entry() {
    let pipeline = TestPipeline::disabled();
    pipeline.index.insert("http://abc.onion/", Utc::now());

    // Same resource once normalized: nothing to schedule
    consume(
        &pipeline,
        &["HTTP://ABC.onion", "http://abc.onion:80/", "http://abc.onion/#top"],
    )
    .await;

    assert!(pipeline.scheduled_urls().is_empty());
}

#[tokio::test]
async fn test_scheduled_payload_keeps_original_url() {
    let pipeline = TestPipeline::disabled();

    consume(&pipeline, &["HTTP://Abc.ONION/Page#frag"]).await;

    assert_eq!(pipeline.scheduled_urls(), vec!["HTTP://Abc.ONION/Page#frag"]);
}

#[tokio::test]
async fn test_only_hidden_services_reach_the_index() {
    let pipeline = TestPipeline::disabled();
    let mut urls: Vec<&str> = ONION_URLS.to_vec();
    urls.extend_from_slice(REJECTED_URLS);

    let outcomes = consume(&pipeline, &urls).await;

    assert!(outcomes.iter().all(|o| *o == Outcome::Ack));
    assert_eq!(pipeline.index.query_count(), ONION_URLS.len());

    let mut scheduled = pipeline.scheduled_urls();
    scheduled.sort();
    let mut expected: Vec<String> = ONION_URLS.iter().map(|u| u.to_string()).collect();
    expected.sort();
    assert_eq!(scheduled, expected);
}

#[tokio::test]
async fn test_queries_use_fingerprint_and_single_result() {
    let pipeline = TestPipeline::daily();

    consume(&pipeline, &["http://abc.onion/x"]).await;

    let queries = pipeline.index.queries();
    assert_eq!(queries.len(), 1);
    let expected = OnionUrl::parse("http://abc.onion/x").unwrap().fingerprint();
    assert_eq!(queries[0].url.as_deref(), Some(expected.as_str()));
    assert_eq!(queries[0].page, 1);
    assert_eq!(queries[0].page_size, 1);
    assert!(queries[0].start_date.is_some());
}

#[tokio::test]
async fn test_duplicate_discoveries_each_decided() {
    let pipeline = TestPipeline::disabled();

    // No shared state between decisions: both are scheduled until indexed
    consume(&pipeline, &["http://abc.onion/x", "http://abc.onion/x"]).await;
    assert_eq!(pipeline.scheduled_urls().len(), 2);

    pipeline.index.insert("http://abc.onion/x", Utc::now());
    pipeline.bus.clear();
    consume(&pipeline, &["http://abc.onion/x"]).await;
    assert!(pipeline.scheduled_urls().is_empty());
}

#[tokio::test]
async fn test_adapter_shared_across_tasks() {
    let pipeline = Arc::new(TestPipeline::disabled());

    let mut handles = Vec::new();
    for i in 0..8 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let url = format!("http://site{i}.onion/");
            consume(&pipeline, &[url.as_str()]).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), vec![Outcome::Ack]);
    }

    assert_eq!(pipeline.bus.publish_count(), 8);
}
