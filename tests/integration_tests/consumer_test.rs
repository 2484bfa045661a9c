//! Consumer loop tests with the real ingress adapter
//!
//! Covers bounded concurrency against a slow index and the shutdown drain.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use hsched::bus::consumer;
use hsched::bus::memory::TestDelivery;
use hsched::bus::{BusError, Outcome, TestBus};
use hsched::egress::Emitter;
use hsched::index::{InMemoryIndex, IndexError, ResourceIndex, SearchPage, SearchQuery};
use hsched::ingress::IngressAdapter;
use hsched::models::URL_TODO_SUBJECT;
use hsched::scheduler::{DecisionEngine, RefreshPolicy};

use crate::common::found_payload;

/// Index that takes a while to answer and tracks overlapping searches
struct SlowIndex {
    inner: InMemoryIndex,
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowIndex {
    fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryIndex::new(),
            delay,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ResourceIndex for SlowIndex {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, IndexError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.inner.search(query).await
    }
}

fn adapter(index: Arc<SlowIndex>, bus: &Arc<TestBus>) -> Arc<IngressAdapter<Arc<TestBus>>> {
    Arc::new(IngressAdapter::new(
        DecisionEngine::new(index, RefreshPolicy::Disabled),
        Emitter::new(bus.clone(), URL_TODO_SUBJECT),
    ))
}

#[tokio::test]
async fn test_in_flight_decisions_are_bounded() {
    let index = Arc::new(SlowIndex::new(Duration::from_millis(20)));
    let bus = Arc::new(TestBus::new());
    let payloads: Vec<Vec<u8>> = (0..12)
        .map(|i| found_payload(&format!("http://site{i}.onion/")))
        .collect();
    let (deliveries, settlements) = TestDelivery::batch(&payloads);
    let (_tx, rx) = watch::channel(false);

    let stats = consumer::run(
        futures::stream::iter(deliveries.into_iter().map(Ok::<_, BusError>)),
        adapter(index.clone(), &bus),
        3,
        rx,
    )
    .await;

    assert_eq!(stats.acked, 12);
    assert_eq!(settlements.outcomes().len(), 12);
    assert!(index.peak.load(Ordering::SeqCst) <= 3);
    assert!(index.peak.load(Ordering::SeqCst) > 1, "decisions should overlap");
    assert_eq!(bus.publish_count(), 12);
}

#[tokio::test]
async fn test_shutdown_settles_in_flight_messages() {
    let index = Arc::new(SlowIndex::new(Duration::from_millis(50)));
    let bus = Arc::new(TestBus::new());
    let payloads = vec![
        found_payload("http://one.onion/"),
        found_payload("http://two.onion/"),
    ];
    let (deliveries, settlements) = TestDelivery::batch(&payloads);
    let (tx, rx) = watch::channel(false);

    let stream = futures::stream::iter(deliveries.into_iter().map(Ok::<_, BusError>))
        .chain(futures::stream::pending::<Result<TestDelivery, BusError>>());

    let task = tokio::spawn(consumer::run(stream, adapter(index, &bus), 4, rx));

    // Both decisions are in flight when shutdown arrives
    tokio::time::sleep(Duration::from_millis(10)).await;
    tx.send(true).unwrap();

    let stats = task.await.unwrap();
    assert_eq!(stats.acked, 2);
    assert_eq!(settlements.outcomes(), vec![Outcome::Ack, Outcome::Ack]);
    assert_eq!(bus.publish_count(), 2);
}
