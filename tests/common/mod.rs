//! Common test utilities

use std::sync::Arc;
use std::time::Duration;

use hsched::bus::TestBus;
use hsched::egress::Emitter;
use hsched::index::InMemoryIndex;
use hsched::ingress::IngressAdapter;
use hsched::models::{DiscoveredUrlEvent, URL_TODO_SUBJECT};
use hsched::scheduler::{DecisionEngine, RefreshPolicy};

/// Scheduler wired to in-memory collaborators
pub struct TestPipeline {
    pub index: Arc<InMemoryIndex>,
    pub bus: Arc<TestBus>,
    pub adapter: Arc<IngressAdapter<Arc<TestBus>>>,
}

impl TestPipeline {
    pub fn new(policy: RefreshPolicy) -> Self {
        let index = Arc::new(InMemoryIndex::new());
        let bus = Arc::new(TestBus::new());
        let adapter = Arc::new(IngressAdapter::new(
            DecisionEngine::new(index.clone(), policy),
            Emitter::new(bus.clone(), URL_TODO_SUBJECT),
        ));

        Self {
            index,
            bus,
            adapter,
        }
    }

    /// Pipeline that never re-crawls indexed URLs
    #[allow(dead_code)]
    pub fn disabled() -> Self {
        Self::new(RefreshPolicy::Disabled)
    }

    /// Pipeline re-crawling URLs after one day
    #[allow(dead_code)]
    pub fn daily() -> Self {
        Self::new(RefreshPolicy::After(Duration::from_secs(86400)))
    }

    /// URLs published to crawl workers, in order
    #[allow(dead_code)]
    pub fn scheduled_urls(&self) -> Vec<String> {
        self.bus
            .messages_for_subject(URL_TODO_SUBJECT)
            .iter()
            .map(|m| {
                self.bus
                    .deserialize_message::<hsched::ScheduleRequestEvent>(m)
                    .unwrap()
                    .url
            })
            .collect()
    }
}

/// Wire payload of a discovered URL event
#[allow(dead_code)]
pub fn found_payload(url: &str) -> Vec<u8> {
    DiscoveredUrlEvent::new(url).to_vec().unwrap()
}
