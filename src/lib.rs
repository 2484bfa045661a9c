//! hsched - Hidden-service crawl scheduler
//!
//! Listens for URLs discovered by crawlers, asks the resource index whether
//! each one was crawled recently enough, and hands the rest to the crawl
//! workers.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`onion`] - Hidden-service URL validation and fingerprints
//! - [`scheduler`] - Refresh policy and the decision engine
//! - [`index`] - Resource index client and in-memory index
//! - [`bus`] - NATS JetStream binding and bounded-concurrency consumer
//! - [`ingress`] - Maps inbound events to ack/nack outcomes
//! - [`egress`] - Publishes schedule requests
//! - [`models`] - Wire events and index records
//! - [`metrics`] - Prometheus metrics
//! - [`server`] - `/health` and `/metrics` endpoints
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hsched::config::Config;
//! use hsched::index::{IndexClient, IndexClientConfig};
//! use hsched::scheduler::{Decision, DecisionEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let index = IndexClient::new(IndexClientConfig::new(&config.index.api_uri))?;
//!     let engine = DecisionEngine::new(Arc::new(index), config.refresh_policy());
//!
//!     if engine.decide("http://example.onion/").await? == Decision::Schedule {
//!         println!("crawl it");
//!     }
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod config;
pub mod egress;
pub mod error;
pub mod index;
pub mod ingress;
pub mod metrics;
pub mod models;
pub mod onion;
pub mod scheduler;
pub mod server;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bus::{Outcome, Publisher, TestBus};
    pub use crate::config::Config;
    pub use crate::egress::Emitter;
    pub use crate::error::{ErrorCategory, HschedErrorTrait};
    pub use crate::index::{InMemoryIndex, IndexClient, ResourceIndex, SearchQuery};
    pub use crate::ingress::IngressAdapter;
    pub use crate::models::{DiscoveredUrlEvent, ScheduleRequestEvent};
    pub use crate::onion::{Fingerprint, OnionUrl};
    pub use crate::scheduler::{Decision, DecisionEngine, RefreshPolicy};
}

// Direct re-exports for convenience
pub use models::{DiscoveredUrlEvent, ScheduleRequestEvent};
