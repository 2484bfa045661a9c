//! Core data structures and types
//!
//! Wire events exchanged over the bus and the records returned by the
//! resource index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subject on which upstream extractors announce discovered URLs
pub const URL_FOUND_SUBJECT: &str = "url.found";

/// Subject on which crawl workers receive URLs to fetch
pub const URL_TODO_SUBJECT: &str = "url.todo";

/// Consumer group shared by every scheduler instance
pub const SCHEDULER_GROUP: &str = "schedulers";

/// A URL discovered by an upstream crawler or extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredUrlEvent {
    pub url: String,
}

/// Request for crawl workers to fetch a URL
///
/// Same shape as [`DiscoveredUrlEvent`] but published on a distinct subject so
/// that scheduled URLs never loop back into the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequestEvent {
    pub url: String,
}

impl DiscoveredUrlEvent {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Decode an event from a raw bus payload
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl ScheduleRequestEvent {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// A previously crawled resource as stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Resource URL as indexed
    pub url: String,

    /// When the resource was indexed
    pub time: DateTime<Utc>,

    /// Page title, when the indexer extracted one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ResourceRecord {
    pub fn new(url: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            time,
            title: None,
        }
    }
}
