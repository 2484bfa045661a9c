//! Resource index access
//!
//! The resource index is the external system of record for everything that has
//! already been crawled. The scheduler only ever asks it one question: "is there
//! a record for this fingerprint inside this time window?".
//!
//! - [`ResourceIndex`] - the search seam
//! - [`client::IndexClient`] - HTTP implementation against the index API
//! - [`memory::InMemoryIndex`] - in-process implementation for tests and dry runs

pub mod client;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::ResourceRecord;

pub use client::{IndexClient, IndexClientConfig};
pub use memory::InMemoryIndex;

/// Search parameters understood by the index
///
/// Time bounds filter on the instant a resource was indexed:
/// `start_date` is exclusive (strictly after), `end_date` is inclusive.
/// `None` leaves that side of the range unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Fingerprint of the resource URL
    pub url: Option<String>,

    /// Free-text category filter
    pub keyword: Option<String>,

    /// Only records indexed strictly after this instant
    pub start_date: Option<DateTime<Utc>>,

    /// Only records indexed at or before this instant
    pub end_date: Option<DateTime<Utc>>,

    /// 1-based page number
    pub page: u32,

    /// Results per page
    pub page_size: u32,
}

impl SearchQuery {
    /// Query a single fingerprint, first page, one result
    pub fn by_fingerprint(fingerprint: impl Into<String>) -> Self {
        Self {
            url: Some(fingerprint.into()),
            keyword: None,
            start_date: None,
            end_date: None,
            page: 1,
            page_size: 1,
        }
    }

    /// Restrict to records indexed strictly after `start`
    pub fn indexed_after(mut self, start: Option<DateTime<Utc>>) -> Self {
        self.start_date = start;
        self
    }

    /// Restrict to records indexed at or before `end`
    pub fn indexed_until(mut self, end: Option<DateTime<Utc>>) -> Self {
        self.end_date = end;
        self
    }

    /// Whether a record's timestamp falls inside the time bounds
    pub fn matches_time(&self, time: DateTime<Utc>) -> bool {
        let after_start = self.start_date.map_or(true, |start| time > start);
        let before_end = self.end_date.map_or(true, |end| time <= end);
        after_start && before_end
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Matching records, at most `page_size`
    pub items: Vec<ResourceRecord>,

    /// Total number of matches across all pages
    pub total_count: u64,
}

impl SearchPage {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Errors returned by index implementations
#[derive(Error, Debug, Clone)]
pub enum IndexError {
    /// Client could not be built
    #[error("Index client initialization failed: {0}")]
    Init(String),

    /// Transport-level failure (connection refused, timeout, reset)
    #[error("Index unreachable: {0}")]
    Network(String),

    /// Index answered with a non-success status
    #[error("Index returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Body or headers could not be decoded
    #[error("Invalid index response: {0}")]
    InvalidResponse(String),
}

/// Search access to the resource index
#[async_trait]
pub trait ResourceIndex: Send + Sync {
    /// Run a search and return one page of matches
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, IndexError>;
}

#[async_trait]
impl<T: ResourceIndex + ?Sized> ResourceIndex for std::sync::Arc<T> {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, IndexError> {
        (**self).search(query).await
    }
}
