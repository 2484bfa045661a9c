//! In-process resource index
//!
//! Holds records keyed by fingerprint, records every query it receives and can
//! be switched into a failing mode. Used by the integration tests and by the
//! `decide` dry-run command when no index API is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::ResourceRecord;
use crate::onion::OnionUrl;

use super::{IndexError, ResourceIndex, SearchPage, SearchQuery};

/// In-memory index with query recording and failure injection
#[derive(Default)]
pub struct InMemoryIndex {
    /// Records by fingerprint, newest last
    records: RwLock<HashMap<String, Vec<ResourceRecord>>>,

    /// Every query received, in order
    queries: RwLock<Vec<SearchQuery>>,

    /// When set, every search fails with this error
    failure: RwLock<Option<IndexError>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a resource under the fingerprint of its URL
    ///
    /// Returns `false` if the URL is not a valid hidden-service URL.
    pub fn insert(&self, url: &str, time: DateTime<Utc>) -> bool {
        let Ok(parsed) = OnionUrl::parse(url) else {
            return false;
        };
        self.insert_fingerprint(parsed.fingerprint().as_str(), ResourceRecord::new(url, time));
        true
    }

    /// Index a record under an explicit fingerprint
    pub fn insert_fingerprint(&self, fingerprint: &str, record: ResourceRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let entry = records.entry(fingerprint.to_string()).or_default();
        entry.push(record);
        entry.sort_by_key(|r| r.time);
    }

    /// Make every subsequent search fail
    pub fn fail_with(&self, error: IndexError) {
        *self.failure.write().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Stop failing searches
    pub fn recover(&self) {
        *self.failure.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// All queries received so far
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of queries received so far
    pub fn query_count(&self) -> usize {
        self.queries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of stored records across all fingerprints
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResourceIndex for InMemoryIndex {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, IndexError> {
        self.queries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.clone());

        if let Some(error) = self
            .failure
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(error);
        }

        let records = self.records.read().unwrap_or_else(|e| e.into_inner());

        // Newest first, like the index API
        let mut matches: Vec<ResourceRecord> = records
            .iter()
            .filter(|(fingerprint, _)| {
                query
                    .url
                    .as_deref()
                    .map_or(true, |wanted| wanted == fingerprint.as_str())
            })
            .flat_map(|(_, list)| list.iter())
            .filter(|record| query.matches_time(record.time))
            .filter(|record| {
                query.keyword.as_deref().map_or(true, |kw| {
                    record.title.as_deref().is_some_and(|t| t.contains(kw))
                })
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.time.cmp(&a.time));

        let total_count = matches.len() as u64;
        let page_size = query.page_size.max(1) as usize;
        let skip = (query.page.max(1) as usize - 1) * page_size;

        Ok(SearchPage {
            items: matches.into_iter().skip(skip).take(page_size).collect(),
            total_count,
        })
    }
}
