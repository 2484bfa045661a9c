//! HTTP client for the resource index API
//!
//! Talks to `GET {base}/v1/resources`. Matches are returned as a JSON array and
//! the total number of matches is carried by the `X-Total-Count` header.
//!
//! The client performs exactly one request per search. Retrying is left to the
//! message bus, which redelivers the event when the search fails.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Client;
use std::time::Duration;

use crate::models::ResourceRecord;

use super::{IndexError, ResourceIndex, SearchPage, SearchQuery};

/// Header carrying the total number of matches
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the index client
#[derive(Debug, Clone)]
pub struct IndexClientConfig {
    /// Index API base URL
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Bearer token (optional)
    pub token: Option<String>,

    /// User agent string
    pub user_agent: String,
}

impl IndexClientConfig {
    /// Create a new client config
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            token: None,
            user_agent: format!("hsched/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set bearer token
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }
}

// ============================================================================
// Index Client
// ============================================================================

/// Client for the resource index search API
pub struct IndexClient {
    config: IndexClientConfig,
    http_client: Client,
}

impl IndexClient {
    /// Create a new index client
    pub fn new(config: IndexClientConfig) -> Result<Self, IndexError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| IndexError::Init(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Base URL of the index API
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn resources_url(&self) -> String {
        format!("{}/v1/resources", self.config.base_url.trim_end_matches('/'))
    }

    fn query_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(6);

        if let Some(url) = &query.url {
            params.push(("url", url.clone()));
        }
        if let Some(keyword) = &query.keyword {
            params.push(("keyword", keyword.clone()));
        }
        if let Some(start) = query.start_date {
            params.push(("start-date", format_date(start)));
        }
        if let Some(end) = query.end_date {
            params.push(("end-date", format_date(end)));
        }
        params.push(("pagination-page", query.page.to_string()));
        params.push(("pagination-size", query.page_size.to_string()));

        params
    }
}

#[async_trait]
impl ResourceIndex for IndexClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, IndexError> {
        let mut request = self
            .http_client
            .get(self.resources_url())
            .query(&Self::query_params(query));

        if let Some(token) = &self.config.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::Http {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let total_header = parse_total_count(response.headers())?;

        let items: Vec<ResourceRecord> = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        let total_count = total_header.unwrap_or(items.len() as u64);

        tracing::trace!(
            url = ?query.url,
            returned = items.len(),
            total = total_count,
            "Index search completed"
        );

        Ok(SearchPage { items, total_count })
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_total_count(headers: &HeaderMap) -> Result<Option<u64>, IndexError> {
    let Some(value) = headers.get(TOTAL_COUNT_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| {
            IndexError::InvalidResponse(format!("unparsable {TOTAL_COUNT_HEADER} header"))
        })
}

// ============================================================================
// Tests
// ============================================================================
