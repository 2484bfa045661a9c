//! Scheduling decisions
//!
//! [`DecisionEngine`] answers one question per discovered URL: should it be
//! sent to the crawlers? The answer only depends on the URL, the refresh policy
//! and what the resource index says right now, so the same question asked twice
//! gets the same answer and any number of engines can run side by side.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::index::{ResourceIndex, SearchQuery};
use crate::metrics;
use crate::onion::OnionUrl;
use crate::utils::error::ParseError;

use super::error::SchedulerResult;
use super::policy::RefreshPolicy;

/// Outcome of evaluating one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Not crawled inside the freshness window; send to crawlers
    Schedule,

    /// Crawled recently enough (or ever, when refresh is disabled)
    Skip,

    /// Not a schedulable URL; retrying will not change that
    Invalid(ParseError),
}

impl Decision {
    pub fn should_schedule(&self) -> bool {
        matches!(self, Self::Schedule)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Skip => "skip",
            Self::Invalid(_) => "invalid",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless scheduling policy backed by the resource index
pub struct DecisionEngine {
    index: Arc<dyn ResourceIndex>,
    policy: RefreshPolicy,
}

impl DecisionEngine {
    pub fn new(index: Arc<dyn ResourceIndex>, policy: RefreshPolicy) -> Self {
        Self { index, policy }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Decide whether `url` should be scheduled, as of now
    pub async fn decide(&self, url: &str) -> SchedulerResult<Decision> {
        self.decide_at(url, Utc::now()).await
    }

    /// Decide whether `url` should be scheduled, as of `now`
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::QueryFailed`](super::SchedulerError::QueryFailed)
    /// when the index cannot be searched. Invalid URLs are reported as
    /// [`Decision::Invalid`], never as errors, and never reach the index.
    pub async fn decide_at(&self, url: &str, now: DateTime<Utc>) -> SchedulerResult<Decision> {
        let parsed = match OnionUrl::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(url = %url, reason = e.kind(), "URL is not a valid hidden service");
                metrics::record_decision("invalid");
                return Ok(Decision::Invalid(e));
            }
        };

        let query = self.query_for(&parsed, now);

        let page = {
            let _timer = metrics::start_index_timer();
            self.index.search(&query).await
        }
        .inspect_err(|e| {
            tracing::warn!(url = %url, error = %e, "Error while searching URL");
            metrics::record_index_error();
        })?;

        let decision = if page.is_empty() {
            tracing::debug!(url = %parsed, "URL should be scheduled");
            Decision::Schedule
        } else {
            tracing::trace!(
                url = %parsed,
                indexed_at = ?page.items.first().map(|r| r.time),
                "URL should not be scheduled"
            );
            Decision::Skip
        };

        metrics::record_decision(decision.as_str());
        Ok(decision)
    }

    /// Index query for a validated URL
    ///
    /// One result is enough: any match inside the window blocks scheduling.
    pub fn query_for(&self, url: &OnionUrl, now: DateTime<Utc>) -> SearchQuery {
        SearchQuery::by_fingerprint(url.fingerprint().as_str())
            .indexed_after(self.policy.cutoff(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexError, InMemoryIndex};
    use crate::scheduler::SchedulerError;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    const URL: &str = "http://example.onion/page";

    fn engine(index: &Arc<InMemoryIndex>, policy: RefreshPolicy) -> DecisionEngine {
        DecisionEngine::new(index.clone(), policy)
    }

    fn day_policy() -> RefreshPolicy {
        RefreshPolicy::After(Duration::from_secs(86400))
    }

    #[tokio::test]
    async fn test_schedules_unknown_url() {
        let index = Arc::new(InMemoryIndex::new());
        let decision = engine(&index, RefreshPolicy::Disabled).decide(URL).await.unwrap();

        assert_eq!(decision, Decision::Schedule);
        assert_eq!(index.query_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_policy_skips_any_record() {
        let index = Arc::new(InMemoryIndex::new());
        index.insert(URL, Utc::now() - ChronoDuration::days(3650));

        let decision = engine(&index, RefreshPolicy::Disabled).decide(URL).await.unwrap();
        assert_eq!(decision, Decision::Skip);

        let query = &index.queries()[0];
        assert!(query.start_date.is_none());
        assert!(query.end_date.is_none());
        assert_eq!(query.page_size, 1);
    }

    #[tokio::test]
    async fn test_stale_record_is_rescheduled() {
        let index = Arc::new(InMemoryIndex::new());
        let now = Utc::now();
        index.insert(URL, now - ChronoDuration::days(1) - ChronoDuration::seconds(1));

        let decision = engine(&index, day_policy()).decide_at(URL, now).await.unwrap();
        assert_eq!(decision, Decision::Schedule);
    }

    #[tokio::test]
    async fn test_fresh_record_is_skipped() {
        let index = Arc::new(InMemoryIndex::new());
        let now = Utc::now();
        index.insert(URL, now - ChronoDuration::seconds(1));

        let decision = engine(&index, day_policy()).decide_at(URL, now).await.unwrap();
        assert_eq!(decision, Decision::Skip);
    }

    #[tokio::test]
    async fn test_record_exactly_at_cutoff_is_stale() {
        let index = Arc::new(InMemoryIndex::new());
        let now = Utc::now();
        index.insert(URL, now - ChronoDuration::days(1));

        let decision = engine(&index, day_policy()).decide_at(URL, now).await.unwrap();
        assert_eq!(decision, Decision::Schedule);
    }

    #[tokio::test]
    async fn test_query_carries_cutoff() {
        let index = Arc::new(InMemoryIndex::new());
        let now = Utc::now();

        engine(&index, day_policy()).decide_at(URL, now).await.unwrap();

        let query = &index.queries()[0];
        assert_eq!(query.start_date, Some(now - ChronoDuration::days(1)));
        assert_eq!(
            query.url.as_deref(),
            Some(OnionUrl::parse(URL).unwrap().fingerprint().as_str())
        );
    }

    #[tokio::test]
    async fn test_clearnet_url_never_queries() {
        let index = Arc::new(InMemoryIndex::new());
        let decision = engine(&index, RefreshPolicy::Disabled)
            .decide("http://example.com/page")
            .await
            .unwrap();

        assert!(matches!(decision, Decision::Invalid(ParseError::NotHiddenService(_))));
        assert_eq!(index.query_count(), 0);
    }

    #[tokio::test]
    async fn test_unparsable_url_is_invalid_not_error() {
        let index = Arc::new(InMemoryIndex::new());
        let engine = engine(&index, RefreshPolicy::Disabled);

        for raw in ["", "::::", "http://", "example.onion/no-scheme"] {
            let decision = engine.decide(raw).await.unwrap();
            assert!(matches!(decision, Decision::Invalid(_)), "{raw:?} -> {decision:?}");
        }
        assert_eq!(index.query_count(), 0);
    }

    #[tokio::test]
    async fn test_query_failure_is_error() {
        let index = Arc::new(InMemoryIndex::new());
        index.fail_with(IndexError::Network("connection refused".into()));

        let result = engine(&index, RefreshPolicy::Disabled).decide(URL).await;
        assert!(matches!(result, Err(SchedulerError::QueryFailed(_))));
    }

    #[tokio::test]
    async fn test_decision_is_idempotent() {
        let index = Arc::new(InMemoryIndex::new());
        index.insert(URL, Utc::now() - ChronoDuration::hours(2));
        let engine = engine(&index, RefreshPolicy::After(Duration::from_secs(3600)));
        let now = Utc::now();

        let first = engine.decide_at(URL, now).await.unwrap();
        let second = engine.decide_at(URL, now).await.unwrap();
        assert_eq!(first, second);
    }
}
