//! Crawl scheduling
//!
//! Given a discovered URL, decide whether it must be handed to the crawlers:
//!
//! 1. The URL must parse and point at a hidden service; otherwise it is
//!    [`Decision::Invalid`] and the index is never consulted.
//! 2. The [`RefreshPolicy`] turns the configured refresh delay into a freshness
//!    cutoff (or none at all when re-crawling is disabled).
//! 3. The resource index is searched for the URL's fingerprint, restricted to
//!    records indexed after the cutoff. No hit means [`Decision::Schedule`],
//!    any hit means [`Decision::Skip`].
//!
//! ```text
//! url.found ──► ingress ──► DecisionEngine ──► index search
//!                                 │
//!                                 └── Schedule ──► egress ──► url.todo
//! ```

pub mod engine;
pub mod error;
pub mod policy;

pub use engine::{Decision, DecisionEngine};
pub use error::{SchedulerError, SchedulerResult};
pub use policy::RefreshPolicy;
