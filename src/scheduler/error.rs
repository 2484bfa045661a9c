//! Error types for the scheduler module

use thiserror::Error;

use crate::bus::BusError;
use crate::index::IndexError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
///
/// Invalid URLs are not errors: they are a normal [`Decision`](super::Decision).
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Inbound envelope could not be decoded
    #[error("Malformed event: {0}")]
    MalformedEvent(#[source] serde_json::Error),

    /// The index search failed
    #[error("Index query failed: {0}")]
    QueryFailed(#[from] IndexError),

    /// The schedule request could not be published
    #[error("Publish failed: {0}")]
    PublishFailed(#[from] BusError),

    /// Outbound envelope could not be encoded
    #[error("Failed to encode schedule request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl SchedulerError {
    /// Whether redelivering the event may lead to a different result
    ///
    /// Infrastructure failures are always worth another delivery: the bus
    /// decides how often. Envelope problems never go away.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::QueryFailed(_) | Self::PublishFailed(_) => true,
            Self::MalformedEvent(_) | Self::Encode(_) => false,
        }
    }

    /// Short machine-friendly label, used for log fields and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent(_) => "malformed_event",
            Self::QueryFailed(_) => "query_failed",
            Self::PublishFailed(_) => "publish_failed",
            Self::Encode(_) => "encode",
        }
    }
}
