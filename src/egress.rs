//! Schedule request emission
//!
//! Publishes URLs the engine decided to schedule onto the crawl workers'
//! subject. The payload carries the URL exactly as it was discovered.

use bytes::Bytes;

use crate::bus::{BusError, Publisher};
use crate::metrics;
use crate::models::ScheduleRequestEvent;
use crate::scheduler::SchedulerError;

/// Publishes schedule requests
pub struct Emitter<P> {
    publisher: P,
    subject: String,
}

impl<P: Publisher> Emitter<P> {
    pub fn new(publisher: P, subject: impl Into<String>) -> Self {
        Self {
            publisher,
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Ask crawl workers to fetch `url`
    ///
    /// Success means the bus accepted the message. No retry happens here: the
    /// caller nacks the inbound event and the bus redelivers it.
    pub async fn schedule(&self, url: &str) -> Result<(), SchedulerError> {
        let payload = ScheduleRequestEvent::new(url)
            .to_vec()
            .map_err(SchedulerError::Encode)?;

        let result = self
            .publisher
            .publish(&self.subject, Bytes::from(payload))
            .await;
        metrics::record_publish(result.is_ok());

        result.map_err(|e: BusError| {
            tracing::error!(url = %url, subject = %self.subject, error = %e, "Error while publishing schedule request");
            SchedulerError::PublishFailed(e)
        })
    }
}
