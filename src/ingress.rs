//! Inbound event handling
//!
//! Turns one raw `url.found` delivery into a bus [`Outcome`]:
//!
//! | situation                         | outcome  |
//! |-----------------------------------|----------|
//! | payload is not a URL event        | `Reject` |
//! | URL invalid / already fresh       | `Ack`    |
//! | scheduled and published           | `Ack`    |
//! | index query or publish failed     | `Nack`   |

use async_trait::async_trait;

use crate::bus::{MessageHandler, Outcome, Publisher};
use crate::egress::Emitter;
use crate::error::HschedErrorTrait;
use crate::metrics;
use crate::models::DiscoveredUrlEvent;
use crate::scheduler::{Decision, DecisionEngine, SchedulerError, SchedulerResult};

/// Connects the bus to the decision engine and the emitter
pub struct IngressAdapter<P> {
    engine: DecisionEngine,
    emitter: Emitter<P>,
}

impl<P: Publisher> IngressAdapter<P> {
    pub fn new(engine: DecisionEngine, emitter: Emitter<P>) -> Self {
        Self { engine, emitter }
    }

    /// Decide on one event and publish it when scheduled
    ///
    /// The URL is forwarded as received, minus surrounding whitespace.
    pub async fn process(&self, event: &DiscoveredUrlEvent) -> SchedulerResult<Decision> {
        let url = event.url.trim();
        tracing::debug!(url = %url, "Processing URL");

        let decision = self.engine.decide(url).await?;
        if decision.should_schedule() {
            self.emitter.schedule(url).await?;
        }

        Ok(decision)
    }

    /// Map a raw payload to the outcome the bus should see
    pub async fn handle_payload(&self, payload: &[u8]) -> Outcome {
        let event = match DiscoveredUrlEvent::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                let err = SchedulerError::MalformedEvent(e);
                tracing::warn!(
                    error = %err,
                    payload = %crate::utils::truncate_text(&String::from_utf8_lossy(payload), 120),
                    "Dropping malformed event"
                );
                return Outcome::Reject;
            }
        };

        match self.process(&event).await {
            Ok(_) => Outcome::Ack,
            Err(e) => {
                let outcome = if HschedErrorTrait::is_recoverable(&e) {
                    Outcome::Nack
                } else {
                    Outcome::Reject
                };
                tracing::warn!(
                    url = %event.url,
                    error = %e,
                    category = %HschedErrorTrait::category(&e),
                    outcome = %outcome,
                    "Failed to process URL"
                );
                outcome
            }
        }
    }
}

#[async_trait]
impl<P: Publisher + 'static> MessageHandler for IngressAdapter<P> {
    async fn handle(&self, payload: &[u8]) -> Outcome {
        let outcome = self.handle_payload(payload).await;
        metrics::record_message(outcome.as_str());
        outcome
    }
}
