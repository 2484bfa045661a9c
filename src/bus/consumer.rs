//! Concurrent delivery dispatch
//!
//! Pulls deliveries from a stream, runs the handler for each on its own tokio
//! task and settles the delivery with the handler's [`Outcome`]. At most
//! `max_in_flight` handlers run at once.
//!
//! On shutdown the loop stops pulling, then waits for every in-flight handler
//! to finish and settle before returning, so no ack/nack is lost.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use super::{BusError, Outcome};

/// Handles one raw delivery payload
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, payload: &[u8]) -> Outcome;
}

/// One delivery that must be settled exactly once
#[async_trait]
pub trait Delivery: Send + Sync + 'static {
    /// Raw message body
    fn payload(&self) -> &[u8];

    /// How many times the bus has delivered this message, if known
    fn delivery_count(&self) -> Option<u64> {
        None
    }

    /// Report the handler's outcome to the bus
    async fn settle(&self, outcome: Outcome) -> Result<(), BusError>;
}

/// Counters for one consume run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub acked: u64,
    pub nacked: u64,
    pub rejected: u64,
    /// Deliveries whose settlement could not be sent
    pub settle_errors: u64,
    /// Deliveries the stream failed to produce
    pub receive_errors: u64,
    /// Handler tasks that panicked
    pub panicked: u64,
}

impl ConsumeStats {
    /// Total deliveries that reached a handler
    pub fn handled(&self) -> u64 {
        self.acked + self.nacked + self.rejected
    }

    fn record(&mut self, outcome: Outcome, settled: bool) {
        match outcome {
            Outcome::Ack => self.acked += 1,
            Outcome::Nack => self.nacked += 1,
            Outcome::Reject => self.rejected += 1,
        }
        if !settled {
            self.settle_errors += 1;
        }
    }
}

/// Dispatch deliveries to `handler` until the stream ends or shutdown fires
pub async fn run<S, D, E, H>(
    deliveries: S,
    handler: Arc<H>,
    max_in_flight: usize,
    mut shutdown: watch::Receiver<bool>,
) -> ConsumeStats
where
    S: Stream<Item = Result<D, E>> + Unpin,
    D: Delivery,
    E: std::fmt::Display,
    H: MessageHandler,
{
    let mut deliveries = deliveries;
    let semaphore = Arc::new(Semaphore::new(max_in_flight.clamp(1, Semaphore::MAX_PERMITS)));
    let mut in_flight: JoinSet<(Outcome, bool)> = JoinSet::new();
    let mut stats = ConsumeStats::default();

    loop {
        if *shutdown.borrow() {
            break;
        }

        // Wait for a free slot before taking the next delivery
        let permit = tokio::select! {
            _ = shutdown.changed() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let next = tokio::select! {
            _ = shutdown.changed() => break,
            next = deliveries.next() => next,
        };

        let delivery = match next {
            Some(Ok(delivery)) => delivery,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Failed to receive message");
                stats.receive_errors += 1;
                continue;
            }
            None => {
                tracing::info!("Delivery stream closed");
                break;
            }
        };

        let handler = handler.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            let outcome = handler.handle(delivery.payload()).await;

            let settled = match delivery.settle(outcome).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        outcome = %outcome,
                        delivery_count = ?delivery.delivery_count(),
                        error = %e,
                        "Failed to settle message"
                    );
                    false
                }
            };

            (outcome, settled)
        });

        while let Some(result) = in_flight.try_join_next() {
            collect(&mut stats, result);
        }
    }

    if !in_flight.is_empty() {
        tracing::info!(in_flight = in_flight.len(), "Waiting for in-flight messages");
    }
    while let Some(result) = in_flight.join_next().await {
        collect(&mut stats, result);
    }

    stats
}

fn collect(stats: &mut ConsumeStats, result: Result<(Outcome, bool), tokio::task::JoinError>) {
    match result {
        Ok((outcome, settled)) => stats.record(outcome, settled),
        Err(e) => {
            tracing::error!(error = %e, "Message handler panicked");
            stats.panicked += 1;
        }
    }
}
