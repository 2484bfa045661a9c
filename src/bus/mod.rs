//! Message bus plumbing
//!
//! The scheduler sees the bus through two narrow seams:
//!
//! - [`Publisher`] - fire one payload at a subject
//! - [`Outcome`] - what a handler tells the bus about one delivery
//!
//! [`consumer`] fans deliveries out to a [`MessageHandler`] with bounded
//! concurrency. [`nats`] binds it all to NATS JetStream, [`memory`] provides
//! recording implementations for tests.

pub mod consumer;
pub mod memory;
pub mod nats;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

pub use consumer::{ConsumeStats, Delivery, MessageHandler};
pub use memory::TestBus;
pub use nats::{JetStreamPublisher, NatsBus};

/// Result of handling one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Handled, including deliberate skips; never redeliver
    Ack,

    /// Transient failure; redeliver after the bus's backoff
    Nack,

    /// Poison message; drop without redelivery
    Reject,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Nack => "nack",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bus errors
#[derive(Error, Debug, Clone)]
pub enum BusError {
    /// Could not connect to the server
    #[error("Bus connection failed: {0}")]
    Connect(String),

    /// Stream or consumer setup failed
    #[error("Bus setup failed: {0}")]
    Setup(String),

    /// Publish was not accepted
    #[error("Publish to '{subject}' failed: {reason}")]
    Publish { subject: String, reason: String },

    /// Receiving from the consumer failed
    #[error("Receive failed: {0}")]
    Receive(String),

    /// Acknowledgement could not be delivered
    #[error("Acknowledgement failed: {0}")]
    Ack(String),
}

impl BusError {
    pub fn publish(subject: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Publish {
            subject: subject.into(),
            reason: reason.to_string(),
        }
    }
}

/// Publish side of the bus
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a payload to a subject
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError>;
}

#[async_trait]
impl<T: Publisher + ?Sized> Publisher for std::sync::Arc<T> {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        (**self).publish(subject, payload).await
    }
}
