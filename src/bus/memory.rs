//! Recording bus for tests
//!
//! Tracks every published message so tests can inspect what would have gone
//! out on the wire, and can be switched into a failing mode to exercise the
//! publish-error path.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, RwLock};

use super::consumer::Delivery;
use super::{BusError, Outcome, Publisher};

/// A published message
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// In-memory bus that records publishes
#[derive(Default)]
pub struct TestBus {
    published: RwLock<Vec<PublishedMessage>>,
    fail_publish: RwLock<Option<String>>,
}

impl TestBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail with `reason`
    pub fn fail_publishes(&self, reason: impl Into<String>) {
        *self.fail_publish.write().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    /// Accept publishes again
    pub fn recover(&self) {
        *self.fail_publish.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Get published messages for a specific subject
    pub fn messages_for_subject(&self, subject: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    /// Get the count of published messages
    pub fn publish_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Deserialize a published message payload as JSON
    pub fn deserialize_message<T: serde::de::DeserializeOwned>(
        &self,
        msg: &PublishedMessage,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&msg.payload)
    }

    /// Clear all recorded messages
    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[async_trait]
impl Publisher for TestBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        if let Some(reason) = self
            .fail_publish
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(BusError::publish(subject, reason));
        }

        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage {
                subject: subject.to_string(),
                payload,
            });
        Ok(())
    }
}

// ============================================================================
// Test Deliveries
// ============================================================================

/// Settlements recorded by a batch of [`TestDelivery`] values
#[derive(Clone, Default)]
pub struct Settlements {
    inner: Arc<RwLock<Vec<(Bytes, Outcome)>>>,
}

impl Settlements {
    /// Outcomes in settlement order
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, outcome)| *outcome)
            .collect()
    }

    /// Outcome recorded for a given payload, if it was settled
    pub fn outcome_for(&self, payload: &[u8]) -> Option<Outcome> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|(p, _)| p.as_ref() == payload)
            .map(|(_, outcome)| *outcome)
    }
}

/// A delivery that records how it was settled
pub struct TestDelivery {
    payload: Bytes,
    settlements: Settlements,
}

impl TestDelivery {
    pub fn new(payload: impl Into<Bytes>, settlements: &Settlements) -> Self {
        Self {
            payload: payload.into(),
            settlements: settlements.clone(),
        }
    }

    /// Build one delivery per payload, all recording into the same log
    pub fn batch<P: AsRef<[u8]>>(payloads: &[P]) -> (Vec<Self>, Settlements) {
        let settlements = Settlements::default();
        let deliveries = payloads
            .iter()
            .map(|p| Self::new(Bytes::copy_from_slice(p.as_ref()), &settlements))
            .collect();
        (deliveries, settlements)
    }
}

#[async_trait]
impl Delivery for TestDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn settle(&self, outcome: Outcome) -> Result<(), BusError> {
        self.settlements
            .inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((self.payload.clone(), outcome));
        Ok(())
    }
}
