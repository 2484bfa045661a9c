//! NATS JetStream binding
//!
//! Inbound events are read through a durable pull consumer named after the
//! scheduler group: every instance binds the same consumer, so each message is
//! handed to exactly one of them. Acknowledgements are explicit.
//!
//! The stream uses interest retention: a message is removed once every
//! consumer bound to its subject has acknowledged it, and a message nobody is
//! bound to is not kept. `bus.max_age_secs` bounds whatever is left behind.

use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy, DeliverPolicy},
    stream, AckKind,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::consumer::{self, ConsumeStats, Delivery, MessageHandler};
use super::{BusError, Outcome, Publisher};
use crate::config::BusConfig;

/// Connected JetStream bus
pub struct NatsBus {
    client: async_nats::Client,
    context: jetstream::Context,
    config: BusConfig,
}

impl NatsBus {
    /// Connect to the server and make sure the stream exists
    pub async fn connect(config: &BusConfig) -> Result<Self, BusError> {
        let client = async_nats::ConnectOptions::new()
            .name(concat!("hsched/", env!("CARGO_PKG_VERSION")))
            .connect(config.nats_uri.as_str())
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;

        tracing::info!(uri = %config.nats_uri, "Connected to NATS");

        let bus = Self {
            context: jetstream::new(client.clone()),
            client,
            config: config.clone(),
        };
        bus.ensure_stream().await?;

        Ok(bus)
    }

    /// Create the stream over both subjects if it does not exist yet
    async fn ensure_stream(&self) -> Result<(), BusError> {
        self.context
            .get_or_create_stream(stream::Config {
                name: self.config.stream.clone(),
                subjects: vec![
                    self.config.inbound_subject.clone(),
                    self.config.outbound_subject.clone(),
                ],
                retention: stream::RetentionPolicy::Interest,
                max_age: self.config.max_age().unwrap_or_default(),
                ..Default::default()
            })
            .await
            .map_err(|e| BusError::Setup(format!("stream {}: {e}", self.config.stream)))?;

        tracing::debug!(stream = %self.config.stream, "JetStream stream ready");
        Ok(())
    }

    /// Publisher bound to this connection
    pub fn publisher(&self) -> JetStreamPublisher {
        JetStreamPublisher {
            context: self.context.clone(),
        }
    }

    /// Consume inbound events until shutdown is signalled
    ///
    /// Returns once every delivery pulled before shutdown has been settled.
    pub async fn consume<H: MessageHandler>(
        &self,
        handler: Arc<H>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ConsumeStats, BusError> {
        let stream = self
            .context
            .get_stream(&self.config.stream)
            .await
            .map_err(|e| BusError::Setup(format!("stream {}: {e}", self.config.stream)))?;

        let consumer = stream
            .get_or_create_consumer(
                &self.config.group,
                pull::Config {
                    durable_name: Some(self.config.group.clone()),
                    filter_subject: self.config.inbound_subject.clone(),
                    deliver_policy: DeliverPolicy::New,
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: Duration::from_secs(self.config.ack_wait_secs),
                    max_deliver: self.config.max_deliver,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BusError::Setup(format!("consumer {}: {e}", self.config.group)))?;

        // Pull no more than can run at once; anything buffered here would
        // count down its ack wait without being handled
        let messages = consumer
            .stream()
            .max_messages_per_batch(self.config.max_in_flight)
            .messages()
            .await
            .map_err(|e| BusError::Receive(e.to_string()))?;

        tracing::info!(
            subject = %self.config.inbound_subject,
            group = %self.config.group,
            max_in_flight = self.config.max_in_flight,
            "Consuming discovered URLs"
        );

        let nack_delay = Duration::from_secs(self.config.nack_delay_secs);
        let deliveries = Box::pin(messages.map(move |message| {
            message
                .map(|message| JetStreamDelivery {
                    message,
                    nack_delay,
                })
                .map_err(|e| BusError::Receive(e.to_string()))
        }));

        Ok(consumer::run(deliveries, handler, self.config.max_in_flight, shutdown).await)
    }

    /// Flush pending publishes
    pub async fn close(&self) -> Result<(), BusError> {
        self.client
            .flush()
            .await
            .map_err(|e| BusError::Connect(format!("flush failed: {e}")))
    }
}

/// Publishes through JetStream and waits for the server's ack
#[derive(Clone)]
pub struct JetStreamPublisher {
    context: jetstream::Context,
}

#[async_trait]
impl Publisher for JetStreamPublisher {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        self.context
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| BusError::publish(subject, e))?
            .await
            .map_err(|e| BusError::publish(subject, e))?;
        Ok(())
    }
}

/// One JetStream message awaiting settlement
struct JetStreamDelivery {
    message: jetstream::Message,
    nack_delay: Duration,
}

#[async_trait]
impl Delivery for JetStreamDelivery {
    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    fn delivery_count(&self) -> Option<u64> {
        self.message
            .info()
            .ok()
            .and_then(|info| u64::try_from(info.delivered).ok())
    }

    async fn settle(&self, outcome: Outcome) -> Result<(), BusError> {
        let result = match outcome {
            Outcome::Ack => self.message.ack().await,
            Outcome::Nack => {
                self.message
                    .ack_with(AckKind::Nak(Some(self.nack_delay)))
                    .await
            }
            Outcome::Reject => self.message.ack_with(AckKind::Term).await,
        };
        result.map_err(|e| BusError::Ack(e.to_string()))
    }
}
