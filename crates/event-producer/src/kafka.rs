//! Kafka implementation of the delivery channel.

use crate::channel::{DeliveryChannel, DeliveryHandle, DeliveryReceipt, Record};
use crate::config::KafkaChannelConfig;
use crate::error::{ChannelError, DeliveryError};
use async_trait::async_trait;
use futures::FutureExt;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, info};

/// Delivery channel backed by an rdkafka `FutureProducer`.
///
/// The producer is configured once, at construction: full-ISR
/// acknowledgment by default, bounded internal retries and compression.
pub struct KafkaDeliveryChannel {
    producer: FutureProducer,
    topic: String,
}

impl KafkaDeliveryChannel {
    /// Create the producer and check the brokers are reachable.
    ///
    /// librdkafka connects lazily, so without the metadata probe an
    /// unreachable cluster would only show up as per-event timeouts.
    pub async fn connect(config: &KafkaChannelConfig) -> Result<Self, ChannelError> {
        let producer: FutureProducer = producer_client_config(config)
            .create()
            .map_err(|e| ChannelError::Construction(e.to_string()))?;

        let probe = producer.clone();
        let timeout = config.connect_timeout;
        let brokers = tokio::task::spawn_blocking(move || {
            probe
                .client()
                .fetch_metadata(None, timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|e| ChannelError::Construction(format!("Metadata probe panicked: {e}")))?
        .map_err(|e| {
            ChannelError::Construction(format!(
                "Could not reach Kafka at {}: {e}",
                config.bootstrap_servers
            ))
        })?;

        info!(
            "Connected to Kafka at {} ({} brokers)",
            config.bootstrap_servers, brokers
        );

        Ok(Self {
            producer,
            topic: config.topic.clone(),
        })
    }
}

#[async_trait]
impl DeliveryChannel for KafkaDeliveryChannel {
    fn send(&self, record: &Record) -> Result<DeliveryHandle, DeliveryError> {
        let future_record = FutureRecord::to(&self.topic)
            .key(record.key.as_str())
            .payload(record.payload.as_slice());

        let delivery = self
            .producer
            .send_result(future_record)
            .map_err(|(err, _)| classify_error(err))?;

        Ok(async move {
            match delivery.await {
                Ok(Ok((partition, offset))) => Ok(DeliveryReceipt { partition, offset }),
                Ok(Err((err, _message))) => Err(classify_error(err)),
                Err(_canceled) => Err(DeliveryError::Fatal(
                    "Producer shut down before delivery completed".to_string(),
                )),
            }
        }
        .boxed())
    }

    async fn flush(&self, timeout: Duration) -> Result<(), ChannelError> {
        let in_flight = self.producer.in_flight_count();
        debug!("Flushing {in_flight} in-flight messages (timeout {timeout:?})");

        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| ChannelError::Flush(format!("Flush task panicked: {e}")))?
            .map_err(|e| ChannelError::Flush(e.to_string()))
    }

    async fn close(self) -> Result<(), ChannelError> {
        let remaining = self.producer.in_flight_count();
        drop(self.producer);
        if remaining > 0 {
            return Err(ChannelError::Close(format!(
                "{remaining} messages were still in flight"
            )));
        }
        info!("Producer closed.");
        Ok(())
    }
}

/// Create `topic` if it does not already exist.
pub async fn create_topic_if_not_exists(
    config: &KafkaChannelConfig,
    partitions: i32,
    replication_factor: i32,
) -> Result<(), ChannelError> {
    let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", &config.bootstrap_servers)
        .create()
        .map_err(|e| ChannelError::TopicCreation(format!("Failed to create admin client: {e}")))?;

    let new_topic = NewTopic::new(
        &config.topic,
        partitions,
        TopicReplication::Fixed(replication_factor),
    );
    let opts = AdminOptions::new().operation_timeout(Some(config.connect_timeout));

    let results = admin_client
        .create_topics(&[new_topic], &opts)
        .await
        .map_err(|e| ChannelError::TopicCreation(format!("Failed to create topic: {e}")))?;

    for result in results {
        match result {
            Ok(topic_name) => info!("Topic '{topic_name}' created successfully"),
            Err((topic_name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                info!("Topic '{topic_name}' already exists")
            }
            Err((topic_name, err)) => {
                return Err(ChannelError::TopicCreation(format!(
                    "Failed to create topic {topic_name}: {err}"
                )));
            }
        }
    }

    Ok(())
}

fn producer_client_config(config: &KafkaChannelConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("acks", config.acks.as_config_value())
        .set("retries", config.retries.to_string())
        .set("compression.type", config.compression.as_config_value())
        .set(
            "message.timeout.ms",
            config.message_timeout.as_millis().to_string(),
        );
    client_config
}

/// Sort a client error into a per-event miss or a dead channel.
fn classify_error(err: KafkaError) -> DeliveryError {
    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::Fatal) => DeliveryError::Fatal(err.to_string()),
        // Timed out messages have already used up the client's retries
        _ => DeliveryError::Rejected(err.to_string()),
    }
}
