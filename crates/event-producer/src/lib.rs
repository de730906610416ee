//! Paced Kafka production of synthetic ecommerce events.
//!
//! This crate owns the production loop of `ecommerce-event-producer`: it
//! asks an [`EventFactory`](event_generator::EventFactory) for events,
//! encodes them as JSON and hands them to a [`DeliveryChannel`], waiting
//! a bounded time for each acknowledgment and sleeping a random interval
//! between sends.
//!
//! # Architecture
//!
//! ```text
//! ProduceArgs (clap)
//!        │ TryFrom (validation)
//!        ├────────────────────────────┐
//!        ▼                            ▼
//! ┌─────────────────┐       ┌──────────────────────┐
//! │ProductionConfig │       │ KafkaChannelConfig   │
//! └────────┬────────┘       └──────────┬───────────┘
//!          │                           ▼
//!          │                ┌──────────────────────┐
//!          │                │ KafkaDeliveryChannel │
//!          │                │ (rdkafka, acks=all)  │
//!          │                └──────────┬───────────┘
//!          ▼                           │
//!   ┌─────────────────────────────────────────┐
//!   │ EventProducer::run                       │
//!   │  create_event → encode → send → pace     │
//!   │  flush + close on stop                   │
//!   └─────────────────────────────────────────┘
//!                      │
//!                      ▼
//!               ProductionReport
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use event_producer::{
//!     EventProducer, KafkaChannelConfig, KafkaDeliveryChannel, ProduceArgs, ProductionConfig,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! async fn produce(args: &ProduceArgs) -> anyhow::Result<()> {
//!     let config = ProductionConfig::try_from(args)?;
//!     let channel = KafkaDeliveryChannel::connect(&KafkaChannelConfig::try_from(args)?).await?;
//!
//!     let report = EventProducer::new(channel, config, CancellationToken::new())?
//!         .run()
//!         .await?;
//!     println!("Sent {} events", report.events_sent);
//!     Ok(())
//! }
//! ```

pub mod args;
pub mod channel;
pub mod config;
pub mod encoder;
pub mod error;
pub mod kafka;
pub mod producer;

// Re-exports for convenience
pub use args::{Acks, Compression, KafkaArgs, ProduceArgs, ProductionArgs};
pub use channel::{DeliveryChannel, DeliveryHandle, DeliveryReceipt, Record};
pub use config::{KafkaChannelConfig, ProductionConfig};
pub use error::{ChannelError, DeliveryError, ProducerError};
pub use kafka::{create_topic_if_not_exists, KafkaDeliveryChannel};
pub use producer::{
    EventProducer, LoopState, ProductionReport, RunState, StopReason, DELIVERY_TARGET,
};
