//! CLI argument definitions for the event producer.

use clap::{Args, ValueEnum};

/// Default topic when neither `--topic` nor `KAFKA_TOPIC` is given.
pub const DEFAULT_TOPIC: &str = "ecommerce-events";
/// Default brokers when neither `--bootstrap-servers` nor `KAFKA_BOOTSTRAP_SERVERS` is given.
pub const DEFAULT_BOOTSTRAP_SERVERS: &str = "localhost:9092";

/// Pacing and volume of the production run.
#[derive(Args, Clone, Debug)]
pub struct ProductionArgs {
    /// Minimum seconds between events
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub rate_min: f64,

    /// Maximum seconds between events
    #[arg(long, default_value_t = 5.0, allow_negative_numbers = true)]
    pub rate_max: f64,

    /// Maximum number of events to produce (default: unlimited)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_events: Option<u64>,

    /// Seconds to wait for each delivery acknowledgment
    #[arg(long, default_value_t = 10)]
    pub send_timeout_secs: u64,

    /// Seconds to wait for in-flight deliveries on shutdown
    #[arg(long, default_value_t = 30)]
    pub flush_timeout_secs: u64,

    /// Random seed for reproducible event fields and pacing
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Kafka connection and producer tuning.
#[derive(Args, Clone, Debug)]
pub struct KafkaArgs {
    /// Kafka topic name
    #[arg(long, env = "KAFKA_TOPIC", default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Kafka bootstrap servers (comma-separated, e.g., "localhost:9092")
    #[arg(long, env = "KAFKA_BOOTSTRAP_SERVERS", default_value = DEFAULT_BOOTSTRAP_SERVERS)]
    pub bootstrap_servers: String,

    /// Acknowledgments the leader must receive before a send succeeds
    #[arg(long, value_enum, default_value_t = Acks::All)]
    pub acks: Acks,

    /// Times the client retries a failed send before reporting it
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Compression codec for produced batches
    #[arg(long, value_enum, default_value_t = Compression::Gzip)]
    pub compression: Compression,

    /// Seconds to wait for the broker when connecting
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Create the topic before producing if it does not exist
    #[arg(long)]
    pub create_topic: bool,

    /// Partitions for a topic created with --create-topic
    #[arg(long, default_value_t = 3)]
    pub partitions: i32,

    /// Replication factor for a topic created with --create-topic
    #[arg(long, default_value_t = 1)]
    pub replication_factor: i32,
}

/// Producer acknowledgment level.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acks {
    /// Wait for all in-sync replicas
    #[value(name = "all")]
    All,
    /// Wait for the partition leader only
    #[value(name = "1")]
    Leader,
    /// Do not wait for any acknowledgment
    #[value(name = "0")]
    None,
}

impl Acks {
    /// Value for the `acks` client property.
    pub fn as_config_value(&self) -> &'static str {
        match self {
            Acks::All => "all",
            Acks::Leader => "1",
            Acks::None => "0",
        }
    }
}

/// Compression codec.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    /// Value for the `compression.type` client property.
    pub fn as_config_value(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }
}

/// Everything the `ecommerce-event-producer` binary accepts.
#[derive(Args, Clone, Debug)]
pub struct ProduceArgs {
    #[command(flatten)]
    pub production: ProductionArgs,

    #[command(flatten)]
    pub kafka: KafkaArgs,
}
