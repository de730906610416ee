//! Validated configuration for a production run.
//!
//! CLI arguments are converted into these types before anything touches
//! the network, so a bad flag never opens a broker connection.

use crate::args::{Acks, Compression, ProduceArgs};
use crate::error::ProducerError;
use std::time::Duration;

/// Longest topic name Kafka accepts.
const MAX_TOPIC_LEN: usize = 249;

/// Settings owned by the production loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionConfig {
    /// Lower pacing bound in seconds.
    pub rate_min: f64,
    /// Upper pacing bound in seconds.
    pub rate_max: f64,
    /// Stop after this many successful sends.
    pub max_events: Option<u64>,
    pub topic: String,
    pub bootstrap_servers: String,
    /// How long to wait for one delivery outcome.
    pub send_timeout: Duration,
    /// How long the final flush may take.
    pub flush_timeout: Duration,
    pub seed: Option<u64>,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            rate_min: 1.0,
            rate_max: 5.0,
            max_events: None,
            topic: crate::args::DEFAULT_TOPIC.to_string(),
            bootstrap_servers: crate::args::DEFAULT_BOOTSTRAP_SERVERS.to_string(),
            send_timeout: Duration::from_secs(10),
            flush_timeout: Duration::from_secs(30),
            seed: None,
        }
    }
}

impl ProductionConfig {
    /// Check every invariant the loop relies on.
    pub fn validate(&self) -> Result<(), ProducerError> {
        validate_rates(self.rate_min, self.rate_max)?;
        if self.send_timeout.is_zero() {
            return Err(ProducerError::Configuration(
                "send-timeout-secs must be at least 1".to_string(),
            ));
        }
        if self.flush_timeout.is_zero() {
            return Err(ProducerError::Configuration(
                "flush-timeout-secs must be at least 1".to_string(),
            ));
        }
        if self.max_events == Some(0) {
            return Err(ProducerError::Configuration(
                "max-events must be at least 1".to_string(),
            ));
        }
        validate_topic(&self.topic)?;
        validate_bootstrap_servers(&self.bootstrap_servers)?;
        Ok(())
    }
}

impl TryFrom<&ProduceArgs> for ProductionConfig {
    type Error = ProducerError;

    fn try_from(args: &ProduceArgs) -> Result<Self, Self::Error> {
        let config = Self {
            rate_min: args.production.rate_min,
            rate_max: args.production.rate_max,
            max_events: args.production.max_events,
            topic: args.kafka.topic.clone(),
            bootstrap_servers: args.kafka.bootstrap_servers.clone(),
            send_timeout: Duration::from_secs(args.production.send_timeout_secs),
            flush_timeout: Duration::from_secs(args.production.flush_timeout_secs),
            seed: args.production.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Settings for the Kafka delivery channel.
#[derive(Debug, Clone, PartialEq)]
pub struct KafkaChannelConfig {
    pub bootstrap_servers: String,
    pub topic: String,
    pub acks: Acks,
    /// Internal client retries for transient send failures.
    pub retries: u32,
    pub compression: Compression,
    /// librdkafka's own bound on a message's lifetime, retries included.
    pub message_timeout: Duration,
    pub connect_timeout: Duration,
}

impl TryFrom<&ProduceArgs> for KafkaChannelConfig {
    type Error = ProducerError;

    fn try_from(args: &ProduceArgs) -> Result<Self, Self::Error> {
        validate_topic(&args.kafka.topic)?;
        validate_bootstrap_servers(&args.kafka.bootstrap_servers)?;
        if args.production.send_timeout_secs == 0 {
            return Err(ProducerError::Configuration(
                "send-timeout-secs must be at least 1".to_string(),
            ));
        }
        if args.kafka.connect_timeout_secs == 0 {
            return Err(ProducerError::Configuration(
                "connect-timeout-secs must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            bootstrap_servers: args.kafka.bootstrap_servers.clone(),
            topic: args.kafka.topic.clone(),
            acks: args.kafka.acks,
            retries: args.kafka.retries,
            compression: args.kafka.compression,
            // The loop gives up waiting after send_timeout; let the client
            // finish its retries inside that window.
            message_timeout: Duration::from_secs(args.production.send_timeout_secs),
            connect_timeout: Duration::from_secs(args.kafka.connect_timeout_secs),
        })
    }
}

fn validate_rates(rate_min: f64, rate_max: f64) -> Result<(), ProducerError> {
    if !rate_min.is_finite() || !rate_max.is_finite() {
        return Err(ProducerError::Configuration(
            "Rate values must be finite numbers".to_string(),
        ));
    }
    if rate_min < 0.0 || rate_max < 0.0 {
        return Err(ProducerError::Configuration(
            "Rate values must be non-negative".to_string(),
        ));
    }
    if rate_min > rate_max {
        return Err(ProducerError::Configuration(format!(
            "rate-min must be <= rate-max (got {rate_min} > {rate_max})"
        )));
    }
    // Every pacing delay is drawn from [rate_min, rate_max]
    if Duration::try_from_secs_f64(rate_max).is_err() {
        return Err(ProducerError::Configuration(format!(
            "rate-max {rate_max} is too large for a delay"
        )));
    }
    Ok(())
}

fn validate_topic(topic: &str) -> Result<(), ProducerError> {
    if topic.is_empty() {
        return Err(ProducerError::Configuration(
            "Topic name must not be empty".to_string(),
        ));
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(ProducerError::Configuration(format!(
            "Topic name is longer than {MAX_TOPIC_LEN} characters"
        )));
    }
    if topic == "." || topic == ".." {
        return Err(ProducerError::Configuration(format!(
            "'{topic}' is not a valid topic name"
        )));
    }
    if let Some(bad) = topic
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(ProducerError::Configuration(format!(
            "Topic name '{topic}' contains invalid character '{bad}'"
        )));
    }
    Ok(())
}

fn validate_bootstrap_servers(servers: &str) -> Result<(), ProducerError> {
    if servers.trim().is_empty() {
        return Err(ProducerError::Configuration(
            "Bootstrap servers must not be empty".to_string(),
        ));
    }
    for server in servers.split(',') {
        let server = server.trim();
        if server.is_empty() {
            return Err(ProducerError::Configuration(format!(
                "Bootstrap servers '{servers}' contain an empty entry"
            )));
        }
        if let Some((host, port)) = server.rsplit_once(':') {
            if host.is_empty() || port.parse::<u16>().is_err() {
                return Err(ProducerError::Configuration(format!(
                    "Malformed bootstrap server '{server}', expected host:port"
                )));
            }
        }
    }
    Ok(())
}
