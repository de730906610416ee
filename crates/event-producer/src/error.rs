//! Error types for the production loop and its delivery channel.

use std::time::Duration;
use thiserror::Error;

/// Fatal errors that end (or prevent) a production run.
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to create delivery channel: {0}")]
    ChannelConstruction(#[from] ChannelError),

    #[error("Delivery channel failed after {events_sent} events: {source}")]
    Fatal {
        events_sent: u64,
        #[source]
        source: DeliveryError,
    },

    #[error("Failed to drain delivery channel after {events_sent} events: {source}")]
    Drain {
        events_sent: u64,
        #[source]
        source: ChannelError,
    },
}

impl ProducerError {
    /// Events successfully delivered before the failure, if the loop ran.
    pub fn events_sent(&self) -> Option<u64> {
        match self {
            ProducerError::Fatal { events_sent, .. } | ProducerError::Drain { events_sent, .. } => {
                Some(*events_sent)
            }
            ProducerError::Configuration(_) | ProducerError::ChannelConstruction(_) => None,
        }
    }
}

/// Outcome of a single failed delivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Event could not be encoded: {0}")]
    Encoding(String),

    #[error("Broker rejected event: {0}")]
    Rejected(String),

    #[error("No delivery acknowledgment within {0:?}")]
    Timeout(Duration),

    #[error("Unrecoverable delivery failure: {0}")]
    Fatal(String),
}

impl DeliveryError {
    /// Whether the channel is unusable and the run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeliveryError::Fatal(_))
    }
}

/// Failures of the channel itself, outside per-event delivery.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to create producer: {0}")]
    Construction(String),

    #[error("Topic creation error: {0}")]
    TopicCreation(String),

    #[error("Flush failed: {0}")]
    Flush(String),

    #[error("Close failed: {0}")]
    Close(String),
}
