//! JSON encoder for events on the wire.

use crate::channel::Record;
use crate::error::DeliveryError;
use event_generator::Event;

/// Encode an event as a flat JSON object keyed by its user id.
///
/// Keying by user keeps one shopper's events on one partition, so their
/// relative order survives in the topic.
pub fn encode_event(event: &Event) -> Result<Record, DeliveryError> {
    let payload =
        serde_json::to_vec(event).map_err(|e| DeliveryError::Encoding(e.to_string()))?;
    Ok(Record {
        key: message_key(event).to_string(),
        payload,
    })
}

/// Partitioning key for an event.
pub fn message_key(event: &Event) -> &str {
    &event.user_id
}
