//! Event record types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of interaction a shopper had with a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    AddToCart,
    Purchase,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [EventType; 3] = [EventType::View, EventType::AddToCart, EventType::Purchase];

    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::AddToCart => "add_to_cart",
            EventType::Purchase => "purchase",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width specifiers like `{:15}` line up log columns
        f.pad(self.as_str())
    }
}

/// One synthetic ecommerce interaction.
///
/// Events are flat and self-contained; serializing one never requires
/// looking at any other event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: String,
    pub event_type: EventType,
    pub product: String,
    pub timestamp: DateTime<Utc>,
    /// Always carries exactly two fractional digits.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl Event {
    /// First eight characters of the user id, for compact log lines.
    pub fn short_user_id(&self) -> &str {
        self.user_id.get(..8).unwrap_or(&self.user_id)
    }
}
