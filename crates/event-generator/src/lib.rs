//! Synthetic ecommerce event generation.
//!
//! This crate produces the records that `ecommerce-event-producer` publishes:
//! shoppers viewing, carting and buying products. Identifiers and product
//! names come from a pluggable [`FieldGenerator`]; the [`EventFactory`]
//! picks the event type and amount and stamps the wall-clock time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  FieldGenerator      │  user_id (UUID v4), product (lorem word)
//! │  (FakeFieldGenerator)│
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │  EventFactory        │  event_type: uniform over 3 kinds
//! │  - rng (StdRng)      │  amount: uniform in [10, 100], 2 decimals
//! └──────────┬───────────┘  timestamp: Utc::now()
//!            │
//!            ▼
//!   Event { user_id, event_type, product, timestamp, amount }
//! ```
//!
//! # Example
//!
//! ```rust
//! use event_generator::{EventFactory, EventType};
//!
//! let mut factory = EventFactory::seeded(42);
//! let event = factory.create_event();
//! assert!(EventType::ALL.contains(&event.event_type));
//! assert_eq!(event.amount.scale(), 2);
//! ```

pub mod event;
pub mod factory;
pub mod generators;

// Re-exports for convenience
pub use event::{Event, EventType};
pub use factory::{EventFactory, AMOUNT_MAX, AMOUNT_MIN};
pub use generators::{FakeFieldGenerator, FieldGenerator};
