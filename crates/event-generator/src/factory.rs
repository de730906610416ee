//! Event factory that assembles complete events from generated fields.

use crate::event::{Event, EventType};
use crate::generators::numeric::generate_money;
use crate::generators::{FakeFieldGenerator, FieldGenerator};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lower bound of a generated `amount`.
pub const AMOUNT_MIN: f64 = 10.0;
/// Upper bound of a generated `amount`.
pub const AMOUNT_MAX: f64 = 100.0;

/// Builds one [`Event`] per call.
///
/// The factory owns the choices it makes itself (event type, amount) and
/// delegates identifiers and product names to a [`FieldGenerator`].
pub struct EventFactory<G: FieldGenerator = FakeFieldGenerator> {
    fields: G,
    rng: StdRng,
    created: u64,
}

impl EventFactory<FakeFieldGenerator> {
    /// Create a factory with fake field values and entropy-seeded choices.
    pub fn new() -> Self {
        Self::with_generator(FakeFieldGenerator::new())
    }

    /// Create a factory whose field values are reproducible for `seed`.
    ///
    /// Timestamps always come from the wall clock.
    pub fn seeded(seed: u64) -> Self {
        Self {
            fields: FakeFieldGenerator::seeded(seed),
            rng: StdRng::seed_from_u64(derive_seed(seed)),
            created: 0,
        }
    }
}

impl Default for EventFactory<FakeFieldGenerator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: FieldGenerator> EventFactory<G> {
    /// Create a factory on top of a custom field generator.
    pub fn with_generator(fields: G) -> Self {
        Self {
            fields,
            rng: StdRng::from_entropy(),
            created: 0,
        }
    }

    /// Create one new event stamped with the current time.
    pub fn create_event(&mut self) -> Event {
        let event_type = EventType::ALL[self.rng.gen_range(0..EventType::ALL.len())];
        let amount = generate_money(&mut self.rng, AMOUNT_MIN, AMOUNT_MAX);

        let event = Event {
            user_id: self.fields.user_id(),
            event_type,
            product: self.fields.product(),
            timestamp: Utc::now(),
            amount,
        };

        self.created += 1;
        event
    }

    /// Number of events created so far.
    pub fn created(&self) -> u64 {
        self.created
    }
}

/// Keep the factory's own RNG stream distinct from the field generator's
/// when both derive from one user seed.
fn derive_seed(seed: u64) -> u64 {
    seed.wrapping_add(0x9E3779B97F4A7C15)
}
