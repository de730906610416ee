//! Field value generators.
//!
//! The event factory treats field generation as an external concern: it
//! only needs plausible user ids and product names. [`FieldGenerator`] is
//! that seam, and [`FakeFieldGenerator`] is the default implementation.

pub mod numeric;
pub mod uuid;

use fake::faker::lorem::en::Word;
use fake::Fake;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Source of realistic-looking field values.
pub trait FieldGenerator: Send {
    /// Opaque, unique user identifier.
    fn user_id(&mut self) -> String;

    /// Short product description.
    fn product(&mut self) -> String;
}

/// Field generator backed by a seedable RNG and `fake` word lists.
pub struct FakeFieldGenerator {
    rng: StdRng,
}

impl FakeFieldGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a generator that yields the same values for the same seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for FakeFieldGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldGenerator for FakeFieldGenerator {
    fn user_id(&mut self) -> String {
        uuid::generate_uuid_v4(&mut self.rng).to_string()
    }

    fn product(&mut self) -> String {
        Word().fake_with_rng(&mut self.rng)
    }
}
