//! Unbounded random readings

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::hub::{Cursor, EventGenerator, Generated, Payload};

/// Emits `{type: "random", sequence, value}` forever
///
/// The value is drawn from an RNG seeded by the stream id and cursor, so
/// `next` stays a pure function.
#[derive(Debug, Clone, Default)]
pub struct RandomGenerator {
    salt: u64,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Different salts give different sequences for the same stream
    pub fn with_salt(salt: u64) -> Self {
        Self { salt }
    }

    fn seed(&self, stream_id: &str, cursor: Cursor) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.salt.hash(&mut hasher);
        stream_id.hash(&mut hasher);
        cursor.position().hash(&mut hasher);
        hasher.finish()
    }
}

impl EventGenerator for RandomGenerator {
    fn name(&self) -> &'static str {
        "random"
    }

    fn next(&self, stream_id: &str, cursor: Cursor) -> Generated {
        let mut rng = StdRng::seed_from_u64(self.seed(stream_id, cursor));
        // Whole hundredths keep two decimals without rounding up to 100
        let hundredths: u32 = rng.gen_range(0..10_000);

        let payload = Payload::new("random")
            .field("sequence", cursor.position() + 1)
            .field("value", f64::from(hundredths) / 100.0);

        Generated::next(payload, cursor.advance())
    }
}
