use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Single deterministic draw stream shared by every generation pass.
///
/// Every helper consumes exactly one unit draw so the stream position only depends
/// on how many helpers were called, never on the values they returned.
pub struct SeededStream {
    rng: StdRng,
    draws: u64,
}

impl SeededStream {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), draws: 0 }
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        self.draws += 1;
        self.rng.gen::<f64>()
    }

    pub fn index(&mut self, len: usize) -> usize {
        let unit = self.next_unit();
        ((unit * len as f64) as usize).min(len.saturating_sub(1))
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.index(items.len())]
    }

    pub fn range_inclusive(&mut self, min: u64, max: u64) -> u64 {
        let span = max.saturating_sub(min) + 1;
        let unit = self.next_unit();
        min + ((unit * span as f64) as u64).min(span - 1)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_unit() < probability
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }
}
