//! Fixed-capacity uniform sample over a stream (Algorithm R)

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct Reservoir {
    capacity: usize,
    seen: u64,
    sample: Vec<f64>,
    rng: StdRng,
}

impl Reservoir {
    /// Seeded so the same stream always yields the same sample. Capacity is
    /// at least one.
    pub fn new(capacity: usize, seed: u64) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            seen: 0,
            sample: Vec::with_capacity(capacity.min(1 << 16)),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// First `capacity` values are kept verbatim; the n-th value after that
    /// replaces slot j-1 when a uniform draw j in [1, n] lands within capacity
    pub fn offer(&mut self, x: f64) {
        self.seen += 1;
        if self.sample.len() < self.capacity {
            self.sample.push(x);
            return;
        }
        let j = self.rng.gen_range(1..=self.seen);
        if j <= self.capacity as u64 {
            self.sample[(j - 1) as usize] = x;
        }
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.sample.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample.is_empty()
    }

    /// True while every offered value is still in the sample
    pub fn is_exact(&self) -> bool {
        self.seen <= self.capacity as u64
    }

    pub fn into_sorted(self) -> Vec<f64> {
        let mut sample = self.sample;
        sample.sort_by(f64::total_cmp);
        sample
    }
}

/// Nearest-rank value at fraction `p` of an ascending slice:
/// index `round((m - 1) * p)` with ties to even, clamped to the slice
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let last = sorted.len() - 1;
    let idx = (last as f64 * p).round_ties_even();
    let idx = if idx <= 0.0 { 0 } else { (idx as usize).min(last) };
    sorted[idx]
}
