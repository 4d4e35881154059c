//! Deterministic random number generation for synthetic portfolios.
//!
//! RULE: synthetic data never touches a platform RNG. Every stream is
//! derived from one master seed XOR a stable stream index, so adding a
//! new stream never changes the data produced by existing ones.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG for one generation stream.
pub struct StreamRng {
    inner: Pcg64Mcg,
}

impl StreamRng {
    pub fn new(master_seed: u64, stream: StreamSlot) -> Self {
        let derived_seed = master_seed ^ (stream as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self { inner: Pcg64Mcg::seed_from_u64(derived_seed) }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an integer in [lo, hi].
    pub fn range_inclusive(&mut self, lo: i64, hi: i64) -> i64 {
        lo + self.next_u64_below((hi - lo + 1) as u64) as i64
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform pick from a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }

    /// Sample from a simplified Pareto distribution.
    /// x_min: minimum value, alpha: shape parameter (higher = less skewed).
    pub fn pareto(&mut self, x_min: f64, alpha: f64) -> f64 {
        let u = self.next_f64().max(1e-10);
        x_min * u.powf(-1.0 / alpha)
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries; only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Advisors = 0,
    Entities = 1,
    Policies = 2,
    Noise    = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = StreamRng::new(7, StreamSlot::Policies);
        let mut b = StreamRng::new(7, StreamSlot::Policies);
        for _ in 0..32 {
            assert_eq!(a.next_u64_below(1000), b.next_u64_below(1000));
        }
    }

    #[test]
    fn streams_are_independent() {
        let mut a = StreamRng::new(7, StreamSlot::Policies);
        let mut b = StreamRng::new(7, StreamSlot::Entities);
        let xs: Vec<u64> = (0..8).map(|_| a.next_u64_below(1 << 40)).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.next_u64_below(1 << 40)).collect();
        assert_ne!(xs, ys);
    }
}
