//! xorshift64* random number generator
//!
//! Fast, 64-bit state, passes BigCrush. Used as the "native" RNG of the
//! reference engines so that runs are reproducible from the seed alone.

use serde::{Deserialize, Serialize};

/// Deterministic RNG using xorshift64*
///
/// # Example
/// ```
/// use evgen_core::rng::EngineRng;
///
/// let mut a = EngineRng::new(12345);
/// let mut b = EngineRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
///
/// let phi = a.uniform(0.0, std::f64::consts::TAU);
/// assert!((0.0..std::f64::consts::TAU).contains(&phi));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRng {
    state: u64,
}

impl EngineRng {
    /// Create a generator; a zero seed is mapped to 1 (xorshift requirement)
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Next raw 64-bit value
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform `f64` in `[0.0, 1.0)`
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform `f64` in `[low, high)`
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Uniform integer in `[low, high)`
    ///
    /// # Panics
    /// Panics if `low >= high`
    pub fn range(&mut self, low: usize, high: usize) -> usize {
        assert!(low < high, "low must be less than high");
        low + (self.next_u64() % (high - low) as u64) as usize
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Current internal state
    pub fn state(&self) -> u64 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        assert_eq!(EngineRng::new(0).state(), 1);
    }

    #[test]
    #[should_panic(expected = "low must be less than high")]
    fn test_range_invalid_bounds() {
        EngineRng::new(1).range(5, 5);
    }

    #[test]
    fn test_next_f64_in_unit_interval() {
        let mut rng = EngineRng::new(99);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "value {} outside [0, 1)", v);
        }
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = EngineRng::new(7);
        assert!((0..100).all(|_| !rng.chance(0.0)));
        assert!((0..100).all(|_| rng.chance(1.0)));
    }
}
