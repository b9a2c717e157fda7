//! Injectable random source.
//!
//! The session never calls a global RNG. Production code uses a `StdRng`
//! seeded from the OS; tests substitute a `ScriptedRandom` that replays a
//! fixed list of unit draws so spin outcomes are exactly reproducible.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform integer in `0..n`. Returns 0 when `n` is 0.
    fn next_below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let v = (self.next_unit() * n as f64).floor() as u32;
        v.min(n - 1)
    }
}

impl RandomSource for StdRng {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// OS-seeded generator for interactive sessions.
pub fn session_rng() -> StdRng {
    StdRng::from_os_rng()
}

/// Deterministic generator for replays and reproducible demos.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Replays a fixed sequence of unit draws, then repeats `fallback`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    draws: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            fallback: 0.0,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        let v = self.draws.pop_front().unwrap_or(self.fallback);
        // Keep scripted values inside the documented half-open range.
        v.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_random_replays_then_falls_back() {
        let mut rng = ScriptedRandom::new([0.25, 0.75]).with_fallback(0.5);
        assert_eq!(rng.next_unit(), 0.25);
        assert_eq!(rng.next_unit(), 0.75);
        assert_eq!(rng.remaining(), 0);
        assert_eq!(rng.next_unit(), 0.5);
    }

    #[test]
    fn scripted_random_clamps_to_unit_range() {
        let mut rng = ScriptedRandom::new([1.0, -3.0]);
        assert!(rng.next_unit() < 1.0);
        assert_eq!(rng.next_unit(), 0.0);
    }

    #[test]
    fn next_below_stays_in_range() {
        let mut rng = ScriptedRandom::new([0.0, 0.5, 0.999_999]);
        assert_eq!(rng.next_below(5), 0);
        assert_eq!(rng.next_below(5), 2);
        assert_eq!(rng.next_below(5), 4);
        assert_eq!(rng.next_below(0), 0);
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let mut a = seeded_rng(42);
        let mut b = seeded_rng(42);
        for _ in 0..16 {
            let x = a.next_unit();
            assert_eq!(x, b.next_unit());
            assert!((0.0..1.0).contains(&x));
        }
    }
}
