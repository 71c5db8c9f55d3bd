//! Random number generator abstraction for the tile solver.
//!
//! Cell selection, tile choice, fixed-tile scattering and the tile offer
//! queue all draw from a `TileRng`. Keeping it behind a trait lets tests pin
//! a seed and lets the solver hold its generator as a boxed trait object
//! inside a Bevy resource.
//!
//! # Example
//!
//! ```ignore
//! use island_core::rng::{StdRandom, TileRng};
//!
//! let mut rng = StdRandom::from_u64_seed(42);
//! let bounded = rng.next_usize_max(100); // 0..100
//! let float = rng.next_double(); // 0.0..1.0
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Trait for random number generators used by the solver.
///
/// Must stay dyn-compatible: the solver stores a `Box<dyn TileRng>`.
pub trait TileRng: TileRngClone + Send + Sync {
    /// Returns a random u64 over the full range.
    fn next_u64(&mut self) -> u64;

    /// Returns a random double in [0.0, 1.0).
    fn next_double(&mut self) -> f64;

    /// Returns a random usize in [0, max). Returns 0 when `max == 0`.
    fn next_usize_max(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }
}

/// Helper trait for cloning boxed `TileRng` trait objects.
pub trait TileRngClone {
    fn clone_box(&self) -> Box<dyn TileRng>;
}

impl<T: TileRng + Clone + 'static> TileRngClone for T {
    fn clone_box(&self) -> Box<dyn TileRng> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn TileRng> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Shuffle a slice in place using Fisher-Yates.
/// Free function since generic methods aren't dyn-compatible.
pub fn shuffle_with_rng<T>(slice: &mut [T], rng: &mut dyn TileRng) {
    for i in (1..slice.len()).rev() {
        let j = rng.next_usize_max(i + 1);
        slice.swap(i, j);
    }
}

/// Standard RNG wrapper around `rand::rngs::StdRng`.
#[derive(Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Create from a u64 seed.
    pub fn from_u64_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create from OS entropy (non-reproducible runs).
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, entropy-seeded otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_u64_seed(seed),
            None => Self::from_entropy(),
        }
    }
}

impl TileRng for StdRandom {
    fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }

    fn next_double(&mut self) -> f64 {
        self.rng.gen()
    }

    fn next_usize_max(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        self.rng.gen_range(0..max)
    }
}
