// src/core/key.rs

//! Explicit pseudorandom keys.
//!
//! Randomness is never drawn from hidden global state during execution.
//! A [`PrngKey`] is a small value that deterministically seeds a generator;
//! every stochastic draw first [splits](PrngKey::split) the current key so
//! that no key is ever used twice.

use rand::SeedableRng;
use rand::distr::{Distribution, StandardUniform};
use rand::rngs::StdRng;
use std::fmt;

/// A splittable pseudorandom key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrngKey(u64);

impl PrngKey {
    /// Creates a key from an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Draws a fresh key from the thread-local entropy source.
    ///
    /// Only used once, when an interpreter is built without a seed.
    pub fn from_entropy() -> Self {
        Self(rand::random::<u64>())
    }

    /// Returns the raw seed value.
    pub fn seed(&self) -> u64 {
        self.0
    }

    /// Derives two new independent keys.
    ///
    /// The first is meant to replace the current key, the second to be
    /// consumed by exactly one draw.
    pub fn split(self) -> (PrngKey, PrngKey) {
        let mut rng = StdRng::seed_from_u64(self.0);
        let carry: u64 = StandardUniform.sample(&mut rng);
        let draw: u64 = StandardUniform.sample(&mut rng);
        (PrngKey(carry), PrngKey(draw))
    }

    /// Builds a generator seeded from this key.
    pub fn rng(self) -> StdRng {
        StdRng::seed_from_u64(self.0)
    }
}

impl fmt::Display for PrngKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrngKey({:#018x})", self.0)
    }
}
