//! Deterministic PRNG based on the Xorshift64 algorithm.
//!
//! Scatter placement, jitter, random coloring and glyph selection all draw
//! from one of these so a field built with the same seed evolves identically
//! on every platform.

use serde::{Deserialize, Serialize};

use crate::vector::Vector2;

/// Xorshift64 deterministic PRNG. Same seed always produces the same sequence.
///
/// Uses the standard shift parameters (13, 7, 17). Seed of 0 is replaced with
/// a non-zero fallback to avoid the all-zeros fixed point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    const FALLBACK_SEED: u64 = 0x5EED_DEAD_BEEF_CAFE;

    /// Creates a new PRNG with the given seed (0 is remapped).
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { Self::FALLBACK_SEED } else { seed },
        }
    }

    /// Advances the state and returns the next 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform f64 in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform f64 in [min, max).
    pub fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Uniform f64 in [-magnitude, magnitude).
    pub fn next_signed(&mut self, magnitude: f64) -> f64 {
        self.next_range(-magnitude, magnitude)
    }

    /// Uniform usize in [0, max). Returns 0 when `max` is 0.
    pub fn next_usize(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }

    /// Returns true with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Independent per-axis offset in [-magnitude, magnitude).
    pub fn jitter(&mut self, magnitude: f64) -> Vector2 {
        let x = self.next_signed(magnitude);
        let y = self.next_signed(magnitude);
        Vector2::new(x, y)
    }

    /// Uniform point inside `[0, width) x [0, height)`.
    pub fn point_in(&mut self, width: f64, height: f64) -> Vector2 {
        let x = self.next_range(0.0, width);
        let y = self.next_range(0.0, height);
        Vector2::new(x, y)
    }
}
