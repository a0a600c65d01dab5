// jitter.rs - Deterministic pseudo-random source for timing and sound variance

//! Seeded jitter used by the timeline compiler and the synthesis tier.
//!
//! Re-activating the boot sequence must reproduce bit-identical timing, so
//! this is a pure function of `(seed, index)` with no global random state.
//! The exact algorithm is part of the engine contract; tests assert
//! literal values.

/// Knuth multiplicative constant used to mix the event index into the
/// seed hash.
const INDEX_MIX: u32 = 2_654_435_761;

/// Deterministic pseudo-random value in `[0, 1)`.
///
/// The seed string is folded into a wrapping 32-bit accumulator
/// (`hash = hash * 31 + char`), mixed with `(index + 1) * INDEX_MIX` via
/// XOR, and reduced mod 1000.
pub fn pseudo_random(seed: &str, index: u32) -> f64 {
    let mut hash: u32 = 0;
    for ch in seed.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(ch as u32);
    }
    hash ^= index.wrapping_add(1).wrapping_mul(INDEX_MIX);
    f64::from(hash % 1000) / 1000.0
}
