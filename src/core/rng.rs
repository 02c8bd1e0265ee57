//! Deterministic seeding helpers.
//!
//! The dungeon engine never touches an ambient random source. Every roll is
//! derived from a string key (run id, floor, item id...) hashed into a `u64`
//! and fed to a `ChaCha8Rng`, so a replayed run rolls the same values.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable 64-bit FNV-1a hash of a string.
///
/// Unlike `std`'s `DefaultHasher` the output is fixed across compiler
/// releases, which matters because seeds end up in save files.
pub fn hash_seed(key: &str) -> u64 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Builds a seed from `parts` joined with `:`.
pub fn seed_from_parts(parts: &[&str]) -> u64 {
    hash_seed(&parts.join(":"))
}

/// Creates a generator for a seed.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Uniform value in `[0, 1)` for a seed.
pub fn seeded_unit(seed: u64) -> f64 {
    seeded_rng(seed).gen::<f64>()
}

/// Uniform integer in `[min, max]` for a seed. Returns `min` when the range is empty.
pub fn seeded_range(seed: u64, min: u32, max: u32) -> u32 {
    if max <= min {
        return min;
    }
    seeded_rng(seed).gen_range(min..=max)
}
