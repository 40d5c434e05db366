//! Random resource names.
//!
//! Generated names append five characters drawn from consonants and digits.
//! Dropping vowels keeps the suffix from spelling accidental words; the
//! remaining 31-character alphabet still gives ~28.6 million suffixes, and
//! creation retries on the rare collision anyway.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::{SeedableRng, thread_rng};

/// The suffix alphabet: consonants and digits, no vowels.
pub const NAME_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxyz0123456789";

/// Number of characters in a generated suffix.
pub const NAME_SUFFIX_LEN: usize = 5;

/// Default prefix for auto-generated namespace names.
pub const DEFAULT_NAME_PREFIX: &str = "kest-";

/// Draws a 5-character suffix from the given RNG.
pub fn random_suffix_with(rng: &mut impl Rng) -> String {
    (0..NAME_SUFFIX_LEN)
        .map(|_| NAME_ALPHABET[rng.gen_range(0..NAME_ALPHABET.len())] as char)
        .collect()
}

/// Draws a 5-character suffix from the thread RNG.
pub fn random_suffix() -> String {
    // SmallRng seeded per call: cheap, and keeps the thread RNG's state
    // independent of how many names a scenario draws.
    let mut rng = SmallRng::from_rng(thread_rng()).unwrap_or_else(|_| SmallRng::seed_from_u64(0));
    random_suffix_with(&mut rng)
}

/// `prefix` + 5-character random suffix.
pub fn generated_name(prefix: &str) -> String {
    format!("{prefix}{}", random_suffix())
}
