//! Display-name generation for players that join without one.

use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Sunny", "Sleepy", "Mellow", "Breezy", "Cozy", "Sandy", "Misty", "Lucky", "Gentle", "Peppy",
];

const NOUNS: &[&str] = &[
    "Otter", "Wombat", "Heron", "Badger", "Puffin", "Marmot", "Beaver", "Finch", "Tortoise",
    "Lynx",
];

/// Adjective + noun + two-digit suffix, e.g. `SleepyOtter42`.
///
/// The longest combination is 16 characters, so generated names always
/// satisfy the same pattern that validated names do. Uniqueness is
/// best-effort only; a collision with a live player is tolerated.
pub fn generate_name<R: Rng>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    let suffix = rng.gen_range(10..100);
    format!("{}{}{}", adjective, noun, suffix)
}
