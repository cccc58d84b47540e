//! Match code minting.

use rand::Rng;
use std::collections::HashSet;

/// Length of every match code.
pub const CODE_LENGTH: usize = 6;

/// Mint a code that is not present in `existing`.
///
/// Codes are 6 uppercase ASCII letters sampled uniformly; on collision
/// a fresh code is drawn. Codes are reused once a match is torn down.
pub fn generate(existing: &HashSet<String>) -> String {
    let mut code = random_code();
    while existing.contains(&code) {
        code = random_code();
    }
    code
}

fn random_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(b'A' + rng.random_range(0..26)))
        .collect()
}
