//! Orb generation and the replenishment policy.

use crate::config::Config;
use protocol::{Orb, OrbSize, Position};
use rand::Rng;
use std::collections::HashMap;

/// Display colors assigned to generated orbs.
const PALETTE: [&str; 8] = [
    "ff0000", "24f51e", "221fdc", "811fdc", "1fd9dc", "ff6d00", "fdff00", "ff00b2",
];

/// Pick a random display color from the palette.
pub fn random_color() -> String {
    let mut rng = rand::rng();
    format!("#{}", PALETTE[rng.random_range(0..PALETTE.len())])
}

/// Replenishment policy for a match's collectible orbs.
#[derive(Debug, Clone)]
pub struct OrbGenerator {
    max_count: usize,
    min_coord: f64,
    max_coord: f64,
    small_weight: f64,
}

impl OrbGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            max_count: config.orb.max_count,
            min_coord: -config.arena.half_extent + config.orb.margin,
            max_coord: config.arena.half_extent - config.orb.margin,
            small_weight: config.orb.small_weight,
        }
    }

    /// Top the store up to the natural cap plus the death-orb headroom.
    ///
    /// Positions are keyed exactly, so inserting by position keeps the
    /// one-orb-per-position invariant; the loop runs until the store
    /// holds exactly `max_count + death_orb_count` orbs.
    pub fn replenish(&self, orbs: &mut HashMap<Position, Orb>, death_orb_count: usize) {
        let target = self.max_count + death_orb_count;
        let mut rng = rand::rng();
        while orbs.len() < target {
            let position = Position::rounded(
                rng.random_range(self.min_coord..=self.max_coord),
                rng.random_range(self.min_coord..=self.max_coord),
            );
            let orb = Orb {
                position,
                orb_size: self.random_size(&mut rng),
                color: random_color(),
            };
            orbs.insert(position, orb);
        }
    }

    fn random_size(&self, rng: &mut impl Rng) -> OrbSize {
        if rng.random_bool(self.small_weight) {
            OrbSize::Small
        } else {
            OrbSize::Large
        }
    }
}
