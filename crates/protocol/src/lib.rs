//! Shared protocol crate for slither-plus.
//!
//! This crate contains:
//! - The JSON message envelope exchanged with clients
//! - Shared wire types (Position, Orb, LeaderboardEntry)
//! - Encode/decode helpers

mod error;
pub mod messages;

pub use error::ProtocolError;
pub use messages::{decode, encode, ClientMessage, ServerMessage};

use serde::{Deserialize, Serialize};

/// A 2D coordinate on the arena.
///
/// Equality and hashing are exact (bitwise on the IEEE representation),
/// with no tolerance, so positions can key the position-indexed stores
/// used for collision lookups and orb identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Build a position with both coordinates rounded to two decimal
    /// places, the precision every server-generated coordinate uses.
    pub fn rounded(x: f64, y: f64) -> Self {
        Self {
            x: round2(x),
            y: round2(y),
        }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits() && self.y.to_bits() == other.y.to_bits()
    }
}

impl Eq for Position {}

impl std::hash::Hash for Position {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Size class of a collectible orb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrbSize {
    Small,
    Large,
}

impl OrbSize {
    /// Score (and growth segments) awarded when consumed.
    pub fn value(&self) -> u32 {
        match self {
            OrbSize::Small => 1,
            OrbSize::Large => 5,
        }
    }
}

/// A collectible orb as rendered by clients.
///
/// Identity within a match is keyed solely by position; size and color
/// are display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orb {
    pub position: Position,
    pub orb_size: OrbSize,
    /// Display color, a `#rrggbb` string.
    pub color: String,
}

/// One row of the per-match score board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_position_equality_is_exact() {
        assert_eq!(Position::new(1.5, -2.25), Position::new(1.5, -2.25));
        assert_ne!(Position::new(1.5, -2.25), Position::new(1.5, -2.2500001));
    }

    #[test]
    fn test_position_hashes_by_value() {
        let mut set = HashSet::new();
        set.insert(Position::new(600.0, 100.0));
        assert!(set.contains(&Position::new(600.0, 100.0)));
        assert!(!set.contains(&Position::new(600.0, 100.01)));
    }

    #[test]
    fn test_rounded_keeps_two_decimals() {
        let p = Position::rounded(1.005 + 0.0011, -3.333);
        assert_eq!(p, Position::new(1.01, -3.33));
    }

    #[test]
    fn test_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_orb_values() {
        assert_eq!(OrbSize::Small.value(), 1);
        assert_eq!(OrbSize::Large.value(), 5);
    }
}
