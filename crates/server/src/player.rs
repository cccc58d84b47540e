//! Player identity.

use uuid::Uuid;

/// A connected player.
///
/// Identity requires both the generated id and the display name to
/// match, so constructing a new `Player` always yields a new identity
/// even for a repeated username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Player {
    id: Uuid,
    username: String,
}

impl Player {
    /// Create a player with a fresh identity.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_username_is_a_new_identity() {
        let a = Player::new("viper");
        let b = Player::new("viper");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
