//! Per-match score board.

use crate::player::Player;
use protocol::LeaderboardEntry;
use std::collections::HashMap;

/// Score board for one match; same lifetime as its match state.
#[derive(Debug)]
pub struct Leaderboard {
    scores: HashMap<Player, i64>,
    initial_score: i64,
}

impl Leaderboard {
    pub fn new(initial_score: i64) -> Self {
        Self {
            scores: HashMap::new(),
            initial_score,
        }
    }

    /// Add a player at the initial score. Returns false (and changes
    /// nothing) if the player is already present.
    pub fn add_player(&mut self, player: Player) -> bool {
        if self.scores.contains_key(&player) {
            return false;
        }
        self.scores.insert(player, self.initial_score);
        true
    }

    /// Remove a player. Returns false if they were not present.
    pub fn remove_player(&mut self, player: &Player) -> bool {
        self.scores.remove(player).is_some()
    }

    pub fn score(&self, player: &Player) -> Option<i64> {
        self.scores.get(player).copied()
    }

    /// Overwrite a player's score. No-op (false) if they are absent.
    pub fn set_score(&mut self, player: &Player, score: i64) -> bool {
        match self.scores.get_mut(player) {
            Some(current) => {
                *current = score;
                true
            }
            None => false,
        }
    }

    /// Add to a player's score. No-op (false) if they are absent.
    pub fn add_score(&mut self, player: &Player, delta: i64) -> bool {
        match self.scores.get_mut(player) {
            Some(current) => {
                *current += delta;
                true
            }
            None => false,
        }
    }

    /// Sorted snapshot, highest score first (ties broken by username
    /// for a stable broadcast order).
    pub fn snapshot(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .scores
            .iter()
            .map(|(player, &score)| LeaderboardEntry {
                username: player.username().to_string(),
                score,
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.username.cmp(&b.username)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_player_starts_at_initial_score() {
        let mut board = Leaderboard::new(20);
        let player = Player::new("viper");
        assert!(board.add_player(player.clone()));
        assert_eq!(board.score(&player), Some(20));
        // Re-adding the same identity is a no-op.
        assert!(!board.add_player(player.clone()));
        assert_eq!(board.score(&player), Some(20));
    }

    #[test]
    fn test_score_round_trip() {
        let mut board = Leaderboard::new(20);
        let player = Player::new("viper");
        board.add_player(player.clone());
        assert!(board.set_score(&player, 45));
        assert_eq!(board.score(&player), Some(45));
        assert!(board.add_score(&player, 5));
        assert_eq!(board.score(&player), Some(50));
        assert!(board.remove_player(&player));
        assert_eq!(board.score(&player), None);
        assert!(!board.set_score(&player, 99));
        assert!(!board.remove_player(&player));
    }

    #[test]
    fn test_snapshot_is_sorted_highest_first() {
        let mut board = Leaderboard::new(20);
        let a = Player::new("ada");
        let b = Player::new("brin");
        let c = Player::new("curt");
        board.add_player(a.clone());
        board.add_player(b.clone());
        board.add_player(c.clone());
        board.set_score(&b, 60);
        board.set_score(&c, 5);

        let snapshot = board.snapshot();
        let names: Vec<&str> = snapshot.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["brin", "ada", "curt"]);
        assert_eq!(snapshot[0].score, 60);
    }
}
