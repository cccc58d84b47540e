//! Per-match authoritative game state.
//!
//! `MatchState` owns every live player's body chain, the two derived
//! collision indices (own cells and everyone-else's cells), and the
//! match's orb store. All methods mutate state and return reports; the
//! session layer performs the actual socket broadcasts after the
//! per-match mutation completes, so one lock acquisition covers the
//! whole apply/collide unit.

use crate::config::Config;
use crate::error::GameError;
use crate::orb::{self, OrbGenerator};
use crate::player::Player;
use protocol::{Orb, OrbSize, Position};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// What the session layer must broadcast after a death.
#[derive(Debug)]
pub struct DeathReport {
    /// The dead snake's reported cells, for `OTHER_USER_DIED`.
    pub removed_positions: Vec<Position>,
}

/// Result of a collision check, in strict priority order.
#[derive(Debug)]
pub enum CollisionOutcome {
    None,
    /// The head left the arena; the player is already removed and
    /// their death orbs spawned.
    BoundaryDeath(DeathReport),
    /// The head hit another snake's cell; same handling as boundary.
    PlayerDeath(DeathReport),
    /// One or more orbs were consumed and the snake grew.
    OrbsConsumed {
        score_delta: i64,
        new_body_parts: Vec<Position>,
    },
}

/// Authoritative state for one match.
#[derive(Debug)]
pub struct MatchState {
    game_code: String,
    arena_half_extent: f64,
    segment_radius: f64,
    spawn: crate::config::SnakeConfig,
    orb_generator: OrbGenerator,
    /// Orb store keyed by exact position: at most one orb per cell.
    orbs: HashMap<Position, Orb>,
    /// Running count of orbs spawned from eliminated players. Death
    /// orbs are additive headroom over the natural cap.
    death_orb_count: usize,
    /// Per-player body chain, head first.
    bodies: HashMap<Player, VecDeque<Position>>,
    /// Cells each player occupies, as reported through movement.
    own_positions: HashMap<Player, HashSet<Position>>,
    /// Cells occupied by every *other* live player, kept in lockstep
    /// with `own_positions` for O(1) collision lookups.
    others_positions: HashMap<Player, HashSet<Position>>,
}

impl MatchState {
    pub fn new(game_code: String, config: &Config) -> Self {
        Self {
            game_code,
            arena_half_extent: config.arena.half_extent,
            segment_radius: config.arena.segment_radius,
            spawn: config.snake.clone(),
            orb_generator: OrbGenerator::new(config),
            orbs: HashMap::new(),
            death_orb_count: 0,
            bodies: HashMap::new(),
            own_positions: HashMap::new(),
            others_positions: HashMap::new(),
        }
    }

    pub fn game_code(&self) -> &str {
        &self.game_code
    }

    /// Register a player with empty indices.
    pub fn add_player(&mut self, player: Player) {
        self.bodies.entry(player.clone()).or_default();
        self.own_positions.entry(player.clone()).or_default();
        self.others_positions.entry(player).or_default();
    }

    pub fn has_player(&self, player: &Player) -> bool {
        self.bodies.contains_key(player)
    }

    /// Seed a fresh snake at the fixed spawn column and return its
    /// segments for the broadcast to the other sockets. The collision
    /// indices stay empty until the client reports movement.
    pub fn create_snake(&mut self, player: &Player) -> Vec<Position> {
        let mut segments = Vec::with_capacity(self.spawn.initial_length);
        let body = self.bodies.entry(player.clone()).or_default();
        for i in 0..self.spawn.initial_length {
            let position = Position::new(
                self.spawn.spawn_x,
                self.spawn.spawn_y + self.spawn.segment_spacing * i as f64,
            );
            segments.push(position);
            body.push_back(position);
        }
        segments
    }

    /// Apply one tick of movement: prepend the new head, pop the tail.
    ///
    /// The claimed tail must equal the chain's current last element;
    /// otherwise the client has desynchronized and the call fails with
    /// no mutation at all. On success the add/remove pair is also
    /// reflected into every other live player's others index.
    pub fn apply_movement(
        &mut self,
        player: &Player,
        new_head: Position,
        removed_tail: Position,
    ) -> Result<(), GameError> {
        let body = self.bodies.get_mut(player).ok_or(GameError::MissingGameState)?;
        if body.back() != Some(&removed_tail) {
            debug!(
                "stale tail from {}: claimed {:?}, actual {:?}",
                player.username(),
                removed_tail,
                body.back()
            );
            return Err(GameError::StaleTailMismatch);
        }
        body.push_front(new_head);
        body.pop_back();

        let own = self.own_positions.entry(player.clone()).or_default();
        own.insert(new_head);
        own.remove(&removed_tail);

        for (other, cells) in self.others_positions.iter_mut() {
            if other != player {
                cells.insert(new_head);
                cells.remove(&removed_tail);
            }
        }
        Ok(())
    }

    /// Evaluate the consequences of a head arriving at `head`:
    /// boundary death, then player-vs-player death, then orb
    /// consumption. Death and consumption mutate the state in place;
    /// the outcome tells the caller what to broadcast.
    pub fn check_collision(&mut self, player: &Player, head: Position) -> CollisionOutcome {
        let r = self.segment_radius;
        let half = self.arena_half_extent;

        if head.x - r <= -half || head.x + r >= half || head.y - r <= -half || head.y + r >= half {
            debug!("{} hit the arena boundary", player.username());
            return CollisionOutcome::BoundaryDeath(self.kill(player));
        }

        let hit_other = self
            .others_positions
            .get(player)
            .is_some_and(|cells| cells.iter().any(|cell| head.distance(cell) <= r));
        if hit_other {
            debug!("{} collided with another snake", player.username());
            return CollisionOutcome::PlayerDeath(self.kill(player));
        }

        let consumed: Vec<Orb> = self
            .orbs
            .values()
            .filter(|orb| head.distance(&orb.position) <= r)
            .cloned()
            .collect();
        if consumed.is_empty() {
            return CollisionOutcome::None;
        }

        let mut score_delta = 0i64;
        let mut new_body_parts = Vec::new();
        for orb in &consumed {
            self.remove_orb(&orb.position);
            score_delta += i64::from(orb.orb_size.value());
            for _ in 0..orb.orb_size.value() {
                let part = self.next_growth_position(player);
                self.append_segment(player, part);
                new_body_parts.push(part);
            }
        }
        CollisionOutcome::OrbsConsumed {
            score_delta,
            new_body_parts,
        }
    }

    /// Disconnect path: drop the player from every index and strip
    /// their cells from everyone else's others index. No death orbs.
    pub fn remove_player(&mut self, player: &Player) -> Vec<Position> {
        let removed: Vec<Position> = self
            .own_positions
            .remove(player)
            .map(|cells| cells.into_iter().collect())
            .unwrap_or_default();
        self.bodies.remove(player);
        self.others_positions.remove(player);
        for cells in self.others_positions.values_mut() {
            for position in &removed {
                cells.remove(position);
            }
        }
        removed
    }

    /// Death path: remove the player and dissolve every 4th body
    /// segment into a LARGE death orb.
    fn kill(&mut self, player: &Player) -> DeathReport {
        let body: Vec<Position> = self
            .bodies
            .get(player)
            .map(|chain| chain.iter().copied().collect())
            .unwrap_or_default();
        let removed_positions = self.remove_player(player);
        self.spawn_death_orbs(&body);
        DeathReport { removed_positions }
    }

    fn spawn_death_orbs(&mut self, body: &[Position]) {
        for (i, &position) in body.iter().enumerate() {
            if i % 4 != 0 {
                continue;
            }
            self.orbs.insert(
                position,
                Orb {
                    position,
                    orb_size: OrbSize::Large,
                    color: orb::random_color(),
                },
            );
            self.death_orb_count += 1;
        }
    }

    /// Where the next growth segment goes: seed position for an empty
    /// chain, one spacing below a single segment, otherwise the
    /// trailing vector reflected backward from the tail.
    fn next_growth_position(&self, player: &Player) -> Position {
        let body = match self.bodies.get(player) {
            Some(body) => body,
            None => return Position::new(self.spawn.spawn_x, self.spawn.spawn_y),
        };
        match body.len() {
            0 => Position::new(self.spawn.spawn_x, self.spawn.spawn_y),
            1 => {
                let only = body[0];
                Position::rounded(only.x, only.y + self.spawn.segment_spacing)
            }
            len => {
                let tail = body[len - 1];
                let second_last = body[len - 2];
                Position::rounded(
                    tail.x - (second_last.x - tail.x),
                    tail.y - (second_last.y - tail.y),
                )
            }
        }
    }

    fn append_segment(&mut self, player: &Player, part: Position) {
        if let Some(body) = self.bodies.get_mut(player) {
            body.push_back(part);
        }
        if let Some(own) = self.own_positions.get_mut(player) {
            own.insert(part);
        }
        for (other, cells) in self.others_positions.iter_mut() {
            if other != player {
                cells.insert(part);
            }
        }
    }

    /// Insert an orb, replacing whatever occupied its position.
    pub fn insert_orb(&mut self, orb: Orb) {
        self.orbs.insert(orb.position, orb);
    }

    /// Remove the orb at an exact position; identity is position-only,
    /// so size and color never matter.
    pub fn remove_orb(&mut self, position: &Position) -> bool {
        self.orbs.remove(position).is_some()
    }

    /// Top the orb store up to the natural cap plus death-orb headroom.
    pub fn replenish_orbs(&mut self) {
        self.orb_generator.replenish(&mut self.orbs, self.death_orb_count);
    }

    /// Full orb set for a `SEND_ORBS` broadcast.
    pub fn orb_snapshot(&self) -> Vec<Orb> {
        self.orbs.values().cloned().collect()
    }

    pub fn orb_count(&self) -> usize {
        self.orbs.len()
    }

    pub fn death_orb_count(&self) -> usize {
        self.death_orb_count
    }

    #[cfg(test)]
    fn body_of(&self, player: &Player) -> Vec<Position> {
        self.bodies
            .get(player)
            .map(|chain| chain.iter().copied().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn others_index_of(&self, player: &Player) -> HashSet<Position> {
        self.others_positions.get(player).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_state() -> MatchState {
        MatchState::new("ABCDEF".to_string(), &Config::default())
    }

    fn small_orb(x: f64, y: f64) -> Orb {
        Orb {
            position: Position::new(x, y),
            orb_size: OrbSize::Small,
            color: "#ff0000".to_string(),
        }
    }

    fn large_orb(x: f64, y: f64) -> Orb {
        Orb {
            position: Position::new(x, y),
            orb_size: OrbSize::Large,
            color: "#24f51e".to_string(),
        }
    }

    /// Walk a freshly spawned snake through `steps` movement ticks so
    /// its own-position index matches its body chain.
    fn walk(state: &mut MatchState, player: &Player, start: Position, steps: usize) -> Position {
        let mut head = start;
        for i in 1..=steps {
            let next = Position::new(start.x + 10.0 * i as f64, start.y);
            let tail = *state.bodies.get(player).unwrap().back().unwrap();
            state.apply_movement(player, next, tail).unwrap();
            head = next;
        }
        head
    }

    #[test]
    fn test_create_snake_seeds_twenty_segments() {
        let mut state = match_state();
        let player = Player::new("viper");
        state.add_player(player.clone());
        let segments = state.create_snake(&player);
        assert_eq!(segments.len(), 20);
        assert_eq!(segments[0], Position::new(600.0, 100.0));
        assert_eq!(segments[19], Position::new(600.0, 195.0));
        assert_eq!(state.body_of(&player), segments);
    }

    #[test]
    fn test_apply_movement_rejects_stale_tail() {
        let mut state = match_state();
        let player = Player::new("viper");
        state.add_player(player.clone());
        let a = Position::new(0.0, 0.0);
        let b = Position::new(0.0, 5.0);
        let c = Position::new(0.0, 10.0);
        state.bodies.get_mut(&player).unwrap().extend([a, b, c]);

        // Claiming B (not the tail) must fail and leave the chain alone.
        let err = state
            .apply_movement(&player, Position::new(0.0, -5.0), b)
            .unwrap_err();
        assert!(matches!(err, GameError::StaleTailMismatch));
        assert_eq!(state.body_of(&player), vec![a, b, c]);

        // Claiming the true tail succeeds: [new, A, B].
        let new_head = Position::new(0.0, -5.0);
        state.apply_movement(&player, new_head, c).unwrap();
        assert_eq!(state.body_of(&player), vec![new_head, a, b]);
    }

    #[test]
    fn test_movement_maintains_both_indices() {
        let mut state = match_state();
        let mover = Player::new("mover");
        let watcher = Player::new("watcher");
        state.add_player(mover.clone());
        state.add_player(watcher.clone());
        state.create_snake(&mover);

        let head = Position::new(10.0, 10.0);
        let tail = Position::new(600.0, 195.0);
        state.apply_movement(&mover, head, tail).unwrap();

        assert!(state.own_positions.get(&mover).unwrap().contains(&head));
        let watcher_view = state.others_index_of(&watcher);
        assert!(watcher_view.contains(&head));
        assert!(!watcher_view.contains(&tail));
        // The mover never sees their own cells in their others index.
        assert!(state.others_index_of(&mover).is_empty());
    }

    #[test]
    fn test_boundary_death_at_exact_threshold() {
        // |coord| >= 1500 - 35 dies; anything short of it lives.
        for (head, deadly) in [
            (Position::new(1465.0, 0.0), true),
            (Position::new(-1465.0, 0.0), true),
            (Position::new(0.0, 1465.0), true),
            (Position::new(0.0, -1465.0), true),
            (Position::new(1464.9, 0.0), false),
            (Position::new(0.0, -1464.9), false),
        ] {
            let mut state = match_state();
            let player = Player::new("viper");
            state.add_player(player.clone());
            state.create_snake(&player);
            let outcome = state.check_collision(&player, head);
            match outcome {
                CollisionOutcome::BoundaryDeath(_) => assert!(deadly, "unexpected death at {head:?}"),
                CollisionOutcome::None => assert!(!deadly, "expected death at {head:?}"),
                other => panic!("unexpected outcome at {head:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_player_collision_within_radius() {
        let mut state = match_state();
        let mover = Player::new("mover");
        let other = Player::new("other");
        state.add_player(mover.clone());
        state.add_player(other.clone());
        state.create_snake(&mover);
        state.create_snake(&other);

        // The other snake reports a cell at (100, 100).
        state
            .apply_movement(&other, Position::new(100.0, 100.0), Position::new(600.0, 195.0))
            .unwrap();

        // Distance 40: survives.
        let outcome = state.check_collision(&mover, Position::new(140.0, 100.0));
        assert!(matches!(outcome, CollisionOutcome::None));

        // Distance 10: dies, and the corpse is gone from the indices.
        let outcome = state.check_collision(&mover, Position::new(110.0, 100.0));
        assert!(matches!(outcome, CollisionOutcome::PlayerDeath(_)));
        assert!(!state.has_player(&mover));
        assert!(state.has_player(&other));
    }

    #[test]
    fn test_death_converts_every_fourth_segment_to_large_orb() {
        let mut state = match_state();
        let player = Player::new("viper");
        state.add_player(player.clone());
        let segments = state.create_snake(&player);
        assert_eq!(segments.len(), 20);

        let outcome = state.check_collision(&player, Position::new(1500.0, 0.0));
        assert!(matches!(outcome, CollisionOutcome::BoundaryDeath(_)));
        assert_eq!(state.death_orb_count(), 5);
        assert_eq!(state.orb_count(), 5);
        for i in [0usize, 4, 8, 12, 16] {
            let expected = segments[i];
            let orb = state.orbs.get(&expected).expect("death orb missing");
            assert_eq!(orb.orb_size, OrbSize::Large);
        }
    }

    #[test]
    fn test_death_report_carries_reported_cells() {
        let mut state = match_state();
        let mover = Player::new("mover");
        let watcher = Player::new("watcher");
        state.add_player(mover.clone());
        state.add_player(watcher.clone());
        state.create_snake(&mover);
        state.create_snake(&watcher);

        let head = walk(&mut state, &mover, Position::new(0.0, 0.0), 3);
        assert!(state.others_index_of(&watcher).contains(&head));

        let outcome = state.check_collision(&mover, Position::new(1465.0, 0.0));
        let report = match outcome {
            CollisionOutcome::BoundaryDeath(report) => report,
            other => panic!("expected boundary death, got {other:?}"),
        };
        assert_eq!(report.removed_positions.len(), 3);
        // The watcher's index no longer holds any of the corpse cells.
        let watcher_view = state.others_index_of(&watcher);
        for position in &report.removed_positions {
            assert!(!watcher_view.contains(position));
        }
    }

    #[test]
    fn test_orb_identity_is_position_only() {
        let mut state = match_state();
        state.insert_orb(small_orb(50.0, 50.0));
        state.insert_orb(large_orb(50.0, 50.0));
        // Same position: the store holds a single orb.
        assert_eq!(state.orb_count(), 1);
        assert!(state.remove_orb(&Position::new(50.0, 50.0)));
        assert_eq!(state.orb_count(), 0);
        assert!(!state.remove_orb(&Position::new(50.0, 50.0)));
    }

    #[test]
    fn test_orb_consumption_scores_and_grows() {
        let mut state = match_state();
        let player = Player::new("viper");
        state.add_player(player.clone());
        state.create_snake(&player);
        state.insert_orb(large_orb(10.0, 10.0));

        let head = Position::new(10.0, 10.0);
        state
            .apply_movement(&player, head, Position::new(600.0, 195.0))
            .unwrap();
        let outcome = state.check_collision(&player, head);
        let (score_delta, new_body_parts) = match outcome {
            CollisionOutcome::OrbsConsumed {
                score_delta,
                new_body_parts,
            } => (score_delta, new_body_parts),
            other => panic!("expected consumption, got {other:?}"),
        };
        assert_eq!(score_delta, 5);
        assert_eq!(new_body_parts.len(), 5);
        assert_eq!(state.orb_count(), 0);
        // Growth landed on the chain: 20 seeded + 5 new segments.
        assert_eq!(state.body_of(&player).len(), 25);
    }

    #[test]
    fn test_growth_continues_the_trailing_direction() {
        let mut state = match_state();
        let player = Player::new("viper");
        state.add_player(player.clone());
        // Tail at (0, 10); second-last at (0, 5): growth extends to (0, 15).
        state
            .bodies
            .get_mut(&player)
            .unwrap()
            .extend([Position::new(0.0, 0.0), Position::new(0.0, 5.0), Position::new(0.0, 10.0)]);
        assert_eq!(state.next_growth_position(&player), Position::new(0.0, 15.0));

        // A single segment grows one spacing along +y.
        let mut state = match_state();
        let player = Player::new("solo");
        state.add_player(player.clone());
        state
            .bodies
            .get_mut(&player)
            .unwrap()
            .push_back(Position::new(42.0, 7.0));
        assert_eq!(state.next_growth_position(&player), Position::new(42.0, 12.0));

        // An empty chain seeds at the fixed spawn point.
        let mut state = match_state();
        let player = Player::new("empty");
        state.add_player(player.clone());
        assert_eq!(state.next_growth_position(&player), Position::new(600.0, 100.0));
    }

    #[test]
    fn test_boundary_short_circuits_orb_consumption() {
        let mut state = match_state();
        let player = Player::new("viper");
        state.add_player(player.clone());
        state.create_snake(&player);
        state.insert_orb(small_orb(1465.0, 0.0));

        let outcome = state.check_collision(&player, Position::new(1465.0, 0.0));
        assert!(matches!(outcome, CollisionOutcome::BoundaryDeath(_)));
        // The overlapping orb was not consumed; death orbs joined it.
        assert!(state.orbs.contains_key(&Position::new(1465.0, 0.0)));
    }
}
