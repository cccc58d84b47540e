//! Session directory: routes per-socket messages to match state.
//!
//! The directory owns the socket/player/match-code maps; every match's
//! authoritative state sits behind its own mutex so all mutation for
//! one match is linearized while distinct matches proceed in parallel.
//! The directory lock is never held across a match-lock await: every
//! path resolves its context, drops the directory lock, then locks the
//! match.

use crate::config::Config;
use crate::error::GameError;
use crate::game::{CollisionOutcome, MatchState};
use crate::gamecode;
use crate::leaderboard::Leaderboard;
use crate::player::Player;
use protocol::{ClientMessage, Position, ServerMessage};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant};
use tracing::{debug, info};

/// Identifier for one websocket connection.
pub type ClientId = u32;

/// Outbound channel for one connection; the writer task drains it.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// Snapshot of a match's outbound channels, taken under the directory
/// lock and used for fire-and-forget sends after it is released.
struct Roster {
    senders: Vec<(ClientId, Outbound)>,
}

impl Roster {
    fn send(&self, target: ClientId, message: &ServerMessage) {
        for (id, sender) in &self.senders {
            if *id == target {
                if sender.send(message.clone()).is_err() {
                    debug!("client {target} outbound channel closed");
                }
                return;
            }
        }
    }

    fn send_all(&self, message: &ServerMessage) {
        for (id, sender) in &self.senders {
            if sender.send(message.clone()).is_err() {
                debug!("client {id} outbound channel closed");
            }
        }
    }

    fn send_except(&self, except: ClientId, message: &ServerMessage) {
        for (id, sender) in &self.senders {
            if *id != except && sender.send(message.clone()).is_err() {
                debug!("client {id} outbound channel closed");
            }
        }
    }
}

/// Everything the directory tracks for one running match.
struct MatchHandle {
    state: Arc<Mutex<MatchState>>,
    leaderboard: Arc<Mutex<Leaderboard>>,
    /// Sockets registered to this match.
    sockets: HashSet<ClientId>,
    /// Orb replenishment and score board broadcast tasks, aborted
    /// exactly once at teardown.
    timers: Vec<JoinHandle<()>>,
}

struct DirectoryInner {
    next_client_id: ClientId,
    outbound: HashMap<ClientId, Outbound>,
    socket_to_player: HashMap<ClientId, Player>,
    player_to_code: HashMap<Player, String>,
    matches: HashMap<String, MatchHandle>,
}

impl DirectoryInner {
    fn new() -> Self {
        Self {
            next_client_id: 1,
            outbound: HashMap::new(),
            socket_to_player: HashMap::new(),
            player_to_code: HashMap::new(),
            matches: HashMap::new(),
        }
    }

    fn roster(&self, code: &str) -> Roster {
        let senders = match self.matches.get(code) {
            Some(handle) => handle
                .sockets
                .iter()
                .filter_map(|id| self.outbound.get(id).map(|tx| (*id, tx.clone())))
                .collect(),
            None => Vec::new(),
        };
        Roster { senders }
    }
}

/// Routes inbound per-socket messages to the right match state and
/// owns the socket/player/match-code directories.
pub struct SessionDirectory {
    config: Config,
    weak_self: Weak<SessionDirectory>,
    inner: Mutex<DirectoryInner>,
}

impl SessionDirectory {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            config,
            weak_self: weak.clone(),
            inner: Mutex::new(DirectoryInner::new()),
        })
    }

    /// Register a new connection's outbound channel.
    pub async fn register(&self, outbound: Outbound) -> ClientId {
        let mut inner = self.inner.lock().await;
        let id = inner.next_client_id;
        inner.next_client_id += 1;
        inner.outbound.insert(id, outbound);
        id
    }

    /// Queue a message for one connection.
    pub async fn send_to(&self, client_id: ClientId, message: ServerMessage) {
        let inner = self.inner.lock().await;
        if let Some(sender) = inner.outbound.get(&client_id) {
            if sender.send(message).is_err() {
                debug!("client {client_id} outbound channel closed");
            }
        }
    }

    /// Decode and dispatch one inbound message. All failures are
    /// converted into a client-visible error response here; nothing
    /// propagates past the dispatch boundary.
    pub async fn handle_message(&self, client_id: ClientId, text: &str) {
        let message = match protocol::decode(text) {
            Ok(message) => message,
            Err(e) => {
                let joined = {
                    let inner = self.inner.lock().await;
                    inner.socket_to_player.contains_key(&client_id)
                };
                let msg = GameError::from(e).to_string();
                let response = if joined {
                    ServerMessage::Error { msg }
                } else {
                    ServerMessage::JoinError { msg }
                };
                self.send_to(client_id, response).await;
                return;
            }
        };

        match message {
            ClientMessage::NewClientNoCode { username } => {
                if let Err(e) = self.handle_new_game(client_id, username).await {
                    self.send_to(client_id, ServerMessage::JoinError { msg: e.to_string() })
                        .await;
                }
            }
            ClientMessage::NewClientWithCode {
                username,
                game_code,
            } => {
                if let Err(e) = self.handle_join_game(client_id, username, game_code).await {
                    self.send_to(client_id, ServerMessage::JoinError { msg: e.to_string() })
                        .await;
                }
            }
            ClientMessage::UpdatePosition { add, remove } => {
                if let Err(e) = self.handle_update_position(client_id, add, remove).await {
                    self.send_to(client_id, ServerMessage::Error { msg: e.to_string() })
                        .await;
                }
            }
        }
    }

    /// Create a player, a new match, a fresh code, a score board, and
    /// a spawn body.
    async fn handle_new_game(&self, client_id: ClientId, username: String) -> Result<(), GameError> {
        let player = Player::new(username);
        let (state, leaderboard, roster, code) = {
            let mut inner = self.inner.lock().await;
            if inner.socket_to_player.contains_key(&client_id) {
                return Err(GameError::ClientAlreadyExists);
            }
            let existing: HashSet<String> = inner.matches.keys().cloned().collect();
            let code = gamecode::generate(&existing);
            let state = Arc::new(Mutex::new(MatchState::new(code.clone(), &self.config)));
            let leaderboard = Arc::new(Mutex::new(Leaderboard::new(
                self.config.leaderboard.initial_score,
            )));
            let timers = self.spawn_match_timers(&code);
            inner.matches.insert(
                code.clone(),
                MatchHandle {
                    state: Arc::clone(&state),
                    leaderboard: Arc::clone(&leaderboard),
                    sockets: HashSet::from([client_id]),
                    timers,
                },
            );
            inner.socket_to_player.insert(client_id, player.clone());
            inner.player_to_code.insert(player.clone(), code.clone());
            let roster = inner.roster(&code);
            (state, leaderboard, roster, code)
        };

        leaderboard.lock().await.add_player(player.clone());
        {
            let mut state = state.lock().await;
            state.add_player(player.clone());
            let seeded = state.create_snake(&player);
            roster.send_except(
                client_id,
                &ServerMessage::IncreaseOtherLength {
                    new_body_parts: seeded,
                },
            );
        }
        roster.send_all(&ServerMessage::SetGameCode {
            game_code: code.clone(),
        });
        roster.send(
            client_id,
            &ServerMessage::JoinSuccess {
                msg: "New client added to new game".to_string(),
                game_code: code.clone(),
            },
        );
        info!("{} created match {}", player.username(), code);
        Ok(())
    }

    /// Join an existing match by code.
    async fn handle_join_game(
        &self,
        client_id: ClientId,
        username: String,
        game_code: String,
    ) -> Result<(), GameError> {
        let player = Player::new(username);
        let (state, leaderboard, roster) = {
            let mut inner = self.inner.lock().await;
            if inner.socket_to_player.contains_key(&client_id) {
                return Err(GameError::ClientAlreadyExists);
            }
            let handle = inner
                .matches
                .get_mut(&game_code)
                .ok_or(GameError::IncorrectGameCode)?;
            if !handle.sockets.insert(client_id) {
                return Err(GameError::SocketAlreadyExists);
            }
            let state = Arc::clone(&handle.state);
            let leaderboard = Arc::clone(&handle.leaderboard);
            inner.socket_to_player.insert(client_id, player.clone());
            inner.player_to_code.insert(player.clone(), game_code.clone());
            let roster = inner.roster(&game_code);
            (state, leaderboard, roster)
        };

        leaderboard.lock().await.add_player(player.clone());
        {
            let mut state = state.lock().await;
            state.add_player(player.clone());
            let seeded = state.create_snake(&player);
            roster.send_except(
                client_id,
                &ServerMessage::IncreaseOtherLength {
                    new_body_parts: seeded,
                },
            );
        }
        roster.send_all(&ServerMessage::SetGameCode {
            game_code: game_code.clone(),
        });
        roster.send(
            client_id,
            &ServerMessage::JoinSuccess {
                msg: "New client added to existing game code".to_string(),
                game_code: game_code.clone(),
            },
        );
        info!("{} joined match {}", player.username(), game_code);
        Ok(())
    }

    /// Apply one movement tick: apply, broadcast the delta, run the
    /// collision check, broadcast its consequences. The first three
    /// happen under the match lock as one serialized unit.
    async fn handle_update_position(
        &self,
        client_id: ClientId,
        add: Position,
        remove: Position,
    ) -> Result<(), GameError> {
        let (player, code, state, leaderboard, roster) = {
            let inner = self.inner.lock().await;
            let player = inner
                .socket_to_player
                .get(&client_id)
                .cloned()
                .ok_or(GameError::UserNoGameCode)?;
            let code = inner
                .player_to_code
                .get(&player)
                .cloned()
                .ok_or(GameError::UserNoGameCode)?;
            let handle = inner.matches.get(&code).ok_or(GameError::MissingGameState)?;
            (
                player,
                code.clone(),
                Arc::clone(&handle.state),
                Arc::clone(&handle.leaderboard),
                inner.roster(&code),
            )
        };

        let outcome = {
            let mut state = state.lock().await;
            state.apply_movement(&player, add, remove)?;
            roster.send_except(client_id, &ServerMessage::UpdatePosition { add, remove });
            state.check_collision(&player, add)
        };

        match outcome {
            CollisionOutcome::None => {}
            CollisionOutcome::BoundaryDeath(report) | CollisionOutcome::PlayerDeath(report) => {
                roster.send(client_id, &ServerMessage::YouDied {});
                roster.send_except(
                    client_id,
                    &ServerMessage::OtherUserDied {
                        remove_positions: report.removed_positions,
                    },
                );
                self.evict(client_id, &player, &code).await;
                let orb_set = state.lock().await.orb_snapshot();
                roster.send_except(client_id, &ServerMessage::SendOrbs { orb_set });
                info!("{} died in match {}", player.username(), code);
            }
            CollisionOutcome::OrbsConsumed {
                score_delta,
                new_body_parts,
            } => {
                let orb_set = state.lock().await.orb_snapshot();
                roster.send_all(&ServerMessage::SendOrbs { orb_set });
                leaderboard.lock().await.add_score(&player, score_delta);
                roster.send(
                    client_id,
                    &ServerMessage::IncreaseOwnLength {
                        new_body_parts: new_body_parts.clone(),
                    },
                );
                roster.send_except(
                    client_id,
                    &ServerMessage::IncreaseOtherLength { new_body_parts },
                );
            }
        }
        Ok(())
    }

    /// A closed connection kills its player immediately (no death
    /// orbs) and then evicts them from the registries.
    pub async fn handle_disconnect(&self, client_id: ClientId) {
        let context = {
            let mut inner = self.inner.lock().await;
            inner.outbound.remove(&client_id);
            let resolve = || {
                let player = inner.socket_to_player.get(&client_id)?.clone();
                let code = inner.player_to_code.get(&player)?.clone();
                let handle = inner.matches.get(&code)?;
                Some((player, code.clone(), Arc::clone(&handle.state), inner.roster(&code)))
            };
            resolve()
        };

        if let Some((player, code, state, roster)) = context {
            let removed = state.lock().await.remove_player(&player);
            roster.send_except(
                client_id,
                &ServerMessage::OtherUserDied {
                    remove_positions: removed,
                },
            );
            self.evict(client_id, &player, &code).await;
            info!("{} disconnected from match {}", player.username(), code);
        }
    }

    /// Drop a player from the registries; tear the match down (and
    /// stop its timers) when its last socket leaves.
    async fn evict(&self, client_id: ClientId, player: &Player, code: &str) {
        let leaderboard = {
            let mut inner = self.inner.lock().await;
            inner.socket_to_player.remove(&client_id);
            inner.player_to_code.remove(player);
            let empty = match inner.matches.get_mut(code) {
                Some(handle) => {
                    handle.sockets.remove(&client_id);
                    handle.sockets.is_empty()
                }
                None => return,
            };
            if empty {
                if let Some(handle) = inner.matches.remove(code) {
                    for timer in handle.timers {
                        timer.abort();
                    }
                }
                info!("last player left match {code}, tearing down");
                None
            } else {
                inner.matches.get(code).map(|handle| Arc::clone(&handle.leaderboard))
            }
        };
        if let Some(leaderboard) = leaderboard {
            leaderboard.lock().await.remove_player(player);
        }
    }

    /// Per-match background timers: orb replenishment (first tick
    /// immediate) and the score board broadcast (first tick after one
    /// period). Both stop on their own if the match disappears and are
    /// aborted at teardown.
    fn spawn_match_timers(&self, code: &str) -> Vec<JoinHandle<()>> {
        let orb_task = {
            let directory = self.weak_self.clone();
            let code = code.to_string();
            let period = Duration::from_secs(self.config.orb.generation_interval_secs);
            tokio::spawn(async move {
                let mut ticker = interval(period);
                loop {
                    ticker.tick().await;
                    let Some(directory) = directory.upgrade() else { break };
                    let Some((state, roster)) = directory.match_context(&code).await else {
                        break;
                    };
                    let orb_set = {
                        let mut state = state.lock().await;
                        state.replenish_orbs();
                        state.orb_snapshot()
                    };
                    debug!("replenished orbs for match {code}");
                    roster.send_all(&ServerMessage::SendOrbs { orb_set });
                }
            })
        };

        let leaderboard_task = {
            let directory = self.weak_self.clone();
            let code = code.to_string();
            let period = Duration::from_secs(self.config.leaderboard.update_interval_secs);
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                loop {
                    ticker.tick().await;
                    let Some(directory) = directory.upgrade() else { break };
                    let Some((leaderboard, roster)) = directory.leaderboard_context(&code).await
                    else {
                        break;
                    };
                    let snapshot = leaderboard.lock().await.snapshot();
                    roster.send_all(&ServerMessage::UpdateLeaderboard {
                        leaderboard: snapshot,
                    });
                }
            })
        };

        vec![orb_task, leaderboard_task]
    }

    async fn match_context(&self, code: &str) -> Option<(Arc<Mutex<MatchState>>, Roster)> {
        let inner = self.inner.lock().await;
        let handle = inner.matches.get(code)?;
        Some((Arc::clone(&handle.state), inner.roster(code)))
    }

    async fn leaderboard_context(&self, code: &str) -> Option<(Arc<Mutex<Leaderboard>>, Roster)> {
        let inner = self.inner.lock().await;
        let handle = inner.matches.get(code)?;
        Some((Arc::clone(&handle.leaderboard), inner.roster(code)))
    }
}
