//! Game Session
//!
//! The single session the server hosts. Owns the lobby, the running round and
//! one outbound queue per member, and turns join/ready/direction/leave
//! requests and timer callbacks into state changes plus notifications.
//!
//! Nothing here awaits: the session loop in `server` calls into it one
//! request at a time.

use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::core::position::Direction;
use crate::core::rng::derive_round_seed;
use crate::game::config::GameConfig;
use crate::game::events::{EliminationCause, GameEvent};
use crate::game::lobby::{LeaveOutcome, Lobby, LobbyError, LobbyPhase};
use crate::game::state::{PlayerId, RoundState};
use crate::game::tick::{tick, TickResult};
use crate::network::protocol::{
    BoardSnapshot, PlayerInfo, RoundEndInfo, ServerMessage, SessionSnapshot, TickUpdate,
};

/// Outbound channel to one member.
pub type MemberSender = mpsc::Sender<ServerMessage>;

/// The session aggregate.
pub struct GameSession {
    /// Game configuration.
    config: GameConfig,
    /// Roster and phase.
    lobby: Lobby,
    /// Current round (from round start until round end).
    round: Option<RoundState>,
    /// Rounds started so far.
    round_number: u32,
    /// Base seed mixed into every round seed.
    base_seed: u64,
    /// Outbound queues of joined players.
    members: BTreeMap<PlayerId, MemberSender>,
}

impl GameSession {
    /// Create an empty session.
    pub fn new(config: GameConfig) -> Self {
        let base_seed = config
            .seed
            .unwrap_or_else(rand::random::<u64>);

        Self {
            lobby: Lobby::new(config.max_players),
            config,
            round: None,
            round_number: 0,
            base_seed,
            members: BTreeMap::new(),
        }
    }

    /// Game configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current lobby phase.
    pub fn phase(&self) -> LobbyPhase {
        self.lobby.phase()
    }

    /// Roster access.
    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    /// Current round, if any.
    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    /// Number of joined players with an outbound queue.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Roster plus board.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.lobby.phase(),
            round: self.round_number,
            players: self.lobby.players().iter().map(PlayerInfo::from).collect(),
            board: self
                .round
                .as_ref()
                .map(|r| BoardSnapshot::capture(&r.board, self.lobby.players())),
        }
    }

    // =========================================================================
    // REQUESTS
    // =========================================================================

    /// Add a player.
    ///
    /// The joiner gets `joined` with the full snapshot, everyone else gets
    /// `player_joined`.
    pub fn join(&mut self, name: &str, sender: MemberSender) -> Result<PlayerId, LobbyError> {
        let player = self.lobby.join(name)?;
        self.members.insert(player.id, sender);

        info!(player = %player.id.short(), name = %player.name, "Player joined");

        self.broadcast_except(
            player.id,
            ServerMessage::PlayerJoined {
                player: PlayerInfo::from(&player),
            },
        );
        let session = self.snapshot();
        self.send_to(
            player.id,
            ServerMessage::Joined {
                player_id: player.id,
                session,
            },
        );

        Ok(player.id)
    }

    /// Mark a player ready and start the round if everyone is.
    ///
    /// Returns `Ok(false)` for a repeated ready.
    pub fn set_ready(&mut self, id: PlayerId) -> Result<bool, LobbyError> {
        if !self.lobby.set_ready(id)? {
            return Ok(false);
        }

        if let Some(player) = self.lobby.player(id) {
            let name = player.name.clone();
            debug!(player = %id.short(), "Player ready");
            self.broadcast(ServerMessage::PlayerReady { name });
        }
        self.maybe_start();
        Ok(true)
    }

    /// Buffer a direction for the next tick.
    ///
    /// `Ok(false)` means the update was dropped (no round, not a live
    /// participant, or an illegal turn).
    pub fn submit_direction(&mut self, id: PlayerId, direction: Direction) -> Result<bool, LobbyError> {
        if self.lobby.player(id).is_none() {
            return Err(LobbyError::UnknownPlayer);
        }
        Ok(self
            .round
            .as_mut()
            .map_or(false, |round| round.inputs.submit(id, direction)))
    }

    /// Leave or disconnect.
    ///
    /// In the lobby the player is removed and the start condition is checked
    /// again. A round participant stays on the roster as `Dead` until the
    /// round ends; their snake stays on the board.
    pub fn leave(&mut self, id: PlayerId) -> Result<(), LobbyError> {
        let was_playing = self.lobby.player(id).map_or(false, |p| p.is_playing());
        let outcome = self.lobby.leave(id)?;
        self.members.remove(&id);

        if was_playing {
            if let Some(round) = self.round.as_mut() {
                round.inputs.remove(id);
                round.push_event(GameEvent::PlayerEliminated {
                    tick: round.tick,
                    player_id: id,
                    cause: EliminationCause::Disconnected,
                });
            }
        }

        let name = outcome.player().name.clone();
        info!(player = %id.short(), name = %name, "Player left");
        self.broadcast(ServerMessage::PlayerLeft { name });

        if matches!(outcome, LeaveOutcome::Removed(_)) {
            self.maybe_start();
        }
        Ok(())
    }

    // =========================================================================
    // TIMER CALLBACKS
    // =========================================================================

    /// Start delay elapsed: let the ticks run.
    ///
    /// Returns false if no round was waiting to start.
    pub fn begin_round(&mut self) -> bool {
        if self.lobby.phase() != LobbyPhase::Starting {
            return false;
        }
        self.lobby.begin_ticking();
        info!(round = self.round_number, "Round running");
        true
    }

    /// Run one tick and notify members.
    ///
    /// Returns `None` outside a running round.
    pub fn run_tick(&mut self) -> Option<TickResult> {
        if self.lobby.phase() != LobbyPhase::InRound {
            return None;
        }
        let round = self.round.as_mut()?;
        let result = tick(round, self.lobby.players_mut(), &self.config);

        if result.round_ended {
            self.end_round(result.winner, result.events.clone());
        } else {
            let update = TickUpdate {
                tick: round.tick,
                board: BoardSnapshot::capture(&round.board, self.lobby.players()),
                events: result.events.clone(),
            };
            self.broadcast(ServerMessage::Tick(update));
        }

        Some(result)
    }

    /// Tell every member the server is going away.
    pub fn shutdown(&mut self, reason: &str) {
        info!(members = self.members.len(), "Shutting down session");
        self.broadcast(ServerMessage::Shutdown {
            reason: reason.to_string(),
        });
        self.members.clear();
    }

    // =========================================================================
    // ROUND LIFECYCLE
    // =========================================================================

    fn maybe_start(&mut self) -> bool {
        if !self.lobby.all_ready(self.config.min_players) {
            return false;
        }

        self.round_number += 1;
        let participants = self.lobby.start_round();
        let ids: Vec<[u8; 16]> = participants.iter().map(|id| *id.as_bytes()).collect();
        let seed = derive_round_seed(self.base_seed, self.round_number, &ids);
        self.round = Some(RoundState::new(
            self.round_number,
            seed,
            &participants,
            &self.config,
        ));

        info!(
            round = self.round_number,
            players = participants.len(),
            seed,
            "Round starting"
        );

        let session = self.snapshot();
        self.broadcast(ServerMessage::RoundStart { session });
        true
    }

    /// The final tick has no `tick` frame; its events ride on `round_end`.
    fn end_round(&mut self, winner: Option<PlayerId>, events: Vec<GameEvent>) {
        let final_board = self
            .round
            .take()
            .map(|r| BoardSnapshot::capture(&r.board, self.lobby.players()));
        let winner_name = winner
            .and_then(|id| self.lobby.player(id))
            .map(|p| p.name.clone());

        for player in self.lobby.end_round() {
            self.members.remove(&player.id);
        }

        info!(
            round = self.round_number,
            winner = winner_name.as_deref().unwrap_or("none"),
            "Round ended"
        );

        let session = self.snapshot();
        self.broadcast(ServerMessage::RoundEnd(RoundEndInfo {
            winner_id: winner,
            winner_name,
            session,
            final_board,
            events,
        }));
    }

    // =========================================================================
    // DELIVERY
    // =========================================================================

    fn send_to(&self, id: PlayerId, message: ServerMessage) {
        if let Some(sender) = self.members.get(&id) {
            deliver(id, sender, message);
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for (id, sender) in &self.members {
            deliver(*id, sender, message.clone());
        }
    }

    fn broadcast_except(&self, except: PlayerId, message: ServerMessage) {
        for (id, sender) in &self.members {
            if *id != except {
                deliver(*id, sender, message.clone());
            }
        }
    }
}

/// Queue a message without waiting; a slow member loses messages instead of
/// stalling the session.
fn deliver(id: PlayerId, sender: &MemberSender, message: ServerMessage) {
    match sender.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!(player = %id.short(), "Outbound queue full, dropping message");
        }
        Err(TrySendError::Closed(_)) => {
            debug!(player = %id.short(), "Outbound queue closed");
        }
    }
}
