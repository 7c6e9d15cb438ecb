//! Lobby Manager
//!
//! Roster plus the `Collecting -> Starting -> InRound -> Collecting` cycle.
//! Broadcasting is left to the session; every operation here reports what
//! changed so the caller can notify the right members.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::game::state::{Player, PlayerId, PlayerStatus};

/// Maximum name length after trimming.
pub const MAX_NAME_LEN: usize = 32;

/// Phase of the session's lobby cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyPhase {
    /// Players join and ready up
    #[default]
    Collecting,
    /// Board seeded, start delay running
    Starting,
    /// Ticks are running
    InRound,
}

/// Lobby errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    /// Name empty after trimming, or too long.
    #[error("Invalid name: must be 1-32 characters")]
    InvalidName,

    /// Id not in the roster, or not allowed to act in the current phase.
    #[error("Unknown player")]
    UnknownPlayer,

    /// Roster already at capacity.
    #[error("Session is full")]
    SessionFull,
}

/// Result of a leave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Dropped from the roster.
    Removed(Player),
    /// Round participant: kept as `Dead` until the round ends.
    MarkedDead(Player),
}

impl LeaveOutcome {
    /// The player that left.
    pub fn player(&self) -> &Player {
        match self {
            LeaveOutcome::Removed(p) | LeaveOutcome::MarkedDead(p) => p,
        }
    }
}

/// Roster and phase for the single session.
#[derive(Clone, Debug)]
pub struct Lobby {
    roster: Vec<Player>,
    phase: LobbyPhase,
    max_players: usize,
}

impl Lobby {
    /// Empty lobby.
    pub fn new(max_players: usize) -> Self {
        Self {
            roster: Vec::new(),
            phase: LobbyPhase::Collecting,
            max_players,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> LobbyPhase {
        self.phase
    }

    /// Roster in join order.
    pub fn players(&self) -> &[Player] {
        &self.roster
    }

    /// Mutable roster, for status updates from the tick.
    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.roster
    }

    /// Look up a player.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.roster.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.roster.iter_mut().find(|p| p.id == id)
    }

    /// Roster size.
    pub fn len(&self) -> usize {
        self.roster.len()
    }

    /// Check if nobody has joined.
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Add a player under a fresh id.
    ///
    /// Allowed in any phase; a player joining mid-round waits for the next one.
    pub fn join(&mut self, name: &str) -> Result<Player, LobbyError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(LobbyError::InvalidName);
        }
        if self.roster.len() >= self.max_players {
            return Err(LobbyError::SessionFull);
        }

        let player = Player::new(PlayerId::random(), name);
        self.roster.push(player.clone());
        Ok(player)
    }

    /// Mark a player ready.
    ///
    /// Returns `Ok(false)` if they already were. Only valid while collecting.
    pub fn set_ready(&mut self, id: PlayerId) -> Result<bool, LobbyError> {
        if self.phase != LobbyPhase::Collecting {
            return Err(LobbyError::UnknownPlayer);
        }
        let player = self.player_mut(id).ok_or(LobbyError::UnknownPlayer)?;
        if player.status == PlayerStatus::Ready {
            return Ok(false);
        }
        player.status = PlayerStatus::Ready;
        Ok(true)
    }

    /// Check the start condition: collecting, at least `min_players`, all ready.
    pub fn all_ready(&self, min_players: usize) -> bool {
        self.phase == LobbyPhase::Collecting
            && self.roster.len() >= min_players
            && self.roster.iter().all(|p| p.status == PlayerStatus::Ready)
    }

    /// Remove a player, or mark them dead if they are in the running round.
    pub fn leave(&mut self, id: PlayerId) -> Result<LeaveOutcome, LobbyError> {
        let index = self
            .roster
            .iter()
            .position(|p| p.id == id)
            .ok_or(LobbyError::UnknownPlayer)?;

        let in_round = matches!(
            self.roster[index].status,
            PlayerStatus::Playing | PlayerStatus::Dead
        );
        if self.phase != LobbyPhase::Collecting && in_round {
            let player = &mut self.roster[index];
            player.status = PlayerStatus::Dead;
            player.connected = false;
            return Ok(LeaveOutcome::MarkedDead(player.clone()));
        }

        Ok(LeaveOutcome::Removed(self.roster.remove(index)))
    }

    /// Enter `Starting`: every player becomes `Playing`.
    ///
    /// Returns the participants in roster order.
    pub fn start_round(&mut self) -> Vec<PlayerId> {
        self.phase = LobbyPhase::Starting;
        for player in &mut self.roster {
            player.status = PlayerStatus::Playing;
        }
        self.roster.iter().map(|p| p.id).collect()
    }

    /// Enter `InRound` once the start delay is over.
    pub fn begin_ticking(&mut self) {
        if self.phase == LobbyPhase::Starting {
            self.phase = LobbyPhase::InRound;
        }
    }

    /// Back to `Collecting`: everyone waits again and players that left
    /// during the round are dropped. Returns the dropped players.
    pub fn end_round(&mut self) -> Vec<Player> {
        self.phase = LobbyPhase::Collecting;
        let (kept, dropped): (Vec<Player>, Vec<Player>) =
            std::mem::take(&mut self.roster).into_iter().partition(|p| p.connected);
        self.roster = kept;
        for player in &mut self.roster {
            player.status = PlayerStatus::Waiting;
        }
        for player in &dropped {
            debug!(player = %player.id.short(), name = %player.name, "Dropped after round");
        }
        dropped
    }
}
