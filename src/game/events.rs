//! Game Events
//!
//! Things that happened during a tick, sent to clients alongside the board.

use serde::{Serialize, Deserialize};

use crate::core::position::Position;
use crate::game::state::PlayerId;

/// Why a player left the round early.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EliminationCause {
    /// Head left the playable area
    Wall,
    /// Head hit a snake segment
    Body {
        /// Owner of the segment
        owner: PlayerId,
    },
    /// Connection closed or player left
    Disconnected,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A snake ate the fruit and grew
    FruitEaten {
        tick: u32,
        player_id: PlayerId,
        position: Position,
        length: usize,
    },

    /// A new fruit was placed
    FruitSpawned {
        tick: u32,
        position: Position,
    },

    /// A player is out of the round
    PlayerEliminated {
        tick: u32,
        player_id: PlayerId,
        cause: EliminationCause,
    },

    /// The round is over
    RoundEnded {
        tick: u32,
        winner_id: Option<PlayerId>,
    },
}

impl GameEvent {
    /// Tick the event happened on.
    pub fn tick(&self) -> u32 {
        match self {
            GameEvent::FruitEaten { tick, .. }
            | GameEvent::FruitSpawned { tick, .. }
            | GameEvent::PlayerEliminated { tick, .. }
            | GameEvent::RoundEnded { tick, .. } => *tick,
        }
    }

    /// Player the event is about, if any.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            GameEvent::FruitEaten { player_id, .. }
            | GameEvent::PlayerEliminated { player_id, .. } => Some(*player_id),
            GameEvent::RoundEnded { winner_id, .. } => *winner_id,
            GameEvent::FruitSpawned { .. } => None,
        }
    }
}
