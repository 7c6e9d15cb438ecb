//! Game State Definitions
//!
//! Players, snakes and the per-round simulation state.
//! Snakes live in a BTreeMap so iteration never depends on hashing.

use std::collections::VecDeque;
use std::fmt;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::core::position::{Direction, Position};
use crate::core::rng::DeterministicRng;
use crate::game::board::{self, Board};
use crate::game::config::GameConfig;
use crate::game::events::GameEvent;
use crate::game::input::InputBuffer;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Opaque player identifier, assigned on join.
///
/// Serialized as a UUID string. Implements Ord for deterministic map ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Fresh random id (UUID v4).
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build an id from a fixed integer. Handy for tests and replays.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Parse from the UUID string form.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// First four bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0.as_bytes()[..4])
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// Lobby/round status of a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// In the lobby, not ready
    #[default]
    Waiting,
    /// Ready for the next round
    Ready,
    /// Alive in the current round
    Playing,
    /// Eliminated (or left) during the current round
    Dead,
}

/// A member of the session roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    /// Unique id
    pub id: PlayerId,
    /// Trimmed display name
    pub name: String,
    /// Current status
    pub status: PlayerStatus,
    /// False once the player left mid-round; dropped at round end
    pub connected: bool,
}

impl Player {
    /// New waiting player.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: PlayerStatus::Waiting,
            connected: true,
        }
    }

    /// Check if the player is still moving this round.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.status == PlayerStatus::Playing
    }
}

// =============================================================================
// SNAKE
// =============================================================================

/// A snake body, head first.
///
/// Never empty: the only constructor rejects an empty segment list and
/// `advance` pushes before it pops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snake {
    segments: VecDeque<Position>,
}

impl Snake {
    /// Build from head-first segments. Returns `None` for an empty body.
    pub fn from_segments(segments: impl IntoIterator<Item = Position>) -> Option<Self> {
        let segments: VecDeque<Position> = segments.into_iter().collect();
        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    /// Head cell.
    #[inline]
    pub fn head(&self) -> Position {
        self.segments[0]
    }

    /// Tail cell (equal to the head for a one-segment snake).
    #[inline]
    pub fn tail(&self) -> Position {
        self.segments[self.segments.len() - 1]
    }

    /// Number of segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if the snake has no segments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check whether any segment occupies `cell`.
    pub fn contains(&self, cell: Position) -> bool {
        self.segments.contains(&cell)
    }

    /// Segments, head first.
    pub fn segments(&self) -> impl Iterator<Item = Position> + '_ {
        self.segments.iter().copied()
    }

    /// Move the head to `new_head`. The tail stays put when growing.
    pub fn advance(&mut self, new_head: Position, grow: bool) {
        self.segments.push_front(new_head);
        if !grow {
            self.segments.pop_back();
        }
    }
}

// =============================================================================
// ROUND STATE
// =============================================================================

/// Simulation state of one round.
///
/// Exists from round start (including the start delay) until round end.
#[derive(Clone, Debug)]
pub struct RoundState {
    /// Round number, starting at 1
    pub round: u32,
    /// Ticks simulated so far
    pub tick: u32,
    /// Seed the RNG was created from
    pub seed: u64,
    /// The board
    pub board: Board,
    /// Pending and committed directions
    pub inputs: InputBuffer,
    /// Fruit placement randomness
    pub rng: DeterministicRng,
    /// Events not yet collected
    events: Vec<GameEvent>,
}

impl RoundState {
    /// Seed a new round for `participants` (roster order).
    ///
    /// Lays out the snakes, records each starting heading as the committed
    /// direction and places the first fruit.
    pub fn new(round: u32, seed: u64, participants: &[PlayerId], config: &GameConfig) -> Self {
        let mut board = Board::seed(participants, config);
        let mut inputs = InputBuffer::new();
        for (index, id) in participants.iter().enumerate() {
            inputs.commit(*id, board::starting_direction(index));
        }

        let mut rng = DeterministicRng::new(seed);
        board.fruit = board.place_fruit(&mut rng, config.fruit_attempts);

        Self {
            round,
            tick: 0,
            seed,
            board,
            inputs,
            rng,
            events: Vec::new(),
        }
    }

    /// Queue an event for the current tick.
    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Committed heading of a player, if they are still in the buffer.
    pub fn heading(&self, id: PlayerId) -> Option<Direction> {
        self.inputs.committed(id)
    }
}
