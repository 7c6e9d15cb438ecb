//! Game Logic Module
//!
//! The synchronous simulation. No clock, no sockets: the network layer
//! decides when things happen, this module decides what happens.
//!
//! ## Module Structure
//!
//! - `config`: Board size, pacing, roster limits
//! - `state`: Player ids, players, snakes, per-round state
//! - `board`: Grid, snake seeding, fruit placement
//! - `collision`: Next-cell classification
//! - `input`: Pending/committed direction buffer
//! - `lobby`: Roster and round lifecycle
//! - `events`: Per-tick events sent to clients
//! - `tick`: Authoritative simulation step

pub mod config;
pub mod state;
pub mod board;
pub mod collision;
pub mod input;
pub mod lobby;
pub mod events;
pub mod tick;

// Re-export key types
pub use config::{GameConfig, ConfigError};
pub use state::{Player, PlayerId, PlayerStatus, RoundState, Snake};
pub use board::Board;
pub use collision::CollisionOutcome;
pub use input::InputBuffer;
pub use lobby::{Lobby, LobbyError, LobbyPhase, LeaveOutcome};
pub use events::{EliminationCause, GameEvent};
pub use tick::{tick, TickResult};
