//! # Snake Arena Server
//!
//! Authoritative server for real-time multiplayer snake.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SNAKE ARENA SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── position.rs - Grid cells and headings                   │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── config.rs   - Board size, pacing, roster limits         │
//! │  ├── state.rs    - Players, snakes, round state              │
//! │  ├── board.rs    - Grid, seeding, fruit placement            │
//! │  ├── collision.rs- Next-cell classification                  │
//! │  ├── input.rs    - Direction buffer                          │
//! │  ├── lobby.rs    - Roster and round lifecycle                │
//! │  ├── events.rs   - Per-tick events                           │
//! │  └── tick.rs     - Authoritative simulation step             │
//! │                                                              │
//! │  network/        - Networking (owns the clock)               │
//! │  ├── server.rs   - WebSocket server and session loop         │
//! │  ├── protocol.rs - Message types                             │
//! │  └── session.rs  - Session state and fan-out                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The `core/` and `game/` modules never read the clock or the network.
//! Collections that are iterated use `BTreeMap` or roster order, and all
//! randomness comes from a seeded Xorshift128+. Given the same seed and the
//! same inputs per tick, a round replays identically.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::position::{Direction, Position};
pub use core::rng::DeterministicRng;
pub use game::config::GameConfig;
pub use game::state::{Player, PlayerId, PlayerStatus};
pub use network::server::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
