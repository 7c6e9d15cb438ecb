//! Network Layer
//!
//! WebSocket server for real-time multiplayer communication.
//! Owns the clock: it decides when the start delay ends and when ticks fire.
//! All game rules run through `game/`.

pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{
    ClientMessage, ServerMessage, BoardSnapshot, SessionSnapshot, TickUpdate,
    RoundEndInfo, ErrorCode,
};
pub use session::{GameSession, MemberSender};
pub use server::{GameServer, ServerConfig, GameServerError, SessionCommand, run_session_loop};
