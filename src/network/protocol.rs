//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a JSON text message tagged by `"type"`.

use serde::{Serialize, Deserialize};

use crate::core::position::{Direction, Position};
use crate::game::board::Board;
use crate::game::events::GameEvent;
use crate::game::lobby::LobbyPhase;
use crate::game::state::{Player, PlayerId, PlayerStatus};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the session under a display name.
    Join { name: String },

    /// Ready for the next round.
    Ready,

    /// Change heading.
    DirectionUpdate { direction: Direction },

    /// Leave the session but keep the connection open.
    Leave,

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join acknowledgement, sent to the joiner only.
    Joined {
        player_id: PlayerId,
        session: SessionSnapshot,
    },

    /// Someone else joined.
    PlayerJoined { player: PlayerInfo },

    /// Someone left or disconnected.
    PlayerLeft { name: String },

    /// Someone readied up.
    PlayerReady { name: String },

    /// Board seeded; ticks begin after the start delay.
    RoundStart { session: SessionSnapshot },

    /// Board after a simulation tick.
    Tick(TickUpdate),

    /// Round over; everyone is back in the lobby.
    RoundEnd(RoundEndInfo),

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// Public view of a roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Player identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Lobby/round status.
    pub status: PlayerStatus,
}

impl From<&Player> for PlayerInfo {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            status: player.status,
        }
    }
}

/// One snake on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnakeUpdate {
    /// Owner.
    pub player_id: PlayerId,
    /// Segments, head first.
    pub segments: Vec<Position>,
}

/// Board on the wire. Snakes are listed in roster order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Width in cells, walls included.
    pub width: i32,
    /// Height in cells, walls included.
    pub height: i32,
    /// Snakes in roster order.
    pub snakes: Vec<SnakeUpdate>,
    /// Current fruit (`null` if the board is full).
    pub fruit: Option<Position>,
}

impl BoardSnapshot {
    /// Snapshot `board`, ordering snakes by `roster`.
    ///
    /// Snakes whose owner already left the roster are appended afterwards.
    pub fn capture(board: &Board, roster: &[Player]) -> Self {
        let mut snakes: Vec<SnakeUpdate> = roster
            .iter()
            .filter_map(|p| {
                board.snake(p.id).map(|s| SnakeUpdate {
                    player_id: p.id,
                    segments: s.segments().collect(),
                })
            })
            .collect();

        for (id, snake) in &board.snakes {
            if !roster.iter().any(|p| p.id == *id) {
                snakes.push(SnakeUpdate {
                    player_id: *id,
                    segments: snake.segments().collect(),
                });
            }
        }

        Self {
            width: board.width,
            height: board.height,
            snakes,
            fruit: board.fruit,
        }
    }
}

/// Full session view: roster plus the board if a round is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Lobby phase.
    pub phase: LobbyPhase,
    /// Number of the current (or last) round; 0 before the first.
    pub round: u32,
    /// Roster in join order.
    pub players: Vec<PlayerInfo>,
    /// Board, absent in the lobby.
    pub board: Option<BoardSnapshot>,
}

/// Per-tick update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickUpdate {
    /// Tick number within the round.
    pub tick: u32,
    /// Board after the tick.
    pub board: BoardSnapshot,
    /// What happened this tick.
    pub events: Vec<GameEvent>,
}

/// Round end information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEndInfo {
    /// Winner, `null` if nobody survived.
    pub winner_id: Option<PlayerId>,
    /// Winner's display name.
    pub winner_name: Option<String>,
    /// Session after the reset (everyone waiting, no board).
    pub session: SessionSnapshot,
    /// Board as it was on the final tick.
    pub final_board: Option<BoardSnapshot>,
    /// Events of the final tick, ending with `round_ended`.
    pub events: Vec<GameEvent>,
}

/// Error sent to a single client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Request needs a joined player.
    NotJoined,
    /// Join name rejected.
    InvalidName,
    /// Roster is full.
    SessionFull,
    /// Connection already has a player.
    AlreadyJoined,
}

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Build an error message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError {
            code,
            message: message.into(),
        })
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Snake;
    use serde_json::{json, Value};

    #[test]
    fn test_client_messages_parse() {
        let join = ClientMessage::from_json(r#"{"type":"join","name":"ana"}"#).unwrap();
        assert_eq!(join, ClientMessage::Join { name: "ana".to_string() });

        let ready = ClientMessage::from_json(r#"{"type":"ready"}"#).unwrap();
        assert_eq!(ready, ClientMessage::Ready);

        let dir = ClientMessage::from_json(r#"{"type":"direction_update","direction":"left"}"#).unwrap();
        assert_eq!(dir, ClientMessage::DirectionUpdate { direction: Direction::Left });

        let ping = ClientMessage::from_json(r#"{"type":"ping","timestamp":17}"#).unwrap();
        assert_eq!(ping, ClientMessage::Ping { timestamp: 17 });
    }

    #[test]
    fn test_malformed_client_messages() {
        assert!(ClientMessage::from_json("not json").is_err());
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"direction_update","direction":"north"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"join"}"#).is_err());
    }

    #[test]
    fn test_player_joined_json() {
        let id = PlayerId::from_u128(5);
        let msg = ServerMessage::PlayerJoined {
            player: PlayerInfo {
                id,
                name: "bo".to_string(),
                status: PlayerStatus::Waiting,
            },
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "player_joined",
                "player": { "id": id.to_string(), "name": "bo", "status": "waiting" }
            })
        );
    }

    #[test]
    fn test_tick_json_shape() {
        let msg = ServerMessage::Tick(TickUpdate {
            tick: 4,
            board: BoardSnapshot {
                width: 10,
                height: 8,
                snakes: vec![],
                fruit: None,
            },
            events: vec![GameEvent::FruitSpawned { tick: 4, position: Position::new(2, 3) }],
        });
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "tick");
        assert_eq!(value["tick"], 4);
        assert_eq!(value["board"]["fruit"], Value::Null);
        assert_eq!(value["events"][0]["event"], "fruit_spawned");

        let back = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::error(ErrorCode::NotJoined, "Join first");
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("\"code\":\"not_joined\""));
    }

    #[test]
    fn test_board_snapshot_uses_roster_order() {
        let first = Player::new(PlayerId::from_u128(9), "first");
        let second = Player::new(PlayerId::from_u128(1), "second");
        let gone = PlayerId::from_u128(5);

        let mut board = Board::new(20, 20);
        for (id, x) in [(first.id, 3), (second.id, 6), (gone, 9)] {
            let snake = Snake::from_segments([Position::new(x, 5), Position::new(x, 6)]).unwrap();
            board.snakes.insert(id, snake);
        }
        board.fruit = Some(Position::new(10, 10));

        let snapshot = BoardSnapshot::capture(&board, &[first.clone(), second.clone()]);
        let order: Vec<PlayerId> = snapshot.snakes.iter().map(|s| s.player_id).collect();
        assert_eq!(order, vec![first.id, second.id, gone]);
        assert_eq!(snapshot.snakes[0].segments[0], Position::new(3, 5));
        assert_eq!(snapshot.fruit, Some(Position::new(10, 10)));
    }
}
