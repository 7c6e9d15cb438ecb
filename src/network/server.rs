//! WebSocket Game Server
//!
//! Accepts WebSocket connections and feeds their requests into one session
//! task. That task is the only code that touches session state; it reacts to
//! requests, the start-delay deadline and the tick timer, one at a time.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::core::position::Direction;
use crate::game::config::{ConfigError, GameConfig};
use crate::game::lobby::{LobbyError, LobbyPhase};
use crate::game::state::PlayerId;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::network::session::{GameSession, MemberSender};

/// Outbound queue length per connection.
const OUTBOUND_QUEUE: usize = 64;

/// How long shutdown waits for connections to flush.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 256,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Game configuration rejected.
    #[error("Invalid game config: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// SESSION LOOP
// =============================================================================

/// Requests from connections to the session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Join under `name`; the id (or the rejection) comes back on `reply`.
    Join {
        name: String,
        sender: MemberSender,
        reply: oneshot::Sender<Result<PlayerId, LobbyError>>,
    },
    /// Ready up.
    Ready { player_id: PlayerId },
    /// Change heading.
    Direction {
        player_id: PlayerId,
        direction: Direction,
    },
    /// Voluntary leave or transport close.
    Leave { player_id: PlayerId },
}

/// Own `session` until the command channel closes or shutdown fires.
///
/// The start deadline is armed when a round enters `Starting`; the tick
/// interval exists only while the round is running. Missed ticks are skipped,
/// never run back to back. Shutdown wins over anything queued alongside it,
/// so every member still registered gets the notice.
pub async fn run_session_loop(
    mut session: GameSession,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let tick_period = session.config().tick_interval;
    let start_delay = session.config().start_delay;

    let mut start_at: Option<Instant> = None;
    let mut ticker: Option<Interval> = None;

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => {
                session.shutdown("Server shutting down");
                break;
            }
            command = commands.recv() => {
                match command {
                    Some(command) => handle_command(&mut session, command),
                    None => break,
                }
            }
            _ = wait_until(start_at) => {
                start_at = None;
                if session.begin_round() {
                    let mut interval = interval_at(Instant::now() + tick_period, tick_period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    ticker = Some(interval);
                }
            }
            _ = next_tick(&mut ticker) => {
                session.run_tick();
            }
        }

        match session.phase() {
            LobbyPhase::Starting if start_at.is_none() => {
                start_at = Some(Instant::now() + start_delay);
            }
            LobbyPhase::Collecting => {
                start_at = None;
                ticker = None;
            }
            _ => {}
        }
    }

    debug!("Session loop stopped");
}

fn handle_command(session: &mut GameSession, command: SessionCommand) {
    match command {
        SessionCommand::Join { name, sender, reply } => {
            let result = session.join(&name, sender);
            if let Err(e) = &result {
                debug!("Join rejected: {}", e);
            }
            let _ = reply.send(result);
        }
        SessionCommand::Ready { player_id } => {
            if let Err(e) = session.set_ready(player_id) {
                debug!(player = %player_id.short(), "Ready ignored: {}", e);
            }
        }
        SessionCommand::Direction { player_id, direction } => {
            match session.submit_direction(player_id, direction) {
                Ok(true) => {}
                Ok(false) => debug!(player = %player_id.short(), %direction, "Direction dropped"),
                Err(e) => debug!(player = %player_id.short(), "Direction ignored: {}", e),
            }
        }
        SessionCommand::Leave { player_id } => {
            if let Err(e) = session.leave(player_id) {
                debug!(player = %player_id.short(), "Leave ignored: {}", e);
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// Connected client state.
struct ConnectedClient {
    /// Player identifier (after join).
    player_id: Option<PlayerId>,
    /// Connection time.
    connected_at: Instant,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Game configuration for the session.
    game_config: GameConfig,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig, game_config: GameConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            game_config,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind and run the server.
    #[instrument(skip(self), fields(addr = %self.config.bind_addr))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(version = %self.config.version, "Game server listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Run the server on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        self.game_config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let session = GameSession::new(self.game_config.clone());
        let session_task = tokio::spawn(run_session_loop(
            session,
            command_rx,
            self.shutdown_tx.subscribe(),
        ));

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            {
                                // Counted from accept, not from handshake
                                let mut clients = self.clients.write().await;
                                if clients.len() >= self.config.max_connections {
                                    warn!("Connection limit reached, rejecting {}", addr);
                                    continue;
                                }
                                clients.insert(addr, ConnectedClient {
                                    player_id: None,
                                    connected_at: Instant::now(),
                                });
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, command_tx.clone());
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        drop(command_tx);
        if let Err(e) = session_task.await {
            error!("Session task failed: {}", e);
        }

        // Give connection tasks a moment to flush the shutdown notice
        let clients = self.clients.clone();
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async move {
            while !clients.read().await.is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if drained.is_err() {
            warn!("Connections still open after shutdown grace period");
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        commands: mpsc::UnboundedSender<SessionCommand>,
    ) {
        let clients = self.clients.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match handshake(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    clients.write().await.remove(&addr);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE);

            // Spawn message sender task
            let mut sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                    if matches!(msg, ServerMessage::Shutdown { .. }) {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            let mut player_id: Option<PlayerId> = None;
            let mut shutting_down = false;

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        continue;
                                    }
                                };

                                let before = player_id;
                                Self::handle_client_message(client_msg, &mut player_id, &commands, &msg_tx).await;
                                if player_id != before {
                                    if let Some(client) = clients.write().await.get_mut(&addr) {
                                        client.player_id = player_id;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                debug!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        shutting_down = true;
                        // Joined players hear about it from the session
                        if player_id.is_none() {
                            let _ = msg_tx.try_send(ServerMessage::Shutdown {
                                reason: "Server shutting down".to_string(),
                            });
                        }
                        break;
                    }
                }
            }

            // Transport close counts as leaving. On shutdown the session
            // still holds our sender for the notice, so stay registered.
            if let (Some(id), false) = (player_id, shutting_down) {
                let _ = commands.send(SessionCommand::Leave { player_id: id });
            }

            // Let queued messages go out once the session drops its sender
            drop(msg_tx);
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut sender_task).await.is_err() {
                sender_task.abort();
            }

            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    player = ?client.player_id.map(|id| id.short()),
                    duration_ms = client.connected_at.elapsed().as_millis() as u64,
                    "Client {} cleaned up",
                    addr
                );
            }
        });
    }

    /// Handle a client message.
    async fn handle_client_message(
        msg: ClientMessage,
        player_id: &mut Option<PlayerId>,
        commands: &mpsc::UnboundedSender<SessionCommand>,
        sender: &MemberSender,
    ) {
        match msg {
            ClientMessage::Join { name } => {
                if player_id.is_some() {
                    let _ = sender
                        .send(ServerMessage::error(ErrorCode::AlreadyJoined, "Already joined"))
                        .await;
                    return;
                }

                let (reply_tx, reply_rx) = oneshot::channel();
                let command = SessionCommand::Join {
                    name,
                    sender: sender.clone(),
                    reply: reply_tx,
                };
                if commands.send(command).is_err() {
                    return;
                }

                match reply_rx.await {
                    Ok(Ok(id)) => *player_id = Some(id),
                    Ok(Err(e)) => {
                        let code = match e {
                            LobbyError::InvalidName => ErrorCode::InvalidName,
                            LobbyError::SessionFull => ErrorCode::SessionFull,
                            LobbyError::UnknownPlayer => ErrorCode::NotJoined,
                        };
                        let _ = sender.send(ServerMessage::error(code, e.to_string())).await;
                    }
                    Err(_) => {}
                }
            }
            ClientMessage::Ready => match *player_id {
                Some(id) => {
                    let _ = commands.send(SessionCommand::Ready { player_id: id });
                }
                None => Self::not_joined(sender).await,
            },
            ClientMessage::DirectionUpdate { direction } => match *player_id {
                Some(id) => {
                    let _ = commands.send(SessionCommand::Direction {
                        player_id: id,
                        direction,
                    });
                }
                None => Self::not_joined(sender).await,
            },
            ClientMessage::Leave => match player_id.take() {
                Some(id) => {
                    let _ = commands.send(SessionCommand::Leave { player_id: id });
                }
                None => Self::not_joined(sender).await,
            },
            ClientMessage::Ping { timestamp } => {
                let _ = sender
                    .send(ServerMessage::Pong {
                        timestamp,
                        server_time: unix_millis(),
                    })
                    .await;
            }
        }
    }

    async fn not_joined(sender: &MemberSender) {
        let _ = sender
            .send(ServerMessage::error(ErrorCode::NotJoined, "Join the session first"))
            .await;
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get connected client count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

async fn handshake(stream: TcpStream) -> Result<WebSocketStream<TcpStream>, GameServerError> {
    Ok(accept_async(stream).await?)
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::GameEvent;
    use tokio_tungstenite::connect_async;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(config.max_connections > 0);
    }

    // -------------------------------------------------------------------------
    // Session loop (paused clock)
    // -------------------------------------------------------------------------

    struct LoopHarness {
        commands: mpsc::UnboundedSender<SessionCommand>,
        shutdown_tx: broadcast::Sender<()>,
        task: tokio::task::JoinHandle<()>,
    }

    impl LoopHarness {
        fn start(config: GameConfig) -> Self {
            let (commands, command_rx) = mpsc::unbounded_channel();
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            let task = tokio::spawn(run_session_loop(
                GameSession::new(config),
                command_rx,
                shutdown_rx,
            ));
            Self { commands, shutdown_tx, task }
        }

        async fn join(&self, name: &str) -> (PlayerId, mpsc::Receiver<ServerMessage>) {
            let (tx, rx) = mpsc::channel(1024);
            let (reply, reply_rx) = oneshot::channel();
            self.commands
                .send(SessionCommand::Join { name: name.to_string(), sender: tx, reply })
                .unwrap();
            (reply_rx.await.unwrap().unwrap(), rx)
        }
    }

    async fn next_where<F>(rx: &mut mpsc::Receiver<ServerMessage>, mut pred: F) -> ServerMessage
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        loop {
            let msg = rx.recv().await.expect("channel closed");
            if pred(&msg) {
                return msg;
            }
        }
    }

    fn test_config() -> GameConfig {
        GameConfig {
            seed: Some(7),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_start_delay() {
        let config = test_config();
        let harness = LoopHarness::start(config.clone());
        let (a, mut rx_a) = harness.join("ana").await;
        let (b, _rx_b) = harness.join("bo").await;

        harness.commands.send(SessionCommand::Ready { player_id: a }).unwrap();
        harness.commands.send(SessionCommand::Ready { player_id: b }).unwrap();

        next_where(&mut rx_a, |m| matches!(m, ServerMessage::RoundStart { .. })).await;
        let started = Instant::now();

        // Buffered during the delay, applied on the first tick
        harness
            .commands
            .send(SessionCommand::Direction { player_id: a, direction: Direction::Left })
            .unwrap();

        let first = next_where(&mut rx_a, |m| matches!(m, ServerMessage::Tick(_))).await;
        assert!(started.elapsed() >= config.start_delay + config.tick_interval);

        match first {
            ServerMessage::Tick(update) => {
                assert_eq!(update.tick, 1);
                let snake = update.board.snakes.iter().find(|s| s.player_id == a).unwrap();
                assert_eq!(snake.segments[0].x, 42);
            }
            _ => unreachable!(),
        }

        let _ = harness.shutdown_tx.send(());
        harness.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_plays_out_and_resets() {
        let harness = LoopHarness::start(test_config());
        let (a, mut rx_a) = harness.join("ana").await;
        let (b, _rx_b) = harness.join("bo").await;

        harness.commands.send(SessionCommand::Ready { player_id: a }).unwrap();
        harness.commands.send(SessionCommand::Ready { player_id: b }).unwrap();

        // No input: both snakes reach the wall on the same tick
        let end = next_where(&mut rx_a, |m| matches!(m, ServerMessage::RoundEnd(_))).await;
        match end {
            ServerMessage::RoundEnd(info) => {
                assert_eq!(info.winner_id, None);
                assert!(info.session.players.iter().all(|p| p.status == crate::game::PlayerStatus::Waiting));
                assert!(info.session.board.is_none());
                assert!(info.final_board.is_some());
            }
            _ => unreachable!(),
        }

        // Ticks stop with the round
        harness.commands.send(SessionCommand::Ready { player_id: a }).unwrap();
        let msg = next_where(&mut rx_a, |_| true).await;
        assert!(matches!(msg, ServerMessage::PlayerReady { .. }));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx_a.try_recv().is_err());

        let _ = harness.shutdown_tx.send(());
        harness.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_mid_round_names_winner() {
        let harness = LoopHarness::start(test_config());
        let (a, mut rx_a) = harness.join("ana").await;
        let (b, _rx_b) = harness.join("bo").await;

        harness.commands.send(SessionCommand::Ready { player_id: a }).unwrap();
        harness.commands.send(SessionCommand::Ready { player_id: b }).unwrap();
        next_where(&mut rx_a, |m| matches!(m, ServerMessage::Tick(_))).await;

        harness.commands.send(SessionCommand::Leave { player_id: b }).unwrap();
        let end = next_where(&mut rx_a, |m| matches!(m, ServerMessage::RoundEnd(_))).await;
        match end {
            ServerMessage::RoundEnd(info) => {
                assert_eq!(info.winner_id, Some(a));
                assert_eq!(info.winner_name.as_deref(), Some("ana"));
                assert_eq!(info.session.players.len(), 1);
            }
            _ => unreachable!(),
        }

        let _ = harness.shutdown_tx.send(());
        harness.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reaches_members() {
        let harness = LoopHarness::start(test_config());
        let (_, mut rx) = harness.join("ana").await;

        let _ = harness.shutdown_tx.send(());
        let msg = next_where(&mut rx, |m| matches!(m, ServerMessage::Shutdown { .. })).await;
        assert!(matches!(msg, ServerMessage::Shutdown { .. }));
        harness.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_beats_queued_leave() {
        for _ in 0..50 {
            let harness = LoopHarness::start(test_config());
            let (id, mut rx) = harness.join("ana").await;

            // Both land before the loop runs again
            let _ = harness.shutdown_tx.send(());
            harness.commands.send(SessionCommand::Leave { player_id: id }).unwrap();
            harness.task.await.unwrap();

            let mut got_notice = false;
            while let Ok(msg) = rx.try_recv() {
                got_notice |= matches!(msg, ServerMessage::Shutdown { .. });
            }
            assert!(got_notice);
        }
    }

    // -------------------------------------------------------------------------
    // End to end over WebSocket
    // -------------------------------------------------------------------------

    type Client = WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

    async fn send(ws: &mut Client, msg: ClientMessage) {
        ws.send(Message::Text(msg.to_json().unwrap())).await.unwrap();
    }

    async fn recv_where<F>(ws: &mut Client, mut pred: F) -> ServerMessage
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        let wait = async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let msg = ServerMessage::from_json(&text).unwrap();
                        if pred(&msg) {
                            return msg;
                        }
                    }
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended: {:?}", other),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(10), wait)
            .await
            .expect("timed out waiting for message")
    }

    #[tokio::test]
    async fn test_websocket_round_trip() {
        let game_config = GameConfig {
            start_delay: Duration::from_millis(50),
            tick_interval: Duration::from_millis(50),
            seed: Some(1),
            ..Default::default()
        };
        let server = Arc::new(GameServer::new(ServerConfig::default(), game_config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let running = server.clone();
        let server_task = tokio::spawn(async move { running.serve(listener).await });

        let url = format!("ws://{}", addr);
        let (mut ana, _) = connect_async(url.as_str()).await.unwrap();
        let (mut bo, _) = connect_async(url.as_str()).await.unwrap();

        // Requests before joining are refused
        send(&mut ana, ClientMessage::Ready).await;
        let refused = recv_where(&mut ana, |_| true).await;
        assert!(matches!(
            refused,
            ServerMessage::Error(ref e) if e.code == ErrorCode::NotJoined
        ));

        // Garbage is ignored, ping still answered
        ana.send(Message::Text("{\"type\":\"nope\"}".to_string())).await.unwrap();
        send(&mut ana, ClientMessage::Ping { timestamp: 99 }).await;
        let pong = recv_where(&mut ana, |_| true).await;
        assert!(matches!(pong, ServerMessage::Pong { timestamp: 99, .. }));

        send(&mut ana, ClientMessage::Join { name: "ana".into() }).await;
        let ana_id = match recv_where(&mut ana, |m| matches!(m, ServerMessage::Joined { .. })).await {
            ServerMessage::Joined { player_id, .. } => player_id,
            _ => unreachable!(),
        };

        send(&mut bo, ClientMessage::Join { name: "  ".into() }).await;
        let rejected = recv_where(&mut bo, |_| true).await;
        assert!(matches!(
            rejected,
            ServerMessage::Error(ref e) if e.code == ErrorCode::InvalidName
        ));

        send(&mut bo, ClientMessage::Join { name: "bo".into() }).await;
        recv_where(&mut bo, |m| matches!(m, ServerMessage::Joined { .. })).await;
        let joined = recv_where(&mut ana, |m| matches!(m, ServerMessage::PlayerJoined { .. })).await;
        assert!(matches!(joined, ServerMessage::PlayerJoined { ref player } if player.name == "bo"));

        send(&mut bo, ClientMessage::Join { name: "again".into() }).await;
        let again = recv_where(&mut bo, |m| matches!(m, ServerMessage::Error(_))).await;
        assert!(matches!(again, ServerMessage::Error(ref e) if e.code == ErrorCode::AlreadyJoined));

        send(&mut ana, ClientMessage::Ready).await;
        send(&mut bo, ClientMessage::Ready).await;
        recv_where(&mut ana, |m| matches!(m, ServerMessage::RoundStart { .. })).await;

        let tick = recv_where(&mut ana, |m| matches!(m, ServerMessage::Tick(_))).await;
        assert!(matches!(tick, ServerMessage::Tick(ref u) if u.board.snakes.len() == 2));

        // bo drops out; ana wins
        bo.close(None).await.unwrap();
        let end = recv_where(&mut ana, |m| matches!(m, ServerMessage::RoundEnd(_))).await;
        match end {
            ServerMessage::RoundEnd(info) => {
                assert_eq!(info.winner_id, Some(ana_id));
                assert_eq!(info.winner_name.as_deref(), Some("ana"));
            }
            _ => unreachable!(),
        }

        server.shutdown();
        let notice = recv_where(&mut ana, |m| matches!(m, ServerMessage::Shutdown { .. })).await;
        assert!(matches!(notice, ServerMessage::Shutdown { .. }));
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit_counts_pending_handshakes() {
        let server_config = ServerConfig {
            max_connections: 1,
            ..Default::default()
        };
        let server = Arc::new(GameServer::new(server_config, test_config()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let running = server.clone();
        let server_task = tokio::spawn(async move { running.serve(listener).await });

        // Holds the only slot without ever finishing the handshake
        let idle = TcpStream::connect(addr).await.unwrap();
        let url = format!("ws://{}", addr);
        let second = tokio::time::timeout(Duration::from_secs(5), connect_async(url.as_str()))
            .await
            .expect("rejection should be immediate");
        assert!(second.is_err());
        assert_eq!(server.connection_count().await, 1);

        drop(idle);
        server.shutdown();
        server_task.await.unwrap().unwrap();
        assert_eq!(server.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_refuses_to_serve() {
        let game_config = GameConfig {
            board_height: 5,
            ..Default::default()
        };
        let server = GameServer::new(ServerConfig::default(), game_config);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let result = server.serve(listener).await;
        assert!(matches!(result, Err(GameServerError::Config(_))));
    }

    #[test]
    fn test_tick_events_survive_json() {
        // Events carried in tick frames parse back on the client side
        let msg = ServerMessage::Tick(crate::network::protocol::TickUpdate {
            tick: 2,
            board: crate::network::protocol::BoardSnapshot {
                width: 10,
                height: 10,
                snakes: vec![],
                fruit: None,
            },
            events: vec![GameEvent::RoundEnded { tick: 2, winner_id: None }],
        });
        let back = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(back, msg);
    }
}
