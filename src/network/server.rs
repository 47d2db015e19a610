//! WebSocket Game Server
//!
//! Accepts WebSocket connections and routes client messages to the
//! rating service and live match sessions. Each connection gets one
//! writer task fed by its broadcaster channel; targeted replies and
//! fan-out broadcasts travel the same queue, so a connection has
//! exactly one socket writer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::game::tick::SimConfig;
use crate::game::PaddleCommand;
use crate::network::auth::{validate_token, AuthConfig};
use crate::network::broadcast::Broadcaster;
use crate::network::protocol::{
    AiProfileInfo, AuthResult, ClientMessage, ErrorCode, ServerError, ServerMessage,
};
use crate::network::session::LiveMatch;
use crate::rating::service::{GameService, ServiceError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Tick rate for live match simulation (Hz).
    pub tick_rate: u32,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 1000,
            tick_rate: crate::TICK_RATE,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bind_addr),
            max_connections: std::env::var("MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            tick_rate: defaults.tick_rate,
            version: defaults.version,
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Everything a connection task needs, bundled once.
struct ServerContext {
    config: ServerConfig,
    auth: AuthConfig,
    service: Arc<GameService>,
    broadcaster: Arc<Broadcaster>,
}

/// Per-connection state, owned by that connection's task.
struct ClientState {
    conn_id: Uuid,
    player_id: Option<String>,
    admin: bool,
    live_match: Option<LiveMatchHandle>,
}

/// Control handles into a running live-match task.
struct LiveMatchHandle {
    input_tx: mpsc::Sender<PaddleCommand>,
    task: tokio::task::JoinHandle<()>,
}

impl ClientState {
    fn in_live_match(&self) -> bool {
        self.live_match
            .as_ref()
            .map(|h| !h.task.is_finished())
            .unwrap_or(false)
    }

    fn abort_live_match(&mut self) {
        if let Some(handle) = self.live_match.take() {
            handle.task.abort();
        }
    }
}

/// The game server.
pub struct GameServer {
    context: Arc<ServerContext>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(
        config: ServerConfig,
        auth: AuthConfig,
        service: Arc<GameService>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            context: Arc::new(ServerContext { config, auth, service, broadcaster }),
            shutdown_tx,
        }
    }

    /// Run the accept loop until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.context.config.bind_addr).await?;
        info!("game server listening on {}", self.context.config.bind_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.context.broadcaster.subscriber_count()
                                >= self.context.config.max_connections
                            {
                                warn!("connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            debug!("new connection from {}", addr);
                            let context = self.context.clone();
                            tokio::spawn(async move {
                                handle_connection(context, stream, addr).await;
                            });
                        }
                        Err(e) => {
                            error!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.context.broadcaster.subscriber_count()
    }
}

/// Drive one WebSocket connection from handshake to cleanup.
async fn handle_connection(context: Arc<ServerContext>, stream: TcpStream, addr: SocketAddr) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("websocket handshake failed for {}: {}", addr, e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let conn_id = Uuid::new_v4();
    let mut outbox = context.broadcaster.subscribe(conn_id);

    // One writer per socket: everything leaves through this task
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let mut state = ClientState {
        conn_id,
        player_id: None,
        admin: false,
        live_match: None,
    };

    // New subscribers see the board immediately
    context.broadcaster.send_to(
        conn_id,
        &ServerMessage::LeaderboardUpdate(context.service.get_leaderboard(None)),
    );

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let client_msg = match ClientMessage::from_json(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        debug!("invalid message from {}: {}", addr, e);
                        send_error(&context, conn_id, ErrorCode::InvalidInput, "invalid message format");
                        continue;
                    }
                };
                handle_client_message(&context, &mut state, client_msg).await;
            }
            Ok(Message::Ping(_)) => {
                // tungstenite answers pings at the protocol level
            }
            Ok(Message::Close(_)) => {
                debug!("client {} closed", addr);
                break;
            }
            Err(e) => {
                debug!("websocket error for {}: {}", addr, e);
                break;
            }
            _ => {}
        }
    }

    state.abort_live_match();
    context.broadcaster.unsubscribe(conn_id);
    sender_task.abort();
    debug!("client {} cleaned up", addr);
}

/// Route one parsed client message.
async fn handle_client_message(
    context: &Arc<ServerContext>,
    state: &mut ClientState,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::Auth { token } => handle_auth(context, state, &token),
        ClientMessage::Identify { player_id } => handle_identify(context, state, player_id),
        ClientMessage::GetPlayerStats { player_id } => {
            match context.service.get_player_stats(&player_id) {
                Ok(stats) => {
                    context
                        .broadcaster
                        .send_to(state.conn_id, &ServerMessage::PlayerStats(stats));
                }
                Err(e) => send_service_error(context, state.conn_id, &e),
            }
        }
        ClientMessage::GetLeaderboard { limit } => {
            let board = context.service.get_leaderboard(limit);
            context
                .broadcaster
                .send_to(state.conn_id, &ServerMessage::LeaderboardUpdate(board));
        }
        ClientMessage::RecordMatch { player_score, ai_score, duration_seconds } => {
            let Some(player_id) = require_identity(context, state) else { return };
            match context
                .service
                .record_match(&player_id, player_score, ai_score, duration_seconds)
            {
                Ok(record) => {
                    context
                        .broadcaster
                        .send_to(state.conn_id, &ServerMessage::MatchRecorded(record));
                }
                Err(e) => send_service_error(context, state.conn_id, &e),
            }
        }
        ClientMessage::SetAiDifficulty { level } => {
            if !require_admin(context, state) {
                return;
            }
            match context.service.set_ai_difficulty(&level) {
                Ok(difficulty) => {
                    let profile = difficulty.profile();
                    context.broadcaster.publish(&ServerMessage::AiProfile(AiProfileInfo {
                        level: difficulty.to_string(),
                        speed: profile.speed,
                        reaction_delay: profile.reaction_delay,
                        prediction_error: profile.prediction_error,
                    }));
                }
                Err(e) => send_service_error(context, state.conn_id, &e),
            }
        }
        ClientMessage::GetAiProfile => {
            let (difficulty, profile) = context.service.get_ai_profile();
            context.broadcaster.send_to(
                state.conn_id,
                &ServerMessage::AiProfile(AiProfileInfo {
                    level: difficulty.to_string(),
                    speed: profile.speed,
                    reaction_delay: profile.reaction_delay,
                    prediction_error: profile.prediction_error,
                }),
            );
        }
        ClientMessage::StartMatch => start_live_match(context, state),
        ClientMessage::PaddleInput { command } => {
            let Some(handle) = state.live_match.as_ref().filter(|h| !h.task.is_finished()) else {
                send_error(context, state.conn_id, ErrorCode::NotInMatch, "no live match in progress");
                return;
            };
            // Best-effort: a full input queue keeps only what fits,
            // the next tick reads the freshest delivered command
            let _ = handle.input_tx.try_send(command);
        }
        ClientMessage::LeaveMatch => {
            if state.in_live_match() {
                state.abort_live_match();
                info!(player = ?state.player_id, "live match abandoned");
            } else {
                send_error(context, state.conn_id, ErrorCode::NotInMatch, "no live match in progress");
            }
        }
        ClientMessage::ResetLeaderboard => {
            if !require_admin(context, state) {
                return;
            }
            match context.service.reset_leaderboard() {
                Ok(()) => {
                    context.broadcaster.send_to(
                        state.conn_id,
                        &ServerMessage::ResetDone { scope: "leaderboard".into() },
                    );
                }
                Err(e) => send_service_error(context, state.conn_id, &e),
            }
        }
        ClientMessage::ResetAllData => {
            if !require_admin(context, state) {
                return;
            }
            match context.service.reset_all_data() {
                Ok(()) => {
                    context.broadcaster.send_to(
                        state.conn_id,
                        &ServerMessage::ResetDone { scope: "all".into() },
                    );
                }
                Err(e) => send_service_error(context, state.conn_id, &e),
            }
        }
        ClientMessage::Ping { timestamp } => {
            context.broadcaster.send_to(
                state.conn_id,
                &ServerMessage::Pong {
                    timestamp,
                    server_time: std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_millis() as u64,
                },
            );
        }
    }
}

/// Token-based authentication.
fn handle_auth(context: &Arc<ServerContext>, state: &mut ClientState, token: &str) {
    match validate_token(token, &context.auth) {
        Ok(claims) => {
            if let Err(e) = context.service.get_or_create_player(&claims.sub) {
                send_service_error(context, state.conn_id, &e);
                return;
            }
            info!(player = %claims.sub, admin = claims.admin, "client authenticated");
            state.player_id = Some(claims.sub.clone());
            state.admin = claims.admin;
            context.broadcaster.send_to(
                state.conn_id,
                &ServerMessage::AuthResult(AuthResult {
                    success: true,
                    player_id: Some(claims.sub),
                    error: None,
                    server_version: context.config.version.clone(),
                }),
            );
        }
        Err(e) => {
            debug!("auth failed: {}", e);
            context.broadcaster.send_to(
                state.conn_id,
                &ServerMessage::AuthResult(AuthResult {
                    success: false,
                    player_id: None,
                    error: Some(e.to_string()),
                    server_version: context.config.version.clone(),
                }),
            );
        }
    }
}

/// Bare identity claim, honored only when no auth is configured.
fn handle_identify(context: &Arc<ServerContext>, state: &mut ClientState, player_id: String) {
    if context.auth.is_configured() {
        send_error(
            context,
            state.conn_id,
            ErrorCode::AuthFailed,
            "this server requires token authentication",
        );
        return;
    }
    if let Err(e) = context.service.get_or_create_player(&player_id) {
        send_service_error(context, state.conn_id, &e);
        return;
    }
    info!(player = %player_id, "client identified (no auth configured)");
    state.player_id = Some(player_id.clone());
    state.admin = false;
    context.broadcaster.send_to(
        state.conn_id,
        &ServerMessage::AuthResult(AuthResult {
            success: true,
            player_id: Some(player_id),
            error: None,
            server_version: context.config.version.clone(),
        }),
    );
}

/// Spawn the 60Hz driver task for a live match.
fn start_live_match(context: &Arc<ServerContext>, state: &mut ClientState) {
    let Some(player_id) = require_identity(context, state) else { return };

    if state.in_live_match() {
        send_error(context, state.conn_id, ErrorCode::AlreadyInMatch, "match already in progress");
        return;
    }

    let profile = match context.service.match_profile_for(&player_id) {
        Ok(profile) => profile,
        Err(e) => {
            send_service_error(context, state.conn_id, &e);
            return;
        }
    };

    let (input_tx, mut input_rx) = mpsc::channel::<PaddleCommand>(16);
    let conn_id = state.conn_id;
    let context = context.clone();
    let tick_rate = context.config.tick_rate;

    let task = tokio::spawn(async move {
        let mut live = LiveMatch::new(player_id.clone(), profile, SimConfig::default());
        info!(player = %player_id, match_id = %live.match_id, "live match started");

        let mut ticker = interval(Duration::from_micros(1_000_000 / tick_rate as u64));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            while let Ok(command) = input_rx.try_recv() {
                live.submit_input(command);
            }

            let result = live.run_tick();

            if let Some(seconds) = live.countdown_announcement() {
                context
                    .broadcaster
                    .send_to(conn_id, &ServerMessage::Countdown { seconds });
            }
            context
                .broadcaster
                .send_to(conn_id, &ServerMessage::MatchState(live.snapshot()));

            if result.match_ended {
                let Some(outcome) = result.outcome else { break };
                let (player_score, ai_score) = (outcome.player_score, outcome.ai_score);

                context.broadcaster.send_to(
                    conn_id,
                    &ServerMessage::MatchEnded {
                        player_won: outcome.player_won(),
                        player_score,
                        ai_score,
                    },
                );

                if let Err(e) = context.service.record_match(
                    &player_id,
                    player_score as i64,
                    ai_score as i64,
                    live.duration_secs(),
                ) {
                    warn!(player = %player_id, error = %e, "failed to record live match");
                }
                break;
            }
        }
    });

    state.live_match = Some(LiveMatchHandle { input_tx, task });
}

/// The caller's player id, or a NotAuthenticated error to the wire.
fn require_identity(context: &Arc<ServerContext>, state: &ClientState) -> Option<String> {
    match &state.player_id {
        Some(id) => Some(id.clone()),
        None => {
            send_error(context, state.conn_id, ErrorCode::NotAuthenticated, "authenticate first");
            None
        }
    }
}

/// Whether the caller holds a verified admin claim.
///
/// Admin rights only ever come from a signed token; a server running
/// without auth configured refuses every admin operation.
fn require_admin(context: &Arc<ServerContext>, state: &ClientState) -> bool {
    if state.admin && context.auth.is_configured() {
        return true;
    }
    send_error(context, state.conn_id, ErrorCode::Forbidden, "admin privileges required");
    false
}

fn send_error(context: &Arc<ServerContext>, conn_id: Uuid, code: ErrorCode, message: &str) {
    context.broadcaster.send_to(
        conn_id,
        &ServerMessage::Error(ServerError { code, message: message.to_string() }),
    );
}

fn send_service_error(context: &Arc<ServerContext>, conn_id: Uuid, error: &ServiceError) {
    let code = match error {
        ServiceError::Validation(_) => ErrorCode::InvalidInput,
        ServiceError::NotFound(_) => ErrorCode::NotFound,
        ServiceError::Conflict(_) => ErrorCode::Conflict,
        ServiceError::Storage(_) => ErrorCode::InternalError,
    };
    send_error(context, conn_id, code, &error.to_string());
}
