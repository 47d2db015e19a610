//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. All
//! messages are JSON. Client messages carry their fields flat next to
//! the `type` tag; server messages wrap their payload in a `data`
//! object so broadcast frames can be serialized once and fanned out.

use serde::{Deserialize, Serialize};

use crate::game::{MatchPhase, PaddleCommand};
use crate::rating::leaderboard::{LeaderboardEntry, PlayerStats};
use crate::rating::player::{MatchRecord, PlayerView};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Authenticate with a JWT.
    Auth { token: String },

    /// Claim an identity without a token. Only honored when the
    /// server runs without an auth secret (local development).
    Identify { player_id: String },

    /// Request the stats bundle for a player.
    GetPlayerStats { player_id: String },

    /// Request the leaderboard.
    GetLeaderboard {
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },

    /// Record an externally-played match result.
    RecordMatch {
        player_score: i64,
        ai_score: i64,
        duration_seconds: f64,
    },

    /// Set the AI's baseline difficulty (admin only).
    SetAiDifficulty { level: String },

    /// Request the AI's current baseline profile.
    GetAiProfile,

    /// Start a server-hosted match against the AI.
    StartMatch,

    /// Paddle input for the current live match.
    PaddleInput { command: PaddleCommand },

    /// Abandon the current live match.
    LeaveMatch,

    /// Reset all leaderboard ratings and match records (admin only).
    ResetLeaderboard,

    /// Wipe every player and record (admin only).
    ResetAllData,

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client, as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Authentication result.
    AuthResult(AuthResult),

    /// Current leaderboard; pushed on connect and after every change.
    LeaderboardUpdate(Vec<LeaderboardEntry>),

    /// Stats bundle for a requested player.
    PlayerStats(PlayerStats),

    /// A match finished and was recorded.
    GameCompleted(GameCompletedInfo),

    /// A participant's stats changed.
    StatsUpdate(PlayerView),

    /// The leaderboard was reset by an admin.
    LeaderboardReset,

    /// The AI's baseline profile.
    AiProfile(AiProfileInfo),

    /// Acknowledges a RecordMatch request to its sender.
    MatchRecorded(MatchRecord),

    /// Live match snapshot, sent every broadcastable tick.
    MatchState(MatchSnapshot),

    /// Countdown milestone during a live match.
    Countdown { seconds: u32 },

    /// A live match reached its end.
    MatchEnded {
        player_won: bool,
        player_score: u32,
        ai_score: u32,
    },

    /// An admin reset completed.
    ResetDone { scope: String },

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Request failed.
    Error(ServerError),
}

/// Authentication result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    /// Whether auth succeeded.
    pub success: bool,
    /// Authenticated player id, if successful.
    pub player_id: Option<String>,
    /// Error message if failed.
    pub error: Option<String>,
    /// Server version.
    pub server_version: String,
}

/// Payload for a completed match broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCompletedInfo {
    /// Human participant after the update.
    pub player: PlayerView,
    /// AI entity after the update.
    pub ai: PlayerView,
    /// The recorded result.
    pub record: MatchRecord,
}

/// AI baseline profile payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiProfileInfo {
    /// Difficulty level name.
    pub level: String,
    /// Paddle speed in units per tick.
    pub speed: f32,
    /// Reaction noise magnitude.
    pub reaction_delay: f32,
    /// Prediction noise magnitude.
    pub prediction_error: f32,
}

/// Live match snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    /// Simulation tick.
    pub tick: u64,
    /// Current phase.
    pub phase: MatchPhase,
    /// Ball position and velocity.
    pub ball: BallSnapshot,
    /// Human paddle.
    pub player: PaddleSnapshot,
    /// AI paddle.
    pub ai: PaddleSnapshot,
}

/// Ball state on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallSnapshot {
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Horizontal velocity per tick.
    pub dx: f32,
    /// Vertical velocity per tick.
    pub dy: f32,
}

/// Paddle state on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaddleSnapshot {
    /// Top edge y.
    pub y: f32,
    /// Points scored so far.
    pub score: u32,
}

/// Server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// Authentication failed.
    AuthFailed,
    /// Not authenticated.
    NotAuthenticated,
    /// Operation requires admin rights.
    Forbidden,
    /// Request payload failed validation.
    InvalidInput,
    /// Requested player does not exist.
    NotFound,
    /// Write lost a concurrency race and exhausted retries.
    Conflict,
    /// Already in a live match.
    AlreadyInMatch,
    /// No live match in progress.
    NotInMatch,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

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
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
