//! Network Layer
//!
//! WebSocket server for real-time communication. This layer is
//! **non-deterministic** - all game logic runs through `game/` and
//! all rating math through `rating/`.

pub mod auth;
pub mod broadcast;
pub mod protocol;
pub mod server;
pub mod session;

pub use auth::{validate_token, AuthConfig, AuthError, TokenClaims};
pub use broadcast::Broadcaster;
pub use protocol::{ClientMessage, ErrorCode, MatchSnapshot, ServerMessage};
pub use server::{GameServer, GameServerError, ServerConfig};
pub use session::LiveMatch;
