//! Rating & Leaderboard Engine
//!
//! Converts match outcomes into ELO rating updates, derives rank
//! tiers, applies inactivity decay, and ranks the player population.
//!
//! ## Module Structure
//!
//! - `elo`: Pure rating math (deltas, tiers, decay)
//! - `player`: Player entities, match records, per-match stat updates
//! - `store`: Versioned in-memory entity + record storage
//! - `leaderboard`: Ranking, tie-break, percentile
//! - `service`: The orchestrating service with conflict retry

pub mod elo;
pub mod leaderboard;
pub mod player;
pub mod service;
pub mod store;

// Re-export key types
pub use elo::{compute_rating, RankTier};
pub use leaderboard::{LeaderboardEntry, PlayerStats};
pub use player::{MatchRecord, PlayerEntity};
pub use service::{GameService, ServiceError};
pub use store::MemoryStore;
