//! Game Logic Module
//!
//! All match simulation code. Pure state transitions, no I/O.
//!
//! ## Module Structure
//!
//! - `state`: Ball, paddles, match phase machine
//! - `ai`: Difficulty profiles and the predictive paddle controller
//! - `tick`: Per-tick physics, scoring, win check

pub mod ai;
pub mod state;
pub mod tick;

// Re-export key types
pub use ai::{AiProfile, Difficulty};
pub use state::{Ball, MatchPhase, MatchState, Paddle, PaddleCommand};
pub use tick::{tick, GameEvent, MatchOutcome, SimConfig, TickResult};
