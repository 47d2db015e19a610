//! # Neon Pong Server
//!
//! Authoritative server for a human-vs-AI paddle-ball match, with
//! ELO skill ratings and a live leaderboard pushed to subscribers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    NEON PONG SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Xorshift128+ PRNG, serve seed derivation  │
//! │  └── clock.rs    - Injected clock (real time vs. test time)  │
//! │                                                              │
//! │  game/           - Match simulation (pure, no I/O)           │
//! │  ├── state.rs    - Ball, paddles, match phase machine        │
//! │  ├── ai.rs       - Difficulty profiles, predictive paddle AI │
//! │  └── tick.rs     - Per-tick physics, scoring, win check      │
//! │                                                              │
//! │  rating/         - Rating & leaderboard engine               │
//! │  ├── elo.rs      - ELO deltas, rank tiers, inactivity decay  │
//! │  ├── player.rs   - Player entities and per-match stats       │
//! │  ├── store.rs    - Versioned entity + match record storage   │
//! │  ├── leaderboard.rs - Ranking, percentile, tie-break         │
//! │  └── service.rs  - Match recording with conflict retry       │
//! │                                                              │
//! │  network/        - WebSocket layer (non-deterministic)       │
//! │  ├── auth.rs     - JWT identity, server-side admin decision  │
//! │  ├── protocol.rs - {type, data} wire messages                │
//! │  ├── broadcast.rs- Subscriber registry, fan-out publish      │
//! │  ├── session.rs  - Live match session (simulator host)       │
//! │  └── server.rs   - Accept loop and message routing           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Simulation Contract
//!
//! The `core/` and `game/` modules are free of I/O and wall-clock
//! reads: the simulation advances only through [`game::tick::tick`],
//! countdowns are counted in ticks, and all randomness flows from a
//! seeded Xorshift128+ generator. A match replayed with the same seed
//! and inputs produces the same rallies.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod rating;

// Re-export commonly used types
pub use core::clock::{Clock, SystemClock};
pub use core::rng::DeterministicRng;
pub use game::state::{MatchPhase, MatchState};
pub use rating::player::PlayerEntity;
pub use rating::service::{GameService, ServiceError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Match score that ends the match
pub const WINNING_SCORE: u32 = 15;
