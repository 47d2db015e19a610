//! Core deterministic primitives.
//!
//! The simulation never reads the wall clock or ambient entropy
//! directly; it goes through the types in this module so tests can
//! substitute both.

pub mod clock;
pub mod rng;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock};
pub use rng::DeterministicRng;
