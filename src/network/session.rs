//! Live Match Sessions
//!
//! A `LiveMatch` is one server-hosted match between a connected human
//! and the AI, owned by that connection's driver task. It wraps the
//! deterministic simulation with the wall-clock concerns the core
//! must not know about: measuring elapsed time between ticks, holding
//! the latest paddle input until the next tick consumes it, and
//! noticing when the countdown crosses a whole-second boundary so the
//! client can be told once per second rather than once per tick.

use std::time::Instant;

use uuid::Uuid;

use crate::core::rng::derive_match_seed;
use crate::game::state::{MatchPhase, MatchState, Paddle};
use crate::game::tick::{tick, SimConfig, TickResult};
use crate::game::{AiProfile, PaddleCommand};
use crate::network::protocol::{BallSnapshot, MatchSnapshot, PaddleSnapshot};
use crate::TICK_RATE;

/// A server-hosted match in progress.
pub struct LiveMatch {
    /// Unique match identifier.
    pub match_id: Uuid,
    /// The human participant.
    pub player_id: String,
    config: SimConfig,
    state: MatchState,
    profile: AiProfile,
    pending: PaddleCommand,
    started_at: Instant,
    last_tick: Option<Instant>,
    announced_countdown: Option<u32>,
}

impl LiveMatch {
    /// Start a match for `player_id` with an AI profile captured at
    /// match start. The simulation seed is derived from the match id
    /// and the player id, so a match is replayable from its record.
    pub fn new(player_id: impl Into<String>, profile: AiProfile, config: SimConfig) -> Self {
        let player_id = player_id.into();
        let match_id = Uuid::new_v4();
        let seed = derive_match_seed(match_id.as_bytes(), &player_id);

        let mut state = MatchState::new(&config, seed);
        state.start(&config);

        Self {
            match_id,
            player_id,
            config,
            state,
            profile,
            pending: PaddleCommand::Hold,
            started_at: Instant::now(),
            last_tick: None,
            announced_countdown: None,
        }
    }

    /// Stash the latest paddle input; the next tick consumes it.
    /// A newer command before the tick simply replaces the older one.
    pub fn submit_input(&mut self, command: PaddleCommand) {
        self.pending = command;
    }

    /// Advance one tick, measuring elapsed wall time since the last.
    pub fn run_tick(&mut self) -> TickResult {
        let now = Instant::now();
        let elapsed_ms = self
            .last_tick
            .map(|t| (now - t).as_secs_f32() * 1000.0)
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.run_tick_with_elapsed(elapsed_ms)
    }

    /// Advance one tick with an explicit elapsed time.
    pub fn run_tick_with_elapsed(&mut self, elapsed_ms: f32) -> TickResult {
        let input = std::mem::take(&mut self.pending);
        tick(&mut self.state, input, &self.profile, &self.config, elapsed_ms)
    }

    /// Whole seconds left on the countdown, only when the value
    /// changed since it was last returned.
    pub fn countdown_announcement(&mut self) -> Option<u32> {
        let MatchPhase::Countdown { ticks_remaining, .. } = self.state.phase else {
            self.announced_countdown = None;
            return None;
        };
        let seconds = ticks_remaining.div_ceil(TICK_RATE);
        if seconds == 0 || self.announced_countdown == Some(seconds) {
            return None;
        }
        self.announced_countdown = Some(seconds);
        Some(seconds)
    }

    /// Wire snapshot of the current state.
    pub fn snapshot(&self) -> MatchSnapshot {
        let paddle = |p: &Paddle| PaddleSnapshot { y: p.y, score: p.score };
        MatchSnapshot {
            tick: u64::from(self.state.tick),
            phase: self.state.phase,
            ball: BallSnapshot {
                x: self.state.ball.x,
                y: self.state.ball.y,
                dx: self.state.ball.dx,
                dy: self.state.ball.dy,
            },
            player: paddle(&self.state.player),
            ai: paddle(&self.state.ai),
        }
    }

    /// Wall-clock match length so far.
    pub fn duration_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Whether the simulation has reached its end phase.
    pub fn is_over(&self) -> bool {
        matches!(self.state.phase, MatchPhase::Ended { .. })
    }

    /// Current scores as (player, ai).
    pub fn scores(&self) -> (u32, u32) {
        (self.state.player.score, self.state.ai.score)
    }
}
