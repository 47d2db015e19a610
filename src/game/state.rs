//! Game State Definitions
//!
//! All state types for match simulation. A match owns one `MatchState`;
//! it is created when the match starts and discarded when the match
//! ends or the connection drops — nothing here is persisted.

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;
use crate::game::tick::SimConfig;

// =============================================================================
// BALL & PADDLES
// =============================================================================

/// The ball. Position is its center, in arena coordinates where y
/// grows downward.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Ball {
    /// Horizontal center position
    pub x: f32,
    /// Vertical center position
    pub y: f32,
    /// Horizontal velocity per tick
    pub dx: f32,
    /// Vertical velocity per tick
    pub dy: f32,
    /// Collision radius
    pub radius: f32,
}

impl Ball {
    /// Current horizontal speed magnitude.
    #[inline]
    pub fn speed_x(&self) -> f32 {
        self.dx.abs()
    }
}

/// Which side a paddle defends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    /// Human player, left paddle
    Player,
    /// AI opponent, right paddle
    Ai,
}

/// A paddle. Position is its top-left corner.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Paddle {
    /// Horizontal position (fixed per side)
    pub x: f32,
    /// Vertical position of the top edge
    pub y: f32,
    /// Paddle width
    pub width: f32,
    /// Paddle height
    pub height: f32,
    /// Points scored this match by this side
    pub score: u32,
}

impl Paddle {
    /// Vertical center of the paddle face.
    #[inline]
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Clamp the paddle inside `[0, arena_height - height]`.
    ///
    /// Applied on every update, both for the human and the AI paddle.
    #[inline]
    pub fn clamp(&mut self, arena_height: f32) {
        self.y = self.y.clamp(0.0, arena_height - self.height);
    }

    /// Axis-aligned overlap test between the ball's bounding box and
    /// this paddle's rectangle.
    pub fn intersects(&self, ball: &Ball) -> bool {
        ball.x + ball.radius > self.x
            && ball.x - ball.radius < self.x + self.width
            && ball.y + ball.radius > self.y
            && ball.y - ball.radius < self.y + self.height
    }
}

// =============================================================================
// INPUT
// =============================================================================

/// One tick's worth of human paddle input.
///
/// Pointer input sets an absolute target (the paddle centers under the
/// cursor); key input nudges by the paddle key speed. `Hold` is the
/// neutral command for ticks without input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PaddleCommand {
    /// No movement this tick
    #[default]
    Hold,
    /// Move up by the key speed
    Up,
    /// Move down by the key speed
    Down,
    /// Center the paddle on the given y coordinate
    MoveTo {
        /// Target vertical center
        y: f32,
    },
}

// =============================================================================
// MATCH PHASE
// =============================================================================

/// Match state machine.
///
/// `Idle → Countdown(start) → Rallying → PointScored →
/// Countdown(resume) → Rallying … → Ended → Idle`
///
/// Countdowns are counted in ticks rather than timers so the machine
/// has explicit suspend points and can be driven tick-by-tick in tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum MatchPhase {
    /// No match in progress. Initial state, and terminal between matches.
    Idle,
    /// Counting down to a serve.
    Countdown {
        /// Ticks until the serve
        ticks_remaining: u32,
        /// True when resuming after a point, false at match start
        resume: bool,
    },
    /// Ball in play.
    Rallying,
    /// A point just landed; transitions to the resume countdown next tick.
    PointScored {
        /// Side that won the point
        scorer: Side,
    },
    /// Match over. The host records the outcome and returns to `Idle`.
    Ended {
        /// True when the human player reached the winning score
        player_won: bool,
    },
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Full transient state of one in-progress match.
#[derive(Clone, Debug)]
pub struct MatchState {
    /// Current phase
    pub phase: MatchPhase,
    /// The ball
    pub ball: Ball,
    /// Human paddle (left)
    pub player: Paddle,
    /// AI paddle (right)
    pub ai: Paddle,
    /// Ticks simulated while rallying
    pub tick: u32,
    /// Randomness for serves and AI noise
    pub rng: DeterministicRng,
}

impl MatchState {
    /// Create a fresh match in `Idle` with everything centered.
    pub fn new(config: &SimConfig, seed: u64) -> Self {
        let paddle_y = (config.arena_height - config.paddle_height) / 2.0;

        Self {
            phase: MatchPhase::Idle,
            ball: Ball {
                x: config.arena_width / 2.0,
                y: config.arena_height / 2.0,
                dx: 0.0,
                dy: 0.0,
                radius: config.ball_radius,
            },
            player: Paddle {
                x: config.player_paddle_x,
                y: paddle_y,
                width: config.paddle_width,
                height: config.paddle_height,
                score: 0,
            },
            ai: Paddle {
                x: config.arena_width - config.ai_paddle_inset,
                y: paddle_y,
                width: config.paddle_width,
                height: config.paddle_height,
                score: 0,
            },
            tick: 0,
            rng: DeterministicRng::new(seed),
        }
    }

    /// Begin the match: zero the scores and enter the start countdown.
    pub fn start(&mut self, config: &SimConfig) {
        self.player.score = 0;
        self.ai.score = 0;
        self.tick = 0;
        self.phase = MatchPhase::Countdown {
            ticks_remaining: config.start_countdown_ticks,
            resume: false,
        };
    }

    /// Reset the ball to center with a randomized serve direction:
    /// `dx = ±serve_speed` uniformly, `dy` uniform in
    /// `[-serve_speed, serve_speed]`.
    pub fn reset_serve(&mut self, config: &SimConfig) {
        self.ball.x = config.arena_width / 2.0;
        self.ball.y = config.arena_height / 2.0;
        self.ball.dx = self.rng.next_sign() * config.serve_speed;
        self.ball.dy = self
            .rng
            .next_f32_range(-config.serve_speed, config.serve_speed);
    }

    /// Whether a match is currently running (any phase but `Idle`).
    pub fn in_match(&self) -> bool {
        self.phase != MatchPhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimConfig {
        SimConfig::default()
    }

    #[test]
    fn test_new_state_is_idle_and_centered() {
        let cfg = config();
        let state = MatchState::new(&cfg, 1);

        assert_eq!(state.phase, MatchPhase::Idle);
        assert!(!state.in_match());
        assert_eq!(state.ball.x, cfg.arena_width / 2.0);
        assert_eq!(state.ball.y, cfg.arena_height / 2.0);
        assert_eq!(state.player.score, 0);
        assert_eq!(state.ai.score, 0);
    }

    #[test]
    fn test_start_enters_countdown() {
        let cfg = config();
        let mut state = MatchState::new(&cfg, 1);
        state.player.score = 7;

        state.start(&cfg);

        assert_eq!(
            state.phase,
            MatchPhase::Countdown {
                ticks_remaining: cfg.start_countdown_ticks,
                resume: false
            }
        );
        assert_eq!(state.player.score, 0);
    }

    #[test]
    fn test_serve_direction_in_bounds() {
        let cfg = config();
        let mut state = MatchState::new(&cfg, 42);

        for _ in 0..100 {
            state.reset_serve(&cfg);
            assert_eq!(state.ball.dx.abs(), cfg.serve_speed);
            assert!(state.ball.dy.abs() <= cfg.serve_speed);
            assert_eq!(state.ball.x, cfg.arena_width / 2.0);
        }
    }

    #[test]
    fn test_serve_is_deterministic_per_seed() {
        let cfg = config();
        let mut a = MatchState::new(&cfg, 77);
        let mut b = MatchState::new(&cfg, 77);

        for _ in 0..10 {
            a.reset_serve(&cfg);
            b.reset_serve(&cfg);
            assert_eq!(a.ball.dx, b.ball.dx);
            assert_eq!(a.ball.dy, b.ball.dy);
        }
    }

    #[test]
    fn test_paddle_clamp() {
        let cfg = config();
        let mut state = MatchState::new(&cfg, 1);

        state.player.y = -50.0;
        state.player.clamp(cfg.arena_height);
        assert_eq!(state.player.y, 0.0);

        state.player.y = cfg.arena_height + 10.0;
        state.player.clamp(cfg.arena_height);
        assert_eq!(state.player.y, cfg.arena_height - state.player.height);
    }

    #[test]
    fn test_paddle_intersects_ball() {
        let cfg = config();
        let state = MatchState::new(&cfg, 1);

        let mut ball = state.ball;
        ball.x = state.player.x + state.player.width / 2.0;
        ball.y = state.player.center_y();
        assert!(state.player.intersects(&ball));

        ball.x = cfg.arena_width / 2.0;
        assert!(!state.player.intersects(&ball));
    }
}
