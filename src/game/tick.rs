//! Authoritative Simulation Tick
//!
//! One call per frame signal. Drives the phase machine, ball physics,
//! paddle collisions, scoring and the win check. Everything here is a
//! pure state transition over [`MatchState`].

use serde::{Deserialize, Serialize};

use crate::game::ai::{steer, AiProfile};
use crate::game::state::{MatchPhase, MatchState, PaddleCommand, Side};
use crate::WINNING_SCORE;

/// Rally speed-up applied to the ball's horizontal velocity on every
/// paddle hit. Uncapped: long rallies get progressively faster.
pub const PADDLE_SPEEDUP: f32 = 1.1;

/// Deflection factor: vertical velocity after a paddle hit is the
/// contact offset from paddle center times this.
pub const DEFLECTION_FACTOR: f32 = 0.2;

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration for match simulation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Arena width
    pub arena_width: f32,
    /// Arena height
    pub arena_height: f32,
    /// Ball collision radius
    pub ball_radius: f32,
    /// Serve speed (|dx| at serve, |dy| bound)
    pub serve_speed: f32,
    /// Paddle width
    pub paddle_width: f32,
    /// Paddle height
    pub paddle_height: f32,
    /// Human paddle x position
    pub player_paddle_x: f32,
    /// AI paddle distance from the right edge
    pub ai_paddle_inset: f32,
    /// Human paddle movement per key tick
    pub player_key_speed: f32,
    /// Match score that ends the match
    pub winning_score: u32,
    /// Countdown length at match start, in ticks (3s at 60 Hz)
    pub start_countdown_ticks: u32,
    /// Countdown length between points, in ticks (1.5s at 60 Hz)
    pub resume_countdown_ticks: u32,
    /// Frame gaps at or above this are stalls and skipped entirely
    pub stall_threshold_ms: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_width: 800.0,
            arena_height: 500.0,
            ball_radius: 10.0,
            serve_speed: 5.0,
            paddle_width: 10.0,
            paddle_height: 100.0,
            player_paddle_x: 50.0,
            ai_paddle_inset: 60.0,
            player_key_speed: 8.0,
            winning_score: WINNING_SCORE,
            start_countdown_ticks: 180,
            resume_countdown_ticks: 90,
            stall_threshold_ms: 160.0,
        }
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// Events generated by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GameEvent {
    /// Countdown expired, ball served
    ServeLaunched,
    /// Ball bounced off a paddle
    PaddleHit {
        /// Which paddle
        side: Side,
    },
    /// A point landed
    PointScored {
        /// Side that won the point
        scorer: Side,
        /// Human match score after the point
        player_score: u32,
        /// AI match score after the point
        ai_score: u32,
    },
    /// Winning score reached
    MatchEnded {
        /// True when the human player won
        player_won: bool,
    },
}

/// Final scores of a completed match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    /// Human final score
    pub player_score: u32,
    /// AI final score
    pub ai_score: u32,
}

impl MatchOutcome {
    /// Derived: the human won when their score is strictly higher.
    pub fn player_won(&self) -> bool {
        self.player_score > self.ai_score
    }
}

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the match is over
    pub match_ended: bool,
    /// Final scores, set on the tick the match ends
    pub outcome: Option<MatchOutcome>,
}

// =============================================================================
// TICK
// =============================================================================

/// Run one simulation tick.
///
/// # Arguments
///
/// * `state` - The match state (will be mutated)
/// * `input` - Human paddle command for this tick
/// * `profile` - Active AI profile
/// * `config` - Match configuration
/// * `elapsed_ms` - Frame gap since the previous tick; gaps at or above
///   the stall threshold skip the tick entirely (no physics, no AI, no
///   countdown), which avoids tunneling after the process was suspended
pub fn tick(
    state: &mut MatchState,
    input: PaddleCommand,
    profile: &AiProfile,
    config: &SimConfig,
    elapsed_ms: f32,
) -> TickResult {
    let mut result = TickResult::default();

    if elapsed_ms >= config.stall_threshold_ms {
        return result;
    }

    // Phase-specific logic
    match state.phase {
        MatchPhase::Idle => {
            return result;
        }
        MatchPhase::Ended { .. } => {
            result.match_ended = true;
            return result;
        }
        MatchPhase::PointScored { .. } => {
            state.phase = MatchPhase::Countdown {
                ticks_remaining: config.resume_countdown_ticks,
                resume: true,
            };
            return result;
        }
        MatchPhase::Countdown {
            ticks_remaining,
            resume,
        } => {
            if ticks_remaining == 0 {
                state.reset_serve(config);
                state.phase = MatchPhase::Rallying;
                result.events.push(GameEvent::ServeLaunched);
            } else {
                state.phase = MatchPhase::Countdown {
                    ticks_remaining: ticks_remaining - 1,
                    resume,
                };
            }
            return result;
        }
        MatchPhase::Rallying => {
            // Continue with the physics step
        }
    }

    state.tick += 1;

    apply_input(state, input, config);
    update_ball(state, config, &mut result);

    // AI acts after the ball, same order as the physics it reacts to.
    // Skipped once a point lands (the phase has left Rallying).
    if state.phase == MatchPhase::Rallying {
        steer(
            &mut state.ai,
            &state.ball,
            profile,
            &mut state.rng,
            config.arena_height,
        );
    }

    result
}

/// Apply the human paddle command.
fn apply_input(state: &mut MatchState, input: PaddleCommand, config: &SimConfig) {
    match input {
        PaddleCommand::Hold => {}
        PaddleCommand::Up => state.player.y -= config.player_key_speed,
        PaddleCommand::Down => state.player.y += config.player_key_speed,
        PaddleCommand::MoveTo { y } => {
            state.player.y = y - state.player.height / 2.0;
        }
    }
    state.player.clamp(config.arena_height);
}

/// Ball physics: integration, wall bounce, paddle bounce, scoring.
fn update_ball(state: &mut MatchState, config: &SimConfig, result: &mut TickResult) {
    let ball = &mut state.ball;

    ball.x += ball.dx;
    ball.y += ball.dy;

    // Wall collision: exact elastic reflection, no energy loss
    if ball.y - ball.radius < 0.0 || ball.y + ball.radius > config.arena_height {
        ball.dy = -ball.dy;
    }

    // Paddle collisions
    for side in [Side::Player, Side::Ai] {
        let paddle = match side {
            Side::Player => &state.player,
            Side::Ai => &state.ai,
        };
        if paddle.intersects(&state.ball) {
            // Reverse and inflate horizontal speed, redirect vertical
            // velocity by where on the paddle contact occurred
            state.ball.dx *= -PADDLE_SPEEDUP;
            state.ball.dy = (state.ball.y - paddle.center_y()) * DEFLECTION_FACTOR;
            result.events.push(GameEvent::PaddleHit { side });
        }
    }

    // Scoring: ball crossing the bound behind a paddle
    if state.ball.x < 0.0 {
        score_point(state, Side::Ai, config, result);
    } else if state.ball.x > config.arena_width {
        score_point(state, Side::Player, config, result);
    }
}

/// Credit a point and either end the match or enter `PointScored`.
fn score_point(state: &mut MatchState, scorer: Side, config: &SimConfig, result: &mut TickResult) {
    match scorer {
        Side::Player => state.player.score += 1,
        Side::Ai => state.ai.score += 1,
    }

    result.events.push(GameEvent::PointScored {
        scorer,
        player_score: state.player.score,
        ai_score: state.ai.score,
    });

    if state.player.score >= config.winning_score || state.ai.score >= config.winning_score {
        let player_won = state.player.score > state.ai.score;
        state.phase = MatchPhase::Ended { player_won };
        result.match_ended = true;
        result.outcome = Some(MatchOutcome {
            player_score: state.player.score,
            ai_score: state.ai.score,
        });
        result.events.push(GameEvent::MatchEnded { player_won });
    } else {
        state.phase = MatchPhase::PointScored { scorer };
    }
}
