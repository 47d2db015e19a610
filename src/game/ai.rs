//! AI Paddle Controller
//!
//! Predictive opponent: while the ball approaches it aims for the
//! intercept point with bounded noise, otherwise it drifts back to
//! center. Difficulty comes from a preset table, scaled at match start
//! by the human player's rating.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::rng::DeterministicRng;
use crate::game::state::{Ball, Paddle};

/// Deadband around the target within which the paddle holds still,
/// preventing jitter when already aligned.
pub const TARGET_DEADBAND: f32 = 10.0;

/// Fraction of profile speed used when returning to center.
const RETURN_SPEED_FACTOR: f32 = 0.4;

// =============================================================================
// DIFFICULTY
// =============================================================================

/// Admin-selectable difficulty presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Baseline opponent
    #[default]
    Medium,
    /// Faster, less hesitant
    Hard,
    /// Near-perfect prediction
    Harder,
    /// Practically frame-perfect
    Extreme,
}

impl Difficulty {
    /// Fixed preset profile for this level.
    pub fn profile(self) -> AiProfile {
        match self {
            Difficulty::Medium => AiProfile {
                speed: 7.0,
                reaction_delay: 0.15,
                prediction_error: 20.0,
            },
            Difficulty::Hard => AiProfile {
                speed: 8.0,
                reaction_delay: 0.10,
                prediction_error: 15.0,
            },
            Difficulty::Harder => AiProfile {
                speed: 9.0,
                reaction_delay: 0.05,
                prediction_error: 10.0,
            },
            Difficulty::Extreme => AiProfile {
                speed: 10.0,
                reaction_delay: 0.02,
                prediction_error: 5.0,
            },
        }
    }

    /// All levels, for validation messages.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Harder,
        Difficulty::Extreme,
    ];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Harder => "harder",
            Difficulty::Extreme => "extreme",
        };
        f.write_str(s)
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "harder" => Ok(Difficulty::Harder),
            "extreme" => Ok(Difficulty::Extreme),
            _ => Err(()),
        }
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// Behavioral parameters of the AI paddle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiProfile {
    /// Paddle movement per tick
    pub speed: f32,
    /// Upper bound of the hesitation noise folded into the target
    pub reaction_delay: f32,
    /// Width of the prediction noise band added to the intercept
    pub prediction_error: f32,
}

impl Default for AiProfile {
    fn default() -> Self {
        Difficulty::Medium.profile()
    }
}

impl AiProfile {
    /// Scale the preset by the opponent's rating.
    ///
    /// The stored difficulty level is the admin-configured baseline;
    /// this multiplier adapts it per-match to the human player:
    /// `m = clamp(0.8 + ((rating - 1000) / 1000) * 0.4, 0.8, 1.2)`.
    /// A 1500-rated opponent plays the preset unchanged; ratings at
    /// or below 1000 sit on the 0.8 floor.
    pub fn scaled_for_rating(self, opponent_rating: f64) -> AiProfile {
        let m = (0.8 + ((opponent_rating - 1000.0) / 1000.0) * 0.4).clamp(0.8, 1.2) as f32;

        AiProfile {
            speed: self.speed * m,
            reaction_delay: self.reaction_delay / m,
            prediction_error: self.prediction_error + (1.0 - m) * 15.0,
        }
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Steer the AI paddle for one tick.
///
/// - Ball moving away (`dx <= 0`): drift toward vertical center at
///   `0.4x` speed, but only when the offset exceeds the return speed.
/// - Ball approaching: aim at the predicted intercept plus bounded
///   noise, moving at full profile speed outside the deadband.
///
/// The caller clamps via [`Paddle::clamp`] afterwards; this function
/// only decides the vertical step.
pub fn steer(
    paddle: &mut Paddle,
    ball: &Ball,
    profile: &AiProfile,
    rng: &mut DeterministicRng,
    arena_height: f32,
) {
    if ball.dx > 0.0 {
        // Predict where the ball crosses the paddle's x position
        let time_to_intercept = ((paddle.x - ball.x) / ball.dx).abs();
        let predicted_y = ball.y + ball.dy * time_to_intercept;

        // Hesitation and prediction noise, both folded into the target
        let reaction = rng.next_f32_range(0.0, profile.reaction_delay);
        let error = rng.next_f32_range(
            -profile.prediction_error / 2.0,
            profile.prediction_error / 2.0,
        );
        let target_y = predicted_y + reaction + error;

        let paddle_center = paddle.center_y();
        if paddle_center < target_y - TARGET_DEADBAND {
            paddle.y += profile.speed;
        } else if paddle_center > target_y + TARGET_DEADBAND {
            paddle.y -= profile.speed;
        }
    } else {
        // Return to center while the ball moves away
        let center_y = arena_height / 2.0 - paddle.height / 2.0;
        let return_speed = profile.speed * RETURN_SPEED_FACTOR;
        if (paddle.y - center_y).abs() > return_speed {
            if paddle.y > center_y {
                paddle.y -= return_speed;
            } else {
                paddle.y += return_speed;
            }
        }
    }

    paddle.clamp(arena_height);
}
