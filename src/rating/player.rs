//! Player Entities and Match Records
//!
//! `PlayerEntity` is the stored form: raw counters and timestamps
//! that every derived figure (win rate, averages, tier) is computed
//! from on read. `PlayerView` is the wire shape sent to clients, with
//! the derived fields filled in. `MatchRecord` is the immutable
//! result row appended once per completed match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::Difficulty;
use crate::rating::elo::{self, RankTier};

/// Stored state for one player (human or AI).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntity {
    /// Stable identifier (wallet address for humans).
    pub id: String,
    /// True for the house AI entity.
    pub is_ai: bool,
    /// Current ELO rating.
    pub rating: f64,
    /// Completed matches won.
    pub wins: u64,
    /// Completed matches lost.
    pub losses: u64,
    /// Total completed matches; always equals wins + losses.
    pub games_played: u64,
    /// Consecutive wins ending at the most recent match.
    pub win_streak: u64,
    /// Largest win streak ever reached.
    pub highest_win_streak: u64,
    /// Sum of this player's scores across all matches.
    pub total_score: u64,
    /// Best single-match score.
    pub highest_score: u64,
    /// Sum of match durations, in seconds.
    pub total_duration_secs: f64,
    /// When the last match completed (creation time for fresh players).
    pub last_game_played: DateTime<Utc>,
    /// Decay already taken since the last completed match. Keeps
    /// repeated loads within one idle period from compounding.
    #[serde(default)]
    pub decay_applied: f64,
    /// Baseline difficulty; only meaningful when `is_ai` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_difficulty: Option<Difficulty>,
}

impl PlayerEntity {
    /// Fresh human player at the base rating.
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            is_ai: false,
            rating: elo::BASE_RATING,
            wins: 0,
            losses: 0,
            games_played: 0,
            win_streak: 0,
            highest_win_streak: 0,
            total_score: 0,
            highest_score: 0,
            total_duration_secs: 0.0,
            last_game_played: now,
            decay_applied: 0.0,
            ai_difficulty: None,
        }
    }

    /// Fresh AI entity at the base rating and default difficulty.
    pub fn new_ai(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            is_ai: true,
            ai_difficulty: Some(Difficulty::default()),
            ..Self::new(id, now)
        }
    }

    /// Fold one completed match into the counters.
    ///
    /// The rating itself is set separately by the caller, since both
    /// sides' new ratings are computed from both pre-match values.
    pub fn update_stats(&mut self, won: bool, score: u64, duration_secs: f64, now: DateTime<Utc>) {
        self.games_played += 1;
        if won {
            self.wins += 1;
            self.win_streak += 1;
            self.highest_win_streak = self.highest_win_streak.max(self.win_streak);
        } else {
            self.losses += 1;
            self.win_streak = 0;
        }
        self.total_score += score;
        self.highest_score = self.highest_score.max(score);
        self.total_duration_secs += duration_secs;
        self.last_game_played = now;
        self.decay_applied = 0.0;
    }

    /// Apply lazy inactivity decay in place. Returns true if the
    /// rating changed.
    ///
    /// Decay is computed from the rating as it stood when the last
    /// match completed, so repeated loads within the same idle period
    /// only take the difference, never the full amount again.
    pub fn apply_decay(&mut self, now: DateTime<Utc>) -> bool {
        let base = self.rating + self.decay_applied;
        let decayed = elo::decayed_rating(base, self.last_game_played, now);
        if decayed != self.rating {
            self.decay_applied = base - decayed;
            self.rating = decayed;
            true
        } else {
            false
        }
    }

    /// Win rate in percent, 0 for a player with no games.
    pub fn win_rate_percent(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.wins as f64 / self.games_played as f64 * 100.0
        }
    }

    /// Mean score per match, 0 for a player with no games.
    pub fn average_score(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.total_score as f64 / self.games_played as f64
        }
    }

    /// Mean match duration in seconds, 0 for a player with no games.
    pub fn average_duration_secs(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.total_duration_secs / self.games_played as f64
        }
    }

    /// Current rank tier.
    pub fn rank_tier(&self) -> RankTier {
        RankTier::from_rating(self.rating)
    }

    /// Wire view with the derived fields materialized.
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            is_ai: self.is_ai,
            rating: self.rating,
            rank_tier: self.rank_tier(),
            wins: self.wins,
            losses: self.losses,
            games_played: self.games_played,
            win_streak: self.win_streak,
            highest_win_streak: self.highest_win_streak,
            win_rate_percent: self.win_rate_percent(),
            average_score: self.average_score(),
            highest_score: self.highest_score,
            average_duration_secs: self.average_duration_secs(),
            last_game_played: self.last_game_played,
            ai_difficulty: self.ai_difficulty,
        }
    }
}

/// Client-facing player snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Stable identifier.
    pub id: String,
    /// True for the house AI entity.
    pub is_ai: bool,
    /// Current ELO rating.
    pub rating: f64,
    /// Tier derived from the rating.
    pub rank_tier: RankTier,
    /// Completed matches won.
    pub wins: u64,
    /// Completed matches lost.
    pub losses: u64,
    /// Total completed matches.
    pub games_played: u64,
    /// Current consecutive-win run.
    pub win_streak: u64,
    /// Largest win streak ever reached.
    pub highest_win_streak: u64,
    /// wins / games, in percent.
    pub win_rate_percent: f64,
    /// Mean score per match.
    pub average_score: f64,
    /// Best single-match score.
    pub highest_score: u64,
    /// Mean match duration in seconds.
    pub average_duration_secs: f64,
    /// When the last match completed.
    pub last_game_played: DateTime<Utc>,
    /// Baseline difficulty for the AI entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_difficulty: Option<Difficulty>,
}

/// Immutable record of one completed match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    /// Unique record id.
    pub id: Uuid,
    /// The human participant.
    pub player_id: String,
    /// Final human score.
    pub player_score: u64,
    /// Final AI score.
    pub ai_score: u64,
    /// Whether the human won.
    pub player_won: bool,
    /// Human rating going into the match.
    pub player_rating_before: f64,
    /// Human rating after the match.
    pub player_rating_after: f64,
    /// AI rating going into the match.
    pub ai_rating_before: f64,
    /// AI rating after the match.
    pub ai_rating_after: f64,
    /// Match length in seconds.
    pub duration_seconds: f64,
    /// When the match completed.
    pub timestamp: DateTime<Utc>,
}
