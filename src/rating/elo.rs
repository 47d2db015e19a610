//! ELO Rating Math
//!
//! Pure functions: rating deltas, rank tier derivation, inactivity
//! decay. No I/O, no clock reads; the caller supplies "now".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum rating points exchanged per match.
pub const K_FACTOR: f64 = 32.0;

/// Rating assigned to new players (and restored to by decay).
pub const BASE_RATING: f64 = 1000.0;

/// Days of inactivity tolerated before decay starts.
pub const DECAY_GRACE_DAYS: i64 = 7;

/// Rating lost per idle day past the grace period.
pub const DECAY_PER_DAY: f64 = 5.0;

/// Total decay over one idle period never exceeds this.
pub const DECAY_CAP: f64 = 100.0;

/// Expected score of a player against an opponent.
#[inline]
pub fn expected_score(rating: f64, opponent_rating: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent_rating - rating) / 400.0))
}

/// New rating after a match against `opponent_rating`.
///
/// Applied independently to both participants with each other's
/// pre-match rating; because each side rounds independently the two
/// deltas need not be exact negatives. Floored at 0.
pub fn compute_rating(rating: f64, opponent_rating: f64, won: bool) -> f64 {
    let expected = expected_score(rating, opponent_rating);
    let actual = if won { 1.0 } else { 0.0 };
    (rating + K_FACTOR * (actual - expected)).round().max(0.0)
}

/// Rank tier, a pure function of rating over non-overlapping
/// half-open bands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RankTier {
    /// rating < 1100
    Bronze,
    /// 1100 <= rating < 1300
    Silver,
    /// 1300 <= rating < 1500
    Gold,
    /// 1500 <= rating < 1700
    Platinum,
    /// 1700 <= rating < 2000
    Diamond,
    /// rating >= 2000
    Master,
}

impl RankTier {
    /// Tier for a rating.
    pub fn from_rating(rating: f64) -> Self {
        if rating < 1100.0 {
            RankTier::Bronze
        } else if rating < 1300.0 {
            RankTier::Silver
        } else if rating < 1500.0 {
            RankTier::Gold
        } else if rating < 1700.0 {
            RankTier::Platinum
        } else if rating < 2000.0 {
            RankTier::Diamond
        } else {
            RankTier::Master
        }
    }
}

/// Rating after lazy inactivity decay.
///
/// `idle_days = floor(now - last_game_played, days)`; past the 7-day
/// grace period the rating loses 5 points per idle day, capped at 100
/// per idle period, never dropping below 1000. A rating already at or
/// below 1000 is never decayed at all.
pub fn decayed_rating(rating: f64, last_game_played: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    if rating <= BASE_RATING {
        return rating;
    }

    let idle_days = (now - last_game_played).num_days();
    if idle_days <= DECAY_GRACE_DAYS {
        return rating;
    }

    let decay = (((idle_days - DECAY_GRACE_DAYS) as f64) * DECAY_PER_DAY).min(DECAY_CAP);
    (rating - decay).max(BASE_RATING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn test_even_match_exchange() {
        // Equal ratings: winner +16, loser -16
        assert_eq!(compute_rating(1000.0, 1000.0, true), 1016.0);
        assert_eq!(compute_rating(1000.0, 1000.0, false), 984.0);
    }

    #[test]
    fn test_upset_pays_more() {
        // Beating a stronger opponent earns more than beating a weaker one
        let vs_strong = compute_rating(1000.0, 1400.0, true) - 1000.0;
        let vs_weak = compute_rating(1000.0, 600.0, true) - 1000.0;
        assert!(vs_strong > vs_weak);
    }

    #[test]
    fn test_rating_floor_is_zero() {
        // An even match near zero loses 16, which the floor absorbs
        assert_eq!(compute_rating(10.0, 10.0, false), 0.0);
        assert_eq!(compute_rating(0.0, 0.0, false), 0.0);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(RankTier::from_rating(1099.0), RankTier::Bronze);
        assert_eq!(RankTier::from_rating(1100.0), RankTier::Silver);
        assert_eq!(RankTier::from_rating(1299.0), RankTier::Silver);
        assert_eq!(RankTier::from_rating(1300.0), RankTier::Gold);
        assert_eq!(RankTier::from_rating(1499.0), RankTier::Gold);
        assert_eq!(RankTier::from_rating(1500.0), RankTier::Platinum);
        assert_eq!(RankTier::from_rating(1699.0), RankTier::Platinum);
        assert_eq!(RankTier::from_rating(1700.0), RankTier::Diamond);
        assert_eq!(RankTier::from_rating(1999.0), RankTier::Diamond);
        assert_eq!(RankTier::from_rating(2000.0), RankTier::Master);
        assert_eq!(RankTier::from_rating(0.0), RankTier::Bronze);
    }

    #[test]
    fn test_decay_after_ten_idle_days() {
        let now = Utc::now();
        let last = now - Duration::days(10);

        // idle_days = 10, decay = min(3 * 5, 100) = 15
        assert_eq!(decayed_rating(1200.0, last, now), 1185.0);
    }

    #[test]
    fn test_decay_capped_at_hundred() {
        let now = Utc::now();
        let last = now - Duration::days(365);

        assert_eq!(decayed_rating(1500.0, last, now), 1400.0);
    }

    #[test]
    fn test_decay_never_below_base() {
        let now = Utc::now();
        let last = now - Duration::days(30);

        assert_eq!(decayed_rating(1010.0, last, now), 1000.0);
    }

    #[test]
    fn test_no_decay_below_base_rating() {
        let now = Utc::now();
        let last = now - Duration::days(100);

        // Already under 1000: decay must not apply regardless of idle time
        assert_eq!(decayed_rating(995.0, last, now), 995.0);
        assert_eq!(decayed_rating(1000.0, last, now), 1000.0);
    }

    #[test]
    fn test_no_decay_within_grace() {
        let now = Utc::now();
        let last = now - Duration::days(7);

        assert_eq!(decayed_rating(1500.0, last, now), 1500.0);
    }

    proptest! {
        #[test]
        fn prop_delta_bounded_by_k(rating in 0.0..4000.0f64, opp in 0.0..4000.0f64, won: bool) {
            let new = compute_rating(rating, opp, won);
            // Rounding adds at most 0.5 on top of K
            prop_assert!((new - rating).abs() <= K_FACTOR + 0.5);
            prop_assert!(new >= 0.0);
        }

        #[test]
        fn prop_win_never_decreases_expectation_order(rating in 0.0..4000.0f64, opp in 0.0..4000.0f64) {
            let won = compute_rating(rating, opp, true);
            let lost = compute_rating(rating, opp, false);
            prop_assert!(won >= lost);
        }

        #[test]
        fn prop_expected_scores_sum_to_one(a in 0.0..4000.0f64, b in 0.0..4000.0f64) {
            let sum = expected_score(a, b) + expected_score(b, a);
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }

        #[test]
        fn prop_decay_is_bounded(rating in 1000.0..4000.0f64, days in 0i64..1000) {
            let now = Utc::now();
            let last = now - Duration::days(days);
            let decayed = decayed_rating(rating, last, now);
            prop_assert!(decayed <= rating);
            prop_assert!(decayed >= (rating - DECAY_CAP).max(BASE_RATING));
        }
    }
}
