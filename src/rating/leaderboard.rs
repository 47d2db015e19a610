//! Leaderboard Projections
//!
//! Read-only views over the player set: ranked entries and per-player
//! stat bundles. Ordering is total and deterministic so two queries
//! over the same data always produce the same list.

use serde::{Deserialize, Serialize};

use crate::rating::elo::RankTier;
use crate::rating::player::{MatchRecord, PlayerEntity, PlayerView};

/// Default number of leaderboard rows when the caller gives no limit.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// How many recent matches a stats query returns.
pub const RECENT_MATCH_LIMIT: usize = 10;

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    /// Player identifier.
    pub player_id: String,
    /// Current rating.
    pub rating: f64,
    /// Tier derived from the rating.
    pub rank_tier: RankTier,
    /// wins / games, in percent.
    pub win_rate_percent: f64,
    /// Completed matches.
    pub games_played: u64,
}

/// Top `limit` players as leaderboard rows.
///
/// Sorted by rating descending with ties broken by id ascending;
/// ranks are dense 1..=n over the returned slice.
pub fn rank_players(mut players: Vec<PlayerEntity>, limit: usize) -> Vec<LeaderboardEntry> {
    players.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    players
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, p)| LeaderboardEntry {
            rank: i + 1,
            player_id: p.id.clone(),
            rating: p.rating,
            rank_tier: p.rank_tier(),
            win_rate_percent: p.win_rate_percent(),
            games_played: p.games_played,
        })
        .collect()
}

/// Full stats bundle for one player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    /// The player snapshot.
    pub player: PlayerView,
    /// Up to [`RECENT_MATCH_LIMIT`] most recent matches, newest first.
    pub recent_matches: Vec<MatchRecord>,
    /// This player's total completed matches.
    pub total_matches: u64,
    /// 1-based position among all players (strictly-higher ratings + 1).
    pub ranked_position: usize,
    /// Share of players at or below this rating, in percent.
    pub percentile: f64,
}

impl PlayerStats {
    /// Assemble the bundle from the player, their recent records, and
    /// the population figures.
    pub fn assemble(
        player: &PlayerEntity,
        recent_matches: Vec<MatchRecord>,
        rated_above: usize,
        total_players: usize,
    ) -> Self {
        let ranked_position = rated_above + 1;
        let percentile = if total_players == 0 {
            0.0
        } else {
            (total_players - ranked_position) as f64 / total_players as f64 * 100.0
        };
        Self {
            player: player.view(),
            recent_matches,
            total_matches: player.games_played,
            ranked_position,
            percentile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn player(id: &str, rating: f64) -> PlayerEntity {
        let mut p = PlayerEntity::new(id, Utc::now());
        p.rating = rating;
        p
    }

    #[test]
    fn test_fewer_players_than_limit() {
        let players = vec![player("a", 1200.0), player("b", 1500.0), player("c", 1500.0)];
        let board = rank_players(players, 10);

        assert_eq!(board.len(), 3);
        assert_eq!(board[0].rating, 1500.0);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[2].player_id, "a");
        assert_eq!(board[2].rank, 3);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let players = vec![player("zed", 1500.0), player("amy", 1500.0)];
        let board = rank_players(players.clone(), 10);
        assert_eq!(board[0].player_id, "amy");
        assert_eq!(board[1].player_id, "zed");

        // Same data, reversed input order, same output
        let reversed: Vec<_> = players.into_iter().rev().collect();
        let board2 = rank_players(reversed, 10);
        assert_eq!(board, board2);
    }

    #[test]
    fn test_limit_truncates() {
        let players: Vec<_> = (0..20)
            .map(|i| player(&format!("p{i:02}"), 1000.0 + i as f64))
            .collect();
        let board = rank_players(players, 10);
        assert_eq!(board.len(), 10);
        assert_eq!(board[0].rating, 1019.0);
        assert_eq!(board[9].rank, 10);
    }

    #[test]
    fn test_stats_position_and_percentile() {
        let mut p = player("me", 1200.0);
        p.update_stats(true, 15, 60.0, Utc::now());

        // 1 player rated above, 4 players total: position 2, percentile 50
        let stats = PlayerStats::assemble(&p, vec![], 1, 4);
        assert_eq!(stats.ranked_position, 2);
        assert_eq!(stats.percentile, 50.0);
        assert_eq!(stats.total_matches, 1);

        // Sole player: position 1, percentile 0
        let stats = PlayerStats::assemble(&p, vec![], 0, 1);
        assert_eq!(stats.ranked_position, 1);
        assert_eq!(stats.percentile, 0.0);
    }
}
