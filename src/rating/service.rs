//! Game Service
//!
//! The write path of the rating engine. Every mutation of shared
//! player state goes through compare-and-swap updates against the
//! store: load entities with their versions, compute the new state
//! from what was loaded, commit only if nothing moved underneath, and
//! retry the whole read-compute-commit cycle on conflict. The AI
//! entity participates in every match, so it is the contention
//! hot spot this protects.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::Clock;
use crate::game::{AiProfile, Difficulty};
use crate::network::broadcast::Broadcaster;
use crate::network::protocol::{GameCompletedInfo, ServerMessage};
use crate::rating::elo;
use crate::rating::leaderboard::{
    self, LeaderboardEntry, PlayerStats, DEFAULT_LEADERBOARD_LIMIT, RECENT_MATCH_LIMIT,
};
use crate::rating::player::{MatchRecord, PlayerEntity};
use crate::rating::store::{MemoryStore, StoreError};

/// Identifier of the single house AI entity.
pub const AI_PLAYER_ID: &str = "ai";

/// Attempts before a contended write gives up.
const MAX_COMMIT_RETRIES: u32 = 8;

/// Failures surfaced to callers of the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request payload is malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The named player does not exist.
    #[error("player not found: {0}")]
    NotFound(String),

    /// A write lost the concurrency race repeatedly.
    #[error("write conflict on {0}, retries exhausted")]
    Conflict(String),

    /// The store rejected an operation for another reason.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(id) => ServiceError::Conflict(id),
            StoreError::NotFound(id) => ServiceError::NotFound(id),
        }
    }
}

/// Rating engine facade used by the network layer.
pub struct GameService {
    store: Arc<MemoryStore>,
    broadcaster: Arc<Broadcaster>,
    clock: Arc<dyn Clock>,
}

impl GameService {
    /// Build the service and provision the AI entity if absent.
    pub fn new(store: Arc<MemoryStore>, broadcaster: Arc<Broadcaster>, clock: Arc<dyn Clock>) -> Self {
        let service = Self { store, broadcaster, clock };
        service
            .store
            .insert_if_absent(PlayerEntity::new_ai(AI_PLAYER_ID, service.clock.now()));
        service
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Fetch a player, creating them at the base rating on first
    /// contact. Inactivity decay is applied lazily here.
    pub fn get_or_create_player(&self, player_id: &str) -> Result<PlayerEntity, ServiceError> {
        if player_id.is_empty() {
            return Err(ServiceError::Validation("player id must not be empty".into()));
        }

        let now = self.clock.now();
        for _ in 0..MAX_COMMIT_RETRIES {
            match self.store.get(player_id) {
                Some((mut entity, version)) => {
                    if !entity.apply_decay(now) {
                        return Ok(entity);
                    }
                    match self.store.update(entity.clone(), version) {
                        Ok(_) => {
                            info!(player = player_id, rating = entity.rating, "applied rating decay");
                            return Ok(entity);
                        }
                        Err(StoreError::Conflict(_)) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                None => {
                    let entity = PlayerEntity::new(player_id, now);
                    if self.store.insert_if_absent(entity.clone()) {
                        info!(player = player_id, "registered new player");
                        return Ok(entity);
                    }
                    // Lost a creation race; loop re-reads the winner
                }
            }
        }
        Err(ServiceError::Conflict(player_id.to_string()))
    }

    /// Record a completed match between `player_id` and the AI.
    ///
    /// Validates the result before touching any state, then commits
    /// both participants' updates atomically, retrying on contention.
    pub fn record_match(
        &self,
        player_id: &str,
        player_score: i64,
        ai_score: i64,
        duration_seconds: f64,
    ) -> Result<MatchRecord, ServiceError> {
        if player_score < 0 || ai_score < 0 {
            return Err(ServiceError::Validation("scores must be non-negative".into()));
        }
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(ServiceError::Validation(
                "duration must be a non-negative number of seconds".into(),
            ));
        }
        if player_id == AI_PLAYER_ID {
            return Err(ServiceError::Validation("the AI cannot play itself".into()));
        }

        self.get_or_create_player(player_id)?;
        let player_won = player_score > ai_score;
        let now = self.clock.now();

        for attempt in 0..MAX_COMMIT_RETRIES {
            let (mut player, player_version) = self
                .store
                .get(player_id)
                .ok_or_else(|| ServiceError::NotFound(player_id.to_string()))?;
            let (mut ai, ai_version) = self
                .store
                .get(AI_PLAYER_ID)
                .ok_or_else(|| ServiceError::NotFound(AI_PLAYER_ID.to_string()))?;

            player.apply_decay(now);
            let player_before = player.rating;
            let ai_before = ai.rating;

            // Both new ratings come from both pre-match values
            player.rating = elo::compute_rating(player_before, ai_before, player_won);
            ai.rating = elo::compute_rating(ai_before, player_before, !player_won);

            player.update_stats(player_won, player_score as u64, duration_seconds, now);
            ai.update_stats(!player_won, ai_score as u64, duration_seconds, now);

            let player_after = player.rating;
            let ai_after = ai.rating;
            let player_view = player.view();
            let ai_view = ai.view();

            match self
                .store
                .update_two((player, player_version), (ai, ai_version))
            {
                Ok(()) => {
                    let record = MatchRecord {
                        id: Uuid::new_v4(),
                        player_id: player_id.to_string(),
                        player_score: player_score as u64,
                        ai_score: ai_score as u64,
                        player_won,
                        player_rating_before: player_before,
                        player_rating_after: player_after,
                        ai_rating_before: ai_before,
                        ai_rating_after: ai_after,
                        duration_seconds,
                        timestamp: now,
                    };
                    self.store.append_record(record.clone());

                    info!(
                        player = player_id,
                        player_won,
                        player_rating = player_after,
                        ai_rating = ai_after,
                        "match recorded"
                    );

                    self.broadcaster.publish(&ServerMessage::GameCompleted(GameCompletedInfo {
                        player: player_view.clone(),
                        ai: ai_view,
                        record: record.clone(),
                    }));
                    self.broadcaster.publish(&ServerMessage::StatsUpdate(player_view));
                    self.publish_leaderboard();

                    return Ok(record);
                }
                Err(StoreError::Conflict(id)) => {
                    warn!(player = %id, attempt, "match commit lost a race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict(player_id.to_string()))
    }

    /// Top players as leaderboard rows.
    pub fn get_leaderboard(&self, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        leaderboard::rank_players(self.store.all(), limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT))
    }

    /// Full stats bundle for an existing player.
    pub fn get_player_stats(&self, player_id: &str) -> Result<PlayerStats, ServiceError> {
        let (player, _) = self
            .store
            .get(player_id)
            .ok_or_else(|| ServiceError::NotFound(player_id.to_string()))?;

        let recent = self.store.recent_records(player_id, RECENT_MATCH_LIMIT);
        let rated_above = self.store.count_rated_above(player.rating);
        let total = self.store.player_count();
        Ok(PlayerStats::assemble(&player, recent, rated_above, total))
    }

    /// Set the AI's baseline difficulty.
    pub fn set_ai_difficulty(&self, level: &str) -> Result<Difficulty, ServiceError> {
        let difficulty: Difficulty = level.parse().map_err(|_| {
            let levels: Vec<_> = Difficulty::ALL.iter().map(|d| d.to_string()).collect();
            ServiceError::Validation(format!(
                "unknown difficulty '{level}', expected one of: {}",
                levels.join(", ")
            ))
        })?;

        for _ in 0..MAX_COMMIT_RETRIES {
            let (mut ai, version) = self
                .store
                .get(AI_PLAYER_ID)
                .ok_or_else(|| ServiceError::NotFound(AI_PLAYER_ID.to_string()))?;
            ai.ai_difficulty = Some(difficulty);
            match self.store.update(ai, version) {
                Ok(_) => {
                    info!(%difficulty, "ai difficulty updated");
                    return Ok(difficulty);
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict(AI_PLAYER_ID.to_string()))
    }

    /// The AI's current baseline difficulty and profile. An entity
    /// with no stored difficulty falls back to medium.
    pub fn get_ai_profile(&self) -> (Difficulty, AiProfile) {
        let difficulty = self
            .store
            .get(AI_PLAYER_ID)
            .and_then(|(ai, _)| ai.ai_difficulty)
            .unwrap_or_default();
        (difficulty, difficulty.profile())
    }

    /// The AI profile a live match against `player_id` should use:
    /// the baseline scaled by the opponent's current rating, captured
    /// once at match start.
    pub fn match_profile_for(&self, player_id: &str) -> Result<AiProfile, ServiceError> {
        let player = self.get_or_create_player(player_id)?;
        let (_, baseline) = self.get_ai_profile();
        Ok(baseline.scaled_for_rating(player.rating))
    }

    /// Reset every player's rating and counters and drop all match
    /// records. Player identities survive.
    pub fn reset_leaderboard(&self) -> Result<(), ServiceError> {
        for entity in self.store.all() {
            let id = entity.id.clone();
            let mut committed = false;
            for _ in 0..MAX_COMMIT_RETRIES {
                let Some((old, version)) = self.store.get(&id) else {
                    committed = true;
                    break;
                };
                let fresh = if old.is_ai {
                    let mut ai = PlayerEntity::new_ai(&id, self.clock.now());
                    ai.ai_difficulty = old.ai_difficulty;
                    ai
                } else {
                    PlayerEntity::new(&id, self.clock.now())
                };
                match self.store.update(fresh, version) {
                    Ok(_) => {
                        committed = true;
                        break;
                    }
                    Err(StoreError::Conflict(_)) => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            if !committed {
                return Err(ServiceError::Conflict(id));
            }
        }
        self.store.clear_records();

        info!("leaderboard reset");
        self.broadcaster.publish(&ServerMessage::LeaderboardReset);
        self.publish_leaderboard();
        Ok(())
    }

    /// Wipe every player and record, then re-provision the AI entity.
    pub fn reset_all_data(&self) -> Result<(), ServiceError> {
        self.store.clear_all();
        self.store
            .insert_if_absent(PlayerEntity::new_ai(AI_PLAYER_ID, self.clock.now()));

        info!("all data reset");
        self.broadcaster.publish(&ServerMessage::LeaderboardReset);
        self.publish_leaderboard();
        Ok(())
    }

    /// Push the current leaderboard to every subscriber.
    pub fn publish_leaderboard(&self) {
        let board = self.get_leaderboard(None);
        self.broadcaster.publish(&ServerMessage::LeaderboardUpdate(board));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;

    fn service() -> (GameService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let service = GameService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Broadcaster::new()),
            clock.clone(),
        );
        (service, clock)
    }

    #[test]
    fn test_provisions_ai_entity() {
        let (service, _) = service();
        let (ai, _) = service.store().get(AI_PLAYER_ID).unwrap();
        assert!(ai.is_ai);
        assert_eq!(ai.ai_difficulty, Some(Difficulty::Medium));
    }

    #[test]
    fn test_get_or_create_registers_once() {
        let (service, _) = service();
        let first = service.get_or_create_player("0xabc").unwrap();
        assert_eq!(first.rating, 1000.0);

        let again = service.get_or_create_player("0xabc").unwrap();
        assert_eq!(again, first);
        assert_eq!(service.store().player_count(), 2);
    }

    #[test]
    fn test_get_or_create_applies_decay() {
        let (service, clock) = service();
        service.get_or_create_player("p").unwrap();
        service.record_match("p", 15, 3, 60.0).unwrap();
        let rating_before = service.store().get("p").unwrap().0.rating;
        assert!(rating_before > 1000.0);

        clock.advance_days(10);
        let decayed = service.get_or_create_player("p").unwrap();
        assert_eq!(decayed.rating, (rating_before - 15.0).max(1000.0));

        // Loading again on the same day takes nothing further
        let reloaded = service.get_or_create_player("p").unwrap();
        assert_eq!(reloaded.rating, decayed.rating);
    }

    #[test]
    fn test_record_match_even_ratings() {
        let (service, _) = service();
        let record = service.record_match("p", 15, 9, 120.0).unwrap();

        assert!(record.player_won);
        assert_eq!(record.player_rating_before, 1000.0);
        assert_eq!(record.player_rating_after, 1016.0);
        assert_eq!(record.ai_rating_after, 984.0);

        let (player, _) = service.store().get("p").unwrap();
        assert_eq!(player.wins, 1);
        assert_eq!(player.win_streak, 1);
        let (ai, _) = service.store().get(AI_PLAYER_ID).unwrap();
        assert_eq!(ai.losses, 1);
        assert_eq!(service.store().record_count(), 1);
    }

    #[test]
    fn test_record_match_validates_before_mutating() {
        let (service, _) = service();
        service.get_or_create_player("p").unwrap();

        assert!(matches!(
            service.record_match("p", -1, 5, 60.0),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.record_match("p", 15, 5, f64::NAN),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.record_match("p", 15, 5, -2.0),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.record_match(AI_PLAYER_ID, 15, 5, 60.0),
            Err(ServiceError::Validation(_))
        ));

        let (player, _) = service.store().get("p").unwrap();
        assert_eq!(player.games_played, 0);
        assert_eq!(service.store().record_count(), 0);
    }

    #[test]
    fn test_concurrent_matches_both_land_on_ai() {
        let store = Arc::new(MemoryStore::new());
        let broadcaster = Arc::new(Broadcaster::new());
        let clock: Arc<ManualClock> = Arc::new(ManualClock::default());
        let service = Arc::new(GameService::new(store, broadcaster, clock));

        let handles: Vec<_> = ["alice", "bob"]
            .into_iter()
            .map(|id| {
                let service = service.clone();
                std::thread::spawn(move || service.record_match(id, 15, 7, 60.0))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        // Both wins were registered against the shared AI entity
        let (ai, _) = service.store().get(AI_PLAYER_ID).unwrap();
        assert_eq!(ai.losses, 2);
        assert_eq!(ai.games_played, 2);
        assert_eq!(service.store().record_count(), 2);
    }

    #[test]
    fn test_leaderboard_default_limit() {
        let (service, _) = service();
        for i in 0..12 {
            service.get_or_create_player(&format!("p{i:02}")).unwrap();
        }
        // 12 humans + AI, default window is 10
        assert_eq!(service.get_leaderboard(None).len(), 10);
        assert_eq!(service.get_leaderboard(Some(3)).len(), 3);
    }

    #[test]
    fn test_player_stats_for_unknown_player() {
        let (service, _) = service();
        assert!(matches!(
            service.get_player_stats("ghost"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_player_stats_bundle() {
        let (service, _) = service();
        service.record_match("p", 15, 2, 60.0).unwrap();
        service.record_match("p", 3, 15, 45.0).unwrap();

        let stats = service.get_player_stats("p").unwrap();
        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.recent_matches.len(), 2);
        assert!(!stats.recent_matches[0].player_won);
        // Independent rounding after a 1-1 split leaves the AI at 1001
        // and the player at 999, so the player ranks second of two
        assert_eq!(stats.ranked_position, 2);
        assert_eq!(stats.percentile, 0.0);
    }

    #[test]
    fn test_set_ai_difficulty() {
        let (service, _) = service();
        assert_eq!(service.set_ai_difficulty("extreme").unwrap(), Difficulty::Extreme);
        assert_eq!(service.get_ai_profile().0, Difficulty::Extreme);

        let err = service.set_ai_difficulty("nightmare").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("medium")));
        // Unknown level left the setting untouched
        assert_eq!(service.get_ai_profile().0, Difficulty::Extreme);
    }

    #[test]
    fn test_match_profile_scales_with_rating() {
        let (service, _) = service();
        let fresh = service.match_profile_for("newbie").unwrap();
        assert_eq!(fresh, Difficulty::Medium.profile().scaled_for_rating(1000.0));

        // Push the player's rating up and the profile hardens
        for _ in 0..20 {
            service.record_match("grinder", 15, 1, 30.0).unwrap();
        }
        let hardened = service.match_profile_for("grinder").unwrap();
        assert!(hardened.speed > fresh.speed);
        assert!(hardened.prediction_error < fresh.prediction_error);
    }

    #[test]
    fn test_reset_leaderboard_keeps_identities() {
        let (service, _) = service();
        service.set_ai_difficulty("hard").unwrap();
        service.record_match("p", 15, 4, 60.0).unwrap();

        service.reset_leaderboard().unwrap();

        let (player, _) = service.store().get("p").unwrap();
        assert_eq!(player.rating, 1000.0);
        assert_eq!(player.games_played, 0);
        assert_eq!(service.store().record_count(), 0);

        // Difficulty setting survives a leaderboard reset
        assert_eq!(service.get_ai_profile().0, Difficulty::Hard);
    }

    #[test]
    fn test_reset_all_data_reprovisions_ai() {
        let (service, _) = service();
        service.record_match("p", 15, 4, 60.0).unwrap();

        service.reset_all_data().unwrap();

        assert!(service.store().get("p").is_none());
        assert_eq!(service.store().player_count(), 1);
        let (ai, _) = service.store().get(AI_PLAYER_ID).unwrap();
        assert!(ai.is_ai);
    }
}
