//! In-Memory Entity Store
//!
//! Versioned storage for player entities plus an append-only match
//! record log. Every entity carries a version that increments on each
//! committed write; updates name the version they read, and a stale
//! version fails with [`StoreError::Conflict`] so the caller can
//! reload and retry. `update_two` commits a pair of entities under
//! one lock so a match result lands on both participants or neither.

use std::collections::BTreeMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::rating::player::{MatchRecord, PlayerEntity};

/// Storage failures surfaced to the service layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entity's version changed since it was read.
    #[error("version conflict on player {0}")]
    Conflict(String),
    /// The entity does not exist.
    #[error("player not found: {0}")]
    NotFound(String),
}

#[derive(Clone, Debug)]
struct Versioned {
    entity: PlayerEntity,
    version: u64,
}

/// In-memory store for players and match records.
#[derive(Debug, Default)]
pub struct MemoryStore {
    players: RwLock<BTreeMap<String, Versioned>>,
    records: RwLock<Vec<MatchRecord>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity and its current version, if present.
    pub fn get(&self, id: &str) -> Option<(PlayerEntity, u64)> {
        let players = self.players.read().unwrap_or_else(|e| e.into_inner());
        players.get(id).map(|v| (v.entity.clone(), v.version))
    }

    /// Insert a new entity at version 0. Returns false (leaving the
    /// existing entity untouched) if the id is already present.
    pub fn insert_if_absent(&self, entity: PlayerEntity) -> bool {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        if players.contains_key(&entity.id) {
            return false;
        }
        players.insert(entity.id.clone(), Versioned { entity, version: 0 });
        true
    }

    /// Commit `entity` if its stored version still equals
    /// `expected_version`. Returns the new version.
    pub fn update(&self, entity: PlayerEntity, expected_version: u64) -> Result<u64, StoreError> {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        let slot = players
            .get_mut(&entity.id)
            .ok_or_else(|| StoreError::NotFound(entity.id.clone()))?;
        if slot.version != expected_version {
            return Err(StoreError::Conflict(entity.id));
        }
        slot.entity = entity;
        slot.version += 1;
        Ok(slot.version)
    }

    /// Commit two entities atomically: both version checks pass under
    /// the same lock or nothing is written.
    pub fn update_two(
        &self,
        first: (PlayerEntity, u64),
        second: (PlayerEntity, u64),
    ) -> Result<(), StoreError> {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());

        for (entity, expected) in [&first, &second] {
            let slot = players
                .get(&entity.id)
                .ok_or_else(|| StoreError::NotFound(entity.id.clone()))?;
            if slot.version != *expected {
                return Err(StoreError::Conflict(entity.id.clone()));
            }
        }

        for (entity, _) in [first, second] {
            let slot = players.get_mut(&entity.id).unwrap_or_else(|| unreachable!());
            slot.entity = entity;
            slot.version += 1;
        }
        Ok(())
    }

    /// All entities, in id order.
    pub fn all(&self) -> Vec<PlayerEntity> {
        let players = self.players.read().unwrap_or_else(|e| e.into_inner());
        players.values().map(|v| v.entity.clone()).collect()
    }

    /// Top `limit` entities by rating descending, ties broken by id
    /// ascending.
    pub fn top_by_rating(&self, limit: usize) -> Vec<PlayerEntity> {
        let mut entities = self.all();
        entities.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        entities.truncate(limit);
        entities
    }

    /// How many entities have a strictly higher rating.
    pub fn count_rated_above(&self, rating: f64) -> usize {
        let players = self.players.read().unwrap_or_else(|e| e.into_inner());
        players.values().filter(|v| v.entity.rating > rating).count()
    }

    /// Number of stored entities.
    pub fn player_count(&self) -> usize {
        let players = self.players.read().unwrap_or_else(|e| e.into_inner());
        players.len()
    }

    /// Append one match record.
    pub fn append_record(&self, record: MatchRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.push(record);
    }

    /// Most recent records for one player, newest first.
    pub fn recent_records(&self, player_id: &str, limit: usize) -> Vec<MatchRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records
            .iter()
            .rev()
            .filter(|r| r.player_id == player_id)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Total stored match records.
    pub fn record_count(&self) -> usize {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.len()
    }

    /// Drop every match record.
    pub fn clear_records(&self) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.clear();
    }

    /// Drop every entity and record.
    pub fn clear_all(&self) {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        players.clear();
        drop(players);
        self.clear_records();
    }
}
