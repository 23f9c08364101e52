//! In-memory card store.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{due_order, CardStore, StoreResult};
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::types::{Card, CardId, NewCard, OwnerId};

/// Card store backed by a `HashMap`.
///
/// The lock is only held for the duration of a single call. `created_at` is
/// stamped from the store's clock.
pub struct MemoryCardStore {
    cards: RwLock<HashMap<CardId, Card>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryCardStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl fmt::Debug for MemoryCardStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCardStore")
            .field("cards", &self.len())
            .finish_non_exhaustive()
    }
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            cards: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Insert a card as-is. Useful for seeding fixtures with arbitrary state.
    pub fn insert(&self, card: Card) {
        self.write().insert(card.id, card);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<CardId, Card>> {
        self.cards.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<CardId, Card>> {
        self.cards.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CardStore for MemoryCardStore {
    async fn create(&self, new: NewCard) -> StoreResult<Card> {
        let card = Card::create(Uuid::new_v4(), new, self.clock.now());
        self.write().insert(card.id, card.clone());
        Ok(card)
    }

    async fn get(&self, owner: OwnerId, id: CardId) -> StoreResult<Card> {
        self.read()
            .get(&id)
            .filter(|card| card.owner == owner)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn query_due(
        &self,
        owner: OwnerId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Card>> {
        let mut due: Vec<Card> = self
            .read()
            .values()
            .filter(|card| card.owner == owner && card.is_due(now))
            .cloned()
            .collect();
        due.sort_by(due_order);
        due.truncate(limit);
        Ok(due)
    }

    async fn count_due(&self, owner: OwnerId, now: DateTime<Utc>) -> StoreResult<usize> {
        Ok(self
            .read()
            .values()
            .filter(|card| card.owner == owner && card.is_due(now))
            .count())
    }

    async fn compare_and_swap(
        &self,
        id: CardId,
        expected_version: u64,
        mut card: Card,
    ) -> StoreResult<Card> {
        if card.id != id {
            return Err(StoreError::Backend(format!(
                "card id {} does not match target {}",
                card.id, id
            )));
        }

        let mut cards = self.write();
        let stored = cards.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                actual: stored.version,
            });
        }

        card.owner = stored.owner;
        card.version = expected_version
            .checked_add(1)
            .ok_or_else(|| StoreError::Backend(format!("card {id}: version overflow")))?;
        *stored = card.clone();
        Ok(card)
    }
}
