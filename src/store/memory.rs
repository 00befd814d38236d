//! In-process card store

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::{due_order, newest_first, CardStore, Result, StoreError, SwapOutcome};
use crate::flashcards::Card;

/// Card store backed by a lock-protected map.
///
/// The write lock makes each compare-and-swap atomic; nothing is held across
/// an await point.
#[derive(Default)]
pub struct MemoryCardStore {
    cards: RwLock<HashMap<Uuid, Card>>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().map(|cards| cards.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, Card>>> {
        self.cards
            .read()
            .map_err(|_| StoreError::Unavailable("card map lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, Card>>> {
        self.cards
            .write()
            .map_err(|_| StoreError::Unavailable("card map lock poisoned".to_string()))
    }
}

#[async_trait]
impl CardStore for MemoryCardStore {
    async fn insert(&self, card: &Card) -> Result<()> {
        let mut cards = self.write()?;
        if cards.contains_key(&card.id) {
            return Err(StoreError::AlreadyExists(card.id));
        }
        cards.insert(card.id, card.clone());
        Ok(())
    }

    async fn get(&self, card_id: Uuid) -> Result<Card> {
        self.read()?
            .get(&card_id)
            .cloned()
            .ok_or(StoreError::NotFound(card_id))
    }

    async fn compare_and_swap(
        &self,
        card_id: Uuid,
        expected_version: u64,
        card: &Card,
    ) -> Result<SwapOutcome> {
        let mut cards = self.write()?;
        let stored = cards.get_mut(&card_id).ok_or(StoreError::NotFound(card_id))?;

        if stored.version != expected_version {
            return Ok(SwapOutcome::Conflict {
                current_version: stored.version,
            });
        }

        let mut next = card.clone();
        next.id = card_id;
        next.version = expected_version + 1;
        *stored = next.clone();
        Ok(SwapOutcome::Swapped(next))
    }

    async fn delete(&self, card_id: Uuid) -> Result<bool> {
        Ok(self.write()?.remove(&card_id).is_some())
    }

    async fn query_due(&self, owner_id: Uuid, today: NaiveDate, limit: usize) -> Result<Vec<Card>> {
        let mut due: Vec<Card> = self
            .read()?
            .values()
            .filter(|c| c.owner_id == owner_id && c.is_due(today))
            .cloned()
            .collect();

        due.sort_by(due_order);
        due.truncate(limit);
        Ok(due)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Card>> {
        Ok(self
            .read()?
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_by_collection(
        &self,
        owner_id: Uuid,
        collection_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Card>, usize)> {
        let mut cards: Vec<Card> = self
            .read()?
            .values()
            .filter(|c| c.owner_id == owner_id && c.collection_id == collection_id)
            .cloned()
            .collect();

        let total = cards.len();
        cards.sort_by(newest_first);
        let page = cards.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }
}
