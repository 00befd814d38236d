//! Card store: the durable owner of record for cards.
//!
//! The scheduler sees storage as a record store with get, conditional update
//! and a due query. Every review goes through [`CardStore::compare_and_swap`],
//! which only writes when the stored version still matches the one the caller
//! read.

pub mod memory;
pub mod sqlite;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::flashcards::Card;

pub use memory::MemoryCardStore;
pub use sqlite::SqliteCardStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Card not found: {0}")]
    NotFound(Uuid),

    #[error("Card already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Result of a conditional write
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    /// Written; carries the card as stored, with its new version
    Swapped(Card),
    /// The stored version moved on since the caller read it
    Conflict { current_version: u64 },
}

#[async_trait]
pub trait CardStore: Send + Sync {
    /// Store a new card; its id must not exist yet
    async fn insert(&self, card: &Card) -> Result<()>;

    /// Fetch a card, or `StoreError::NotFound`
    async fn get(&self, card_id: Uuid) -> Result<Card>;

    /// Replace the card only if its stored version equals `expected_version`.
    /// A successful swap stores `card` with version `expected_version + 1`.
    async fn compare_and_swap(
        &self,
        card_id: Uuid,
        expected_version: u64,
        card: &Card,
    ) -> Result<SwapOutcome>;

    /// Hard delete; returns whether a card was removed
    async fn delete(&self, card_id: Uuid) -> Result<bool>;

    /// Cards of `owner_id` with `next_review_date <= today`, in [`due_order`]
    async fn query_due(&self, owner_id: Uuid, today: NaiveDate, limit: usize) -> Result<Vec<Card>>;

    /// All cards of an owner, in no particular order
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Card>>;

    /// One page of a collection, newest first, plus the collection size
    async fn list_by_collection(
        &self,
        owner_id: Uuid,
        collection_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Card>, usize)>;
}

/// Due-list order: most overdue first, then harder cards first among
/// equally-due ones (higher difficulty level, then lower ease factor).
/// Creation time and id make the order total.
pub fn due_order(a: &Card, b: &Card) -> Ordering {
    a.next_review_date
        .cmp(&b.next_review_date)
        .then_with(|| b.difficulty_level().cmp(&a.difficulty_level()))
        .then_with(|| a.ease_factor.total_cmp(&b.ease_factor))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Collection listing order: newest first
pub fn newest_first(a: &Card, b: &Card) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::CardContent;
    use chrono::{Duration, TimeZone, Utc};

    fn card_due(days_from_today: i64, difficulty: u8, ease_factor: f64) -> Card {
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 9, 0, 0).unwrap();
        let mut card = Card::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            CardContent::new("q", "a").with_difficulty(difficulty),
            now,
        );
        card.next_review_date = now.date_naive() + Duration::days(days_from_today);
        card.ease_factor = ease_factor;
        card
    }

    #[test]
    fn test_due_order_overdue_first() {
        let mut cards = vec![card_due(0, 1, 2.5), card_due(-2, 1, 2.5), card_due(-1, 1, 2.5)];
        cards.sort_by(due_order);

        let offsets: Vec<_> = cards.iter().map(|c| c.next_review_date).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted);
    }

    #[test]
    fn test_due_order_harder_first_on_same_day() {
        let easy = card_due(0, 1, 2.5);
        let hard = card_due(0, 4, 2.5);
        let low_ease = card_due(0, 1, 1.6);

        let mut cards = vec![easy.clone(), low_ease.clone(), hard.clone()];
        cards.sort_by(due_order);

        assert_eq!(cards[0].id, hard.id);
        assert_eq!(cards[1].id, low_ease.id);
        assert_eq!(cards[2].id, easy.id);
    }
}
