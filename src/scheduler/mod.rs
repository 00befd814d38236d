//! Scheduler service: reviews, due lists and card lifecycle for one store.
//!
//! A review is a fetch-compute-swap loop against the card store. The swap only
//! lands when the card's version is unchanged since the fetch; on conflict the
//! loop starts over from a fresh read, up to `max_review_attempts` times. Once
//! a write lands the owner's cached due list is invalidated before the call
//! returns.

pub mod planner;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cache::{CacheBackend, CacheError, DueSetCache};
use crate::clock::Clock;
use crate::config::CadenceConfig;
use crate::flashcards::algorithm;
use crate::flashcards::stats;
use crate::flashcards::{
    Card, CardContent, CardPage, DifficultyLabel, DueCard, InvalidQualityError, Quality,
    ReviewOutcome, StudyStats, TopicStats,
};
use crate::store::{CardStore, StoreError, SwapOutcome};

use planner::{ScheduleDay, SessionPlan};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Card not found: {0}")]
    CardNotFound(Uuid),

    #[error("Invalid quality rating {0}: expected an integer between 0 and 5")]
    InvalidQuality(i32),

    #[error("Card {card_id} was modified concurrently; gave up after {attempts} attempts")]
    ConcurrentModification { card_id: Uuid, attempts: u32 },

    #[error("Card store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Card {card_id} has a schedule that cannot be advanced: {reason}")]
    InvalidSchedule { card_id: Uuid, reason: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

impl From<InvalidQualityError> for SchedulerError {
    fn from(e: InvalidQualityError) -> Self {
        SchedulerError::InvalidQuality(e.0)
    }
}

impl From<StoreError> for SchedulerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SchedulerError::CardNotFound(id),
            other => SchedulerError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<CacheError> for SchedulerError {
    fn from(e: CacheError) -> Self {
        SchedulerError::CacheUnavailable(e.to_string())
    }
}

/// What reviewing a card now would do, per quality rating
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPreview {
    pub card_id: Uuid,
    pub difficulty: DifficultyLabel,
    pub recommendation: String,
    /// Interval in days, indexed by quality 0 through 5
    pub intervals: [i64; 6],
}

pub struct SchedulerService {
    store: Arc<dyn CardStore>,
    due_sets: DueSetCache,
    clock: Arc<dyn Clock>,
    config: CadenceConfig,
}

impl SchedulerService {
    pub fn new(
        store: Arc<dyn CardStore>,
        cache: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
        config: CadenceConfig,
    ) -> Self {
        let due_sets = DueSetCache::new(
            cache,
            store.clone(),
            config.cache_ttl(),
            config.due_set_capacity,
        );
        Self {
            store,
            due_sets,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    /// Open the cache connection
    pub async fn connect(&self) -> Result<()> {
        self.due_sets.backend().connect().await?;
        Ok(())
    }

    /// Close the cache connection; due lists are then read from the store
    pub async fn close(&self) -> Result<()> {
        self.due_sets.backend().close().await?;
        Ok(())
    }

    /// Apply one review with recall `quality` (0-5) to a card of `owner_id`
    pub async fn review_card(
        &self,
        card_id: Uuid,
        owner_id: Uuid,
        quality: i32,
    ) -> Result<ReviewOutcome> {
        let quality = Quality::new(quality)?;
        let attempts = self.config.max_review_attempts.max(1);

        for attempt in 1..=attempts {
            let card = self.fetch_owned(card_id, owner_id).await?;
            let today = self.clock.today();
            let next = algorithm::next_state(&card.schedule(), quality, today).map_err(|e| {
                SchedulerError::InvalidSchedule {
                    card_id,
                    reason: e.to_string(),
                }
            })?;
            let updated = card.reviewed(next, self.clock.now());

            match self
                .store
                .compare_and_swap(card_id, card.version, &updated)
                .await?
            {
                SwapOutcome::Swapped(stored) => {
                    self.due_sets.invalidate(owner_id).await;
                    let interval_days = (stored.next_review_date - today).num_days();
                    log::info!(
                        "Reviewed card {} with quality {}: next review in {} day(s), ease {:.2}",
                        card_id,
                        quality.value(),
                        interval_days,
                        stored.ease_factor
                    );
                    return Ok(ReviewOutcome {
                        card_id,
                        ease_factor: stored.ease_factor,
                        review_count: stored.review_count,
                        next_review_date: stored.next_review_date,
                        interval_days,
                    });
                }
                SwapOutcome::Conflict { current_version } => {
                    log::debug!(
                        "Review of card {} lost the race at version {} (now {}), attempt {}/{}",
                        card_id,
                        card.version,
                        current_version,
                        attempt,
                        attempts
                    );
                }
            }
        }

        log::warn!(
            "Giving up on review of card {} after {} conflicting attempts",
            card_id,
            attempts
        );
        Err(SchedulerError::ConcurrentModification { card_id, attempts })
    }

    /// Due cards of `owner_id`, most overdue first; `None` uses the configured limit
    pub async fn get_due_cards(
        &self,
        owner_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<DueCard>> {
        let limit = limit.unwrap_or(self.config.default_due_limit);
        let due = self.due_sets.get_due(owner_id, self.clock.today()).await?;
        Ok(due.cards.iter().take(limit).map(DueCard::from).collect())
    }

    /// Store a new card, due immediately
    pub async fn create_card(
        &self,
        owner_id: Uuid,
        collection_id: Uuid,
        content: CardContent,
    ) -> Result<Card> {
        let card = Card::new(owner_id, collection_id, content, self.clock.now());
        self.store.insert(&card).await?;
        self.due_sets.invalidate(owner_id).await;
        log::info!("Created card {} in collection {}", card.id, collection_id);
        Ok(card)
    }

    pub async fn get_card(&self, card_id: Uuid, owner_id: Uuid) -> Result<Card> {
        self.fetch_owned(card_id, owner_id).await
    }

    /// Replace a card's content, keeping its schedule
    pub async fn update_card_content(
        &self,
        card_id: Uuid,
        owner_id: Uuid,
        content: CardContent,
    ) -> Result<Card> {
        let attempts = self.config.max_review_attempts.max(1);
        let mut content = content;
        content.difficulty_level = content.normalized_difficulty();

        for attempt in 1..=attempts {
            let card = self.fetch_owned(card_id, owner_id).await?;
            let updated = Card {
                content: content.clone(),
                ..card.clone()
            };

            match self
                .store
                .compare_and_swap(card_id, card.version, &updated)
                .await?
            {
                SwapOutcome::Swapped(stored) => {
                    self.due_sets.invalidate(owner_id).await;
                    log::info!("Updated content of card {}", card_id);
                    return Ok(stored);
                }
                SwapOutcome::Conflict { current_version } => {
                    log::debug!(
                        "Content update of card {} conflicted at version {} (now {}), \
                         attempt {}/{}",
                        card_id,
                        card.version,
                        current_version,
                        attempt,
                        attempts
                    );
                }
            }
        }

        log::warn!(
            "Giving up on content update of card {} after {} conflicting attempts",
            card_id,
            attempts
        );
        Err(SchedulerError::ConcurrentModification { card_id, attempts })
    }

    pub async fn delete_card(&self, card_id: Uuid, owner_id: Uuid) -> Result<()> {
        self.fetch_owned(card_id, owner_id).await?;
        if !self.store.delete(card_id).await? {
            return Err(SchedulerError::CardNotFound(card_id));
        }
        self.due_sets.invalidate(owner_id).await;
        log::info!("Deleted card {}", card_id);
        Ok(())
    }

    /// One page (1-based) of a collection, newest first
    pub async fn list_collection_cards(
        &self,
        owner_id: Uuid,
        collection_id: Uuid,
        page: usize,
        limit: usize,
    ) -> Result<CardPage> {
        let page = page.max(1);
        let limit = limit.max(1);
        let (cards, total_count) = self
            .store
            .list_by_collection(owner_id, collection_id, (page - 1) * limit, limit)
            .await?;

        Ok(CardPage {
            cards,
            total_count,
            current_page: page,
            total_pages: total_count.div_ceil(limit),
        })
    }

    pub async fn study_stats(&self, owner_id: Uuid) -> Result<StudyStats> {
        let cards = self.store.list_by_owner(owner_id).await?;
        Ok(stats::study_stats(&cards, self.clock.today()))
    }

    pub async fn topic_stats(&self, owner_id: Uuid) -> Result<Vec<TopicStats>> {
        let cards = self.store.list_by_owner(owner_id).await?;
        Ok(stats::topic_stats(&cards, self.clock.today()))
    }

    pub async fn preview(&self, card_id: Uuid, owner_id: Uuid) -> Result<ReviewPreview> {
        let card = self.fetch_owned(card_id, owner_id).await?;
        Ok(ReviewPreview {
            card_id,
            difficulty: DifficultyLabel::from_ease_factor(card.ease_factor),
            recommendation: algorithm::study_recommendation(card.ease_factor, card.review_count)
                .to_string(),
            intervals: algorithm::preview_intervals(&card.schedule()),
        })
    }

    pub async fn plan_session(&self, owner_id: Uuid, target_minutes: f64) -> Result<SessionPlan> {
        let cards = self.store.list_by_owner(owner_id).await?;
        Ok(planner::plan_session(&cards, self.clock.today(), target_minutes))
    }

    pub async fn study_schedule(
        &self,
        owner_id: Uuid,
        days_ahead: u32,
    ) -> Result<Vec<ScheduleDay>> {
        let cards = self.store.list_by_owner(owner_id).await?;
        Ok(planner::study_schedule(&cards, self.clock.today(), days_ahead))
    }

    /// Fetch a card, treating another owner's card as missing
    async fn fetch_owned(&self, card_id: Uuid, owner_id: Uuid) -> Result<Card> {
        let card = self.store.get(card_id).await?;
        if card.owner_id != owner_id {
            log::debug!("Card {} requested by non-owner {}", card_id, owner_id);
            return Err(SchedulerError::CardNotFound(card_id));
        }
        Ok(card)
    }
}
