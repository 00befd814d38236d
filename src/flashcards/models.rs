//! Data models for the scheduling engine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Ease factor every new card starts with
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Difficulty assigned to generated cards that do not carry one
pub const DEFAULT_DIFFICULTY_LEVEL: u8 = 1;

/// Highest difficulty level the generation pipeline emits
pub const MAX_DIFFICULTY_LEVEL: u8 = 5;

/// Quality rating outside the 0-5 scale
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid quality rating {0}: expected an integer between 0 and 5")]
pub struct InvalidQualityError(pub i32);

/// Recall quality for one review (SM-2 scale)
///
/// - 0: Complete blackout, no recall
/// - 1: Incorrect, but upon seeing answer, remembered
/// - 2: Incorrect, but answer seemed easy to recall
/// - 3: Correct response with serious difficulty
/// - 4: Correct response after hesitation
/// - 5: Perfect response with no hesitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;

    /// Lowest rating that still counts as remembered
    pub const PASSING: u8 = 3;

    pub fn new(value: i32) -> Result<Self, InvalidQualityError> {
        if (0..=Self::MAX as i32).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(InvalidQualityError(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// A rating below 3 is a lapse
    pub fn is_lapse(self) -> bool {
        self.0 < Self::PASSING
    }

    /// All six ratings, worst first
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=Self::MAX).map(Quality)
    }
}

impl TryFrom<i32> for Quality {
    type Error = InvalidQualityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Quality::new(value)
    }
}

impl From<Quality> for i32 {
    fn from(q: Quality) -> i32 {
        q.0 as i32
    }
}

/// Opaque card payload supplied by the upstream generation pipeline.
///
/// The scheduler never inspects the text. `difficulty_level` is read only by
/// the due-set ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardContent {
    pub front: String,
    pub back: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_difficulty_level")]
    pub difficulty_level: u8,
}

fn default_topic() -> String {
    "General".to_string()
}

fn default_difficulty_level() -> u8 {
    DEFAULT_DIFFICULTY_LEVEL
}

impl CardContent {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            topic: default_topic(),
            difficulty_level: DEFAULT_DIFFICULTY_LEVEL,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_difficulty(mut self, level: u8) -> Self {
        self.difficulty_level = level;
        self
    }

    /// Difficulty clamped into 1..=5
    pub fn normalized_difficulty(&self) -> u8 {
        self.difficulty_level.clamp(1, MAX_DIFFICULTY_LEVEL)
    }
}

/// The scheduling fields of a card, as consumed and produced by the algorithm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    pub ease_factor: f64,
    pub review_count: u32,
    pub next_review_date: NaiveDate,
}

impl ScheduleState {
    /// Schedule of a freshly created card: due immediately
    pub fn initial(today: NaiveDate) -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            review_count: 0,
            next_review_date: today,
        }
    }
}

/// A reviewable knowledge unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub collection_id: Uuid,
    pub content: CardContent,
    pub ease_factor: f64,
    pub review_count: u32,
    pub next_review_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token; bumped by the store on every swap
    #[serde(default = "default_version")]
    pub version: u64,
}

fn default_version() -> u64 {
    1
}

impl Card {
    pub fn new(
        owner_id: Uuid,
        collection_id: Uuid,
        content: CardContent,
        now: DateTime<Utc>,
    ) -> Self {
        let initial = ScheduleState::initial(now.date_naive());
        let mut content = content;
        content.difficulty_level = content.normalized_difficulty();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            collection_id,
            content,
            ease_factor: initial.ease_factor,
            review_count: initial.review_count,
            next_review_date: initial.next_review_date,
            last_reviewed_at: None,
            created_at: now,
            version: default_version(),
        }
    }

    pub fn schedule(&self) -> ScheduleState {
        ScheduleState {
            ease_factor: self.ease_factor,
            review_count: self.review_count,
            next_review_date: self.next_review_date,
        }
    }

    /// Copy of this card carrying a new schedule, reviewed at `reviewed_at`
    pub fn reviewed(&self, next: ScheduleState, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            ease_factor: next.ease_factor,
            review_count: next.review_count,
            next_review_date: next.next_review_date,
            last_reviewed_at: Some(reviewed_at),
            ..self.clone()
        }
    }

    /// Check if the card is due on `today`
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review_date <= today
    }

    pub fn difficulty_level(&self) -> u8 {
        self.content.difficulty_level
    }
}

/// One entry of a due list as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCard {
    pub card_id: Uuid,
    pub collection_id: Uuid,
    pub next_review_date: NaiveDate,
    pub ease_factor: f64,
    pub review_count: u32,
    pub content: CardContent,
}

impl From<&Card> for DueCard {
    fn from(card: &Card) -> Self {
        Self {
            card_id: card.id,
            collection_id: card.collection_id,
            next_review_date: card.next_review_date,
            ease_factor: card.ease_factor,
            review_count: card.review_count,
            content: card.content.clone(),
        }
    }
}

/// Updated schedule returned by a successful review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub card_id: Uuid,
    pub ease_factor: f64,
    pub review_count: u32,
    pub next_review_date: NaiveDate,
    /// Days from the review date until the card is due again
    pub interval_days: i64,
}

/// A page of cards from one collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPage {
    pub cards: Vec<Card>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

/// Per-owner study statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    pub total_cards: usize,
    pub due_cards: usize,
    pub new_cards: usize,
    pub average_ease_factor: f64,
    pub total_topics: usize,
}

impl StudyStats {
    /// Share of cards reviewed at least once, as a whole percentage
    pub fn study_progress(&self) -> u32 {
        let total = self.total_cards.max(1) as f64;
        let reviewed = self.total_cards.saturating_sub(self.new_cards) as f64;
        ((reviewed / total) * 100.0).round() as u32
    }
}

/// How well a topic is mastered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MasteryLevel {
    Master,
    Advanced,
    Intermediate,
    Beginner,
    Learning,
}

impl MasteryLevel {
    pub fn from_topic(average_ease: f64, due_cards: usize, total_cards: usize) -> Self {
        let due_ratio = if total_cards == 0 {
            0.0
        } else {
            due_cards as f64 / total_cards as f64
        };

        if average_ease >= 3.0 && due_ratio < 0.1 {
            Self::Master
        } else if average_ease >= 2.8 && due_ratio < 0.2 {
            Self::Advanced
        } else if average_ease >= 2.5 && due_ratio < 0.4 {
            Self::Intermediate
        } else if average_ease >= 2.0 {
            Self::Beginner
        } else {
            Self::Learning
        }
    }
}

/// Per-topic statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStats {
    pub topic: String,
    pub total_cards: usize,
    pub due_cards: usize,
    pub average_ease: f64,
    pub mastery: MasteryLevel,
}

/// Difficulty bucket derived from the ease factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLabel {
    Easy,
    Medium,
    Hard,
    VeryHard,
    ExtremelyHard,
}

impl DifficultyLabel {
    pub fn from_ease_factor(ease_factor: f64) -> Self {
        if ease_factor >= 2.8 {
            Self::Easy
        } else if ease_factor >= 2.5 {
            Self::Medium
        } else if ease_factor >= 2.0 {
            Self::Hard
        } else if ease_factor >= 1.5 {
            Self::VeryHard
        } else {
            Self::ExtremelyHard
        }
    }
}
