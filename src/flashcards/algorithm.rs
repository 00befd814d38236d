//! SM-2 Spaced Repetition Algorithm (review-count variant)
//!
//! Calculates the next schedule of a card from its current ease factor and
//! review count. Pure: no clock, no I/O. The caller supplies `today`.
//!
//! Intervals:
//! - quality < 3: 1 day, whatever the review count (a lapse restarts daily review)
//! - first review: 1 day
//! - second review: 6 days
//! - afterwards: round((review_count - 1) * ease_factor)
//!
//! The third tier scales with the review count rather than the previous
//! interval, unlike canonical SM-2. Keep it that way.

use chrono::{Days, NaiveDate};
use thiserror::Error;

use super::models::{DifficultyLabel, Quality, ScheduleState, MIN_EASE_FACTOR};

const EASE_BONUS: f64 = 0.1;
const DIFFICULTY_FACTOR: f64 = 0.08;
const DIFFICULTY_WEIGHT: f64 = 0.02;

/// New ease factor after a review of the given quality
///
/// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), floored at 1.3
pub fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let miss = (Quality::MAX - quality.value()) as f64;
    let delta = EASE_BONUS - miss * (DIFFICULTY_FACTOR + miss * DIFFICULTY_WEIGHT);
    (ease_factor + delta).max(MIN_EASE_FACTOR)
}

/// Interval in days for the `review_count`-th review (already incremented)
pub fn interval_days(review_count: u32, ease_factor: f64, quality: Quality) -> i64 {
    if quality.is_lapse() {
        return 1;
    }

    match review_count {
        0 | 1 => 1,
        2 => 6,
        n => ((n - 1) as f64 * ease_factor).round() as i64,
    }
}

/// A stored schedule the algorithm cannot advance
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Review count {0} cannot be incremented")]
    ReviewCountOverflow(u32),

    #[error(
        "Interval of {interval_days} days from {from} is out of range \
         (ease factor {ease_factor})"
    )]
    DateOutOfRange {
        from: NaiveDate,
        interval_days: i64,
        ease_factor: f64,
    },
}

/// Calculate the schedule that follows a review on `today`.
///
/// Only fails on a corrupt stored state: an exhausted review count, or an
/// ease factor so large the next date falls outside the calendar.
pub fn next_state(
    current: &ScheduleState,
    quality: Quality,
    today: NaiveDate,
) -> Result<ScheduleState, ScheduleError> {
    let review_count = current
        .review_count
        .checked_add(1)
        .ok_or(ScheduleError::ReviewCountOverflow(current.review_count))?;
    let ease_factor = next_ease_factor(current.ease_factor, quality);
    let interval = interval_days(review_count, ease_factor, quality);

    let next_review_date = u64::try_from(interval)
        .ok()
        .and_then(|days| today.checked_add_days(Days::new(days)))
        .ok_or(ScheduleError::DateOutOfRange {
            from: today,
            interval_days: interval,
            ease_factor,
        })?;

    Ok(ScheduleState {
        ease_factor,
        review_count,
        next_review_date,
    })
}

/// Interval each quality rating would give if the card were reviewed now
///
/// Indexed by quality, 0 through 5.
pub fn preview_intervals(current: &ScheduleState) -> [i64; 6] {
    let mut intervals = [0; 6];
    let review_count = current.review_count.saturating_add(1);
    for quality in Quality::all() {
        let ease_factor = next_ease_factor(current.ease_factor, quality);
        intervals[quality.value() as usize] = interval_days(review_count, ease_factor, quality);
    }
    intervals
}

/// Study advice for a card in its current state
pub fn study_recommendation(ease_factor: f64, review_count: u32) -> &'static str {
    if review_count < 3 {
        return "Review daily until familiar";
    }
    match DifficultyLabel::from_ease_factor(ease_factor) {
        DifficultyLabel::Easy => "Well mastered - review occasionally",
        DifficultyLabel::VeryHard | DifficultyLabel::ExtremelyHard => {
            "Focus more time on this topic"
        }
        DifficultyLabel::Medium | DifficultyLabel::Hard => "Regular review recommended",
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: i64) -> String {
    if days <= 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}
