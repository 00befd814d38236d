//! Study session planning over a set of cards

use std::cmp::Ordering;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::flashcards::Card;

pub const DEFAULT_SESSION_MINUTES: f64 = 20.0;
pub const DEFAULT_DAYS_AHEAD: u32 = 7;

/// Cards picked for one sitting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPlan {
    pub cards: Vec<Card>,
    pub estimated_minutes: u32,
    pub total_due: usize,
}

/// Cards falling due on one day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    pub date: NaiveDate,
    pub cards: Vec<Card>,
}

/// Expected minutes to review a card; harder cards take longer
pub fn estimated_minutes(ease_factor: f64) -> f64 {
    if ease_factor < 2.0 {
        2.5
    } else if ease_factor < 2.5 {
        1.5
    } else {
        1.0
    }
}

/// Fill a session of `target_minutes`: due cards first, hardest first.
/// Stops at the first card that no longer fits.
pub fn plan_session(cards: &[Card], today: NaiveDate, target_minutes: f64) -> SessionPlan {
    let mut ordered: Vec<&Card> = cards.iter().collect();
    ordered.sort_by(|a, b| match (a.is_due(today), b.is_due(today)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.ease_factor.total_cmp(&b.ease_factor),
    });

    let mut total = 0.0;
    let mut picked = Vec::new();
    for card in ordered {
        let cost = estimated_minutes(card.ease_factor);
        if total + cost > target_minutes {
            break;
        }
        total += cost;
        picked.push(card.clone());
    }

    SessionPlan {
        cards: picked,
        estimated_minutes: total.round() as u32,
        total_due: cards.iter().filter(|c| c.is_due(today)).count(),
    }
}

/// Bucket cards by review date over the next `days_ahead` days, today first.
/// Cards due outside the window, overdue ones included, are left out.
pub fn study_schedule(cards: &[Card], today: NaiveDate, days_ahead: u32) -> Vec<ScheduleDay> {
    (0..days_ahead as i64)
        .map(|offset| {
            let date = today + Duration::days(offset);
            ScheduleDay {
                date,
                cards: cards
                    .iter()
                    .filter(|c| c.next_review_date == date)
                    .cloned()
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::CardContent;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    fn card(ease_factor: f64, due_offset: i64) -> Card {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        let mut card = Card::new(Uuid::nil(), Uuid::nil(), CardContent::new("q", "a"), now);
        card.ease_factor = ease_factor;
        card.next_review_date = today() + Duration::days(due_offset);
        card
    }

    #[test]
    fn test_plan_prefers_due_then_hard() {
        let not_due_hard = card(1.4, 3);
        let due_easy = card(2.8, 0);
        let due_hard = card(1.9, -1);

        let cards = [not_due_hard.clone(), due_easy.clone(), due_hard.clone()];
        let plan = plan_session(&cards, today(), 20.0);

        let ids: Vec<_> = plan.cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![due_hard.id, due_easy.id, not_due_hard.id]);
        assert_eq!(plan.total_due, 2);
        // 2.5 + 1.0 + 2.5
        assert_eq!(plan.estimated_minutes, 6);
    }

    #[test]
    fn test_plan_stops_at_budget() {
        let cards: Vec<Card> = (0..10).map(|_| card(1.5, 0)).collect();
        let plan = plan_session(&cards, today(), 6.0);

        assert_eq!(plan.cards.len(), 2);
        assert_eq!(plan.estimated_minutes, 5);
        assert_eq!(plan.total_due, 10);
    }

    #[test]
    fn test_schedule_buckets_by_day() {
        let cards = vec![card(2.5, 0), card(2.5, 2), card(2.5, 2), card(2.5, -1), card(2.5, 9)];
        let schedule = study_schedule(&cards, today(), DEFAULT_DAYS_AHEAD);

        assert_eq!(schedule.len(), 7);
        assert_eq!(schedule[0].date, today());
        assert_eq!(schedule[0].cards.len(), 1);
        assert_eq!(schedule[2].cards.len(), 2);
        let scheduled: usize = schedule.iter().map(|d| d.cards.len()).sum();
        assert_eq!(scheduled, 3);
    }
}
