//! Statistics over an owner's cards

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use super::models::{Card, MasteryLevel, StudyStats, TopicStats, DEFAULT_EASE_FACTOR};

pub fn study_stats(cards: &[Card], today: NaiveDate) -> StudyStats {
    let total_cards = cards.len();
    let average_ease_factor = if total_cards == 0 {
        DEFAULT_EASE_FACTOR
    } else {
        cards.iter().map(|c| c.ease_factor).sum::<f64>() / total_cards as f64
    };
    let topics: HashSet<&str> = cards.iter().map(|c| c.content.topic.as_str()).collect();

    StudyStats {
        total_cards,
        due_cards: cards.iter().filter(|c| c.is_due(today)).count(),
        new_cards: cards.iter().filter(|c| c.review_count == 0).count(),
        average_ease_factor,
        total_topics: topics.len(),
    }
}

/// Per-topic totals, largest topic first (ties by name)
pub fn topic_stats(cards: &[Card], today: NaiveDate) -> Vec<TopicStats> {
    let mut by_topic: BTreeMap<&str, Vec<&Card>> = BTreeMap::new();
    for card in cards {
        by_topic.entry(card.content.topic.as_str()).or_default().push(card);
    }

    let mut stats: Vec<TopicStats> = by_topic
        .into_iter()
        .map(|(topic, cards)| {
            let total_cards = cards.len();
            let due_cards = cards.iter().filter(|c| c.is_due(today)).count();
            let average_ease =
                cards.iter().map(|c| c.ease_factor).sum::<f64>() / total_cards as f64;
            TopicStats {
                topic: topic.to_string(),
                total_cards,
                due_cards,
                average_ease,
                mastery: MasteryLevel::from_topic(average_ease, due_cards, total_cards),
            }
        })
        .collect();

    // BTreeMap already yields names in order, so a stable sort keeps ties alphabetical
    stats.sort_by(|a, b| b.total_cards.cmp(&a.total_cards));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::CardContent;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    fn card(topic: &str, ease_factor: f64, review_count: u32, due_offset: i64) -> Card {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
        let mut card = Card::new(
            Uuid::nil(),
            Uuid::nil(),
            CardContent::new("q", "a").with_topic(topic),
            now,
        );
        card.ease_factor = ease_factor;
        card.review_count = review_count;
        card.next_review_date = today() + Duration::days(due_offset);
        card
    }

    #[test]
    fn test_study_stats_empty() {
        let stats = study_stats(&[], today());
        assert_eq!(stats.total_cards, 0);
        assert_eq!(stats.average_ease_factor, DEFAULT_EASE_FACTOR);
        assert_eq!(stats.total_topics, 0);
    }

    #[test]
    fn test_study_stats_counts() {
        let cards = vec![
            card("Biology", 2.5, 0, 0),
            card("Biology", 2.1, 3, -1),
            card("History", 2.9, 5, 10),
        ];
        let stats = study_stats(&cards, today());

        assert_eq!(stats.total_cards, 3);
        assert_eq!(stats.due_cards, 2);
        assert_eq!(stats.new_cards, 1);
        assert_eq!(stats.total_topics, 2);
        assert!((stats.average_ease_factor - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_topic_stats_sorted_by_size() {
        let cards = vec![
            card("History", 3.2, 6, 30),
            card("Biology", 1.8, 2, 0),
            card("Biology", 2.0, 2, -3),
        ];
        let stats = topic_stats(&cards, today());

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].topic, "Biology");
        assert_eq!(stats[0].due_cards, 2);
        assert_eq!(stats[0].mastery, MasteryLevel::Learning);
        assert_eq!(stats[1].topic, "History");
        assert_eq!(stats[1].mastery, MasteryLevel::Master);
    }
}
