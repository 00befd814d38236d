use chrono::NaiveDate;

use cadence_lib::flashcards::algorithm::format_interval;
use cadence_lib::flashcards::{DifficultyLabel, MasteryLevel};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap `text` in an ANSI color when colors are on
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// "overdue 3d", "today" or "in 2w", relative to `today`
pub fn due_label(date: NaiveDate, today: NaiveDate, use_color: bool) -> String {
    let days = (date - today).num_days();
    if days < 0 {
        paint(&format!("overdue {}", format_interval(-days)), Color::RED, use_color)
    } else if days == 0 {
        paint("today", Color::YELLOW, use_color)
    } else {
        paint(&format!("in {}", format_interval(days)), Color::GRAY, use_color)
    }
}

pub fn difficulty_label(label: DifficultyLabel, use_color: bool) -> String {
    let (text, color) = match label {
        DifficultyLabel::Easy => ("easy", Color::GREEN),
        DifficultyLabel::Medium => ("medium", Color::CYAN),
        DifficultyLabel::Hard => ("hard", Color::YELLOW),
        DifficultyLabel::VeryHard => ("very hard", Color::RED),
        DifficultyLabel::ExtremelyHard => ("extremely hard", Color::RED),
    };
    paint(text, color, use_color)
}

pub fn mastery_label(level: MasteryLevel) -> &'static str {
    match level {
        MasteryLevel::Master => "Master",
        MasteryLevel::Advanced => "Advanced",
        MasteryLevel::Intermediate => "Intermediate",
        MasteryLevel::Beginner => "Beginner",
        MasteryLevel::Learning => "Learning",
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.chars().count() <= max {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max.saturating_sub(1)).collect();
        format!("{}\u{2026}", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_label() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        assert_eq!(due_label(today, today, false), "today");
        assert_eq!(due_label(today - chrono::Duration::days(3), today, false), "overdue 3d");
        assert_eq!(due_label(today + chrono::Duration::days(14), today, false), "in 2w");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer question", 8), "a much \u{2026}");
        assert_eq!(truncate("first\nsecond", 20), "first");
    }
}
