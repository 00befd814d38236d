use anyhow::{Context, Result};
use uuid::Uuid;

use cadence_lib::flashcards::algorithm::format_interval;

use crate::app::App;
use crate::render::terminal::{difficulty_label, due_label, paint, Color};
use crate::OutputFormat;

pub async fn run(
    app: &App,
    card_id: Uuid,
    owner: Uuid,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let card = app
        .service
        .get_card(card_id, owner)
        .await
        .with_context(|| format!("Failed to load card {}", card_id))?;
    let preview = app.service.preview(card_id, owner).await?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "card": card,
                "preview": preview,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", paint(&card.content.front, Color::BOLD, use_color));
            println!("{}", card.content.back);
            println!();
            println!("  Topic: {}", card.content.topic);
            println!("  Due: {}", due_label(card.next_review_date, app.today(), use_color));
            println!(
                "  Ease factor: {:.2} ({})",
                card.ease_factor,
                difficulty_label(preview.difficulty, use_color)
            );
            println!("  Reviews: {}", card.review_count);
            if let Some(at) = card.last_reviewed_at {
                println!("  Last reviewed: {}", at.format("%Y-%m-%d %H:%M"));
            }
            println!("  {}", preview.recommendation);
            println!();
            let intervals: Vec<String> = preview
                .intervals
                .iter()
                .enumerate()
                .map(|(q, days)| format!("{}:{}", q, format_interval(*days)))
                .collect();
            println!("  If reviewed now: {}", intervals.join("  "));
        }
    }

    Ok(())
}
